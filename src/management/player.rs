use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use tokio::{
    sync::{Mutex, watch},
    task::JoinHandle,
    time::{Instant, timeout},
};

use crate::{
    config::ApiEndpoints,
    error,
    host::UiDispatcher,
    management::AuthController,
    retry::RetryPolicy,
    spotify::player::{PlayerApi, PlayerCommand},
    types::{DeviceInfo, PlaybackQuery, PlaybackState, RepeatMode},
    warning,
};

/// Default delay between playback-state polls, tick start to tick start.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Extra time granted to the polling task to acknowledge a stop signal.
const STOP_GRACE: Duration = Duration::from_secs(1);

/// A subscriber invoked with the new playback state on every detected
/// change, or `None` when playback became unavailable.
pub type UpdateCallback = Arc<dyn Fn(Option<PlaybackState>) + Send + Sync>;

/// Handle identifying a registered subscriber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackId(u64);

struct PollHandle {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

/// Issues playback commands and state queries against the Web API and runs
/// the background polling loop that fans state changes out to subscribers.
///
/// Control operations return a success boolean and queries return the value
/// or `None`; failures are logged and degrade, they never propagate. Every
/// outbound call first obtains a token from the [`AuthController`]; without
/// one the operation is skipped entirely.
pub struct SpotifyController {
    auth: Arc<AuthController>,
    api: PlayerApi,
    dispatcher: Arc<dyn UiDispatcher>,
    latest_state: Mutex<Option<PlaybackState>>,
    subscribers: Mutex<Vec<(CallbackId, UpdateCallback)>>,
    next_callback_id: AtomicU64,
    poll: Mutex<Option<PollHandle>>,
    poll_interval: Duration,
}

impl SpotifyController {
    pub fn new(
        auth: Arc<AuthController>,
        dispatcher: Arc<dyn UiDispatcher>,
        endpoints: ApiEndpoints,
        retry: RetryPolicy,
    ) -> Self {
        SpotifyController {
            auth,
            api: PlayerApi::new(endpoints, retry),
            dispatcher,
            latest_state: Mutex::new(None),
            subscribers: Mutex::new(Vec::new()),
            next_callback_id: AtomicU64::new(1),
            poll: Mutex::new(None),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Fetches the current playback state from the API.
    ///
    /// Distinguishes an active player (200), no active device (204) and
    /// "unknown" when the query failed after retries.
    pub async fn playback_state(&self) -> PlaybackQuery {
        let Some(token) = self.bearer("playback state").await else {
            return PlaybackQuery::Unknown;
        };

        match self.api.playback_state(&token).await {
            Ok(Some(state)) => PlaybackQuery::Active(state),
            Ok(None) => PlaybackQuery::Inactive,
            Err(e) => {
                if e.is_auth() {
                    self.auth.invalidate_token().await;
                }
                error!("failed to fetch playback state: {}", e);
                PlaybackQuery::Unknown
            }
        }
    }

    pub async fn is_playing(&self, state: Option<&PlaybackState>) -> Option<bool> {
        self.resolve_state(state).await.and_then(|s| s.is_playing)
    }

    pub async fn shuffle_state(&self, state: Option<&PlaybackState>) -> Option<bool> {
        self.resolve_state(state)
            .await
            .and_then(|s| s.shuffle_state)
    }

    pub async fn repeat_state(&self, state: Option<&PlaybackState>) -> Option<RepeatMode> {
        self.resolve_state(state).await.and_then(|s| s.repeat_mode())
    }

    pub async fn volume_percent(&self, state: Option<&PlaybackState>) -> Option<u8> {
        self.resolve_state(state)
            .await
            .and_then(|s| s.volume_percent())
    }

    /// Album art URL of the currently playing item, if any link in the
    /// chain is present.
    pub async fn playback_art_url(&self, state: Option<&PlaybackState>) -> Option<String> {
        self.resolve_state(state)
            .await
            .and_then(|s| s.art_url().map(str::to_string))
    }

    pub async fn play(&self) -> bool {
        self.send_command(PlayerCommand::Play).await
    }

    pub async fn pause(&self) -> bool {
        self.send_command(PlayerCommand::Pause).await
    }

    pub async fn next_track(&self) -> bool {
        self.send_command(PlayerCommand::NextTrack).await
    }

    pub async fn previous_track(&self) -> bool {
        self.send_command(PlayerCommand::PreviousTrack).await
    }

    /// Flips the shuffle state. When the current state cannot be determined
    /// no request is issued; the new state is returned only when the call
    /// went through.
    pub async fn toggle_shuffle(&self) -> Option<bool> {
        let Some(current) = self.shuffle_state(None).await else {
            warning!("toggle shuffle: current state unknown, leaving playback untouched");
            return None;
        };

        let target = !current;
        if self.send_command(PlayerCommand::Shuffle(target)).await {
            Some(target)
        } else {
            None
        }
    }

    pub async fn set_repeat(&self, mode: RepeatMode) -> bool {
        self.send_command(PlayerCommand::Repeat(mode)).await
    }

    /// Sets the playback volume, clamping the input to 0..=100 before any
    /// request is made.
    pub async fn set_volume(&self, percent: i64) -> bool {
        let clamped = percent.clamp(0, 100) as u8;
        self.send_command(PlayerCommand::Volume(clamped)).await
    }

    pub async fn playback_devices(&self) -> Option<Vec<DeviceInfo>> {
        let token = self.bearer("playback devices").await?;
        match self.api.devices(&token).await {
            Ok(devices) => Some(devices),
            Err(e) => {
                if e.is_auth() {
                    self.auth.invalidate_token().await;
                }
                error!("failed to list playback devices: {}", e);
                None
            }
        }
    }

    pub async fn transfer_playback(&self, device_id: &str) -> bool {
        self.send_command(PlayerCommand::TransferTo(device_id.to_string()))
            .await
    }

    /// Registers a subscriber for playback-state changes. When a state is
    /// already cached it is delivered to the new subscriber right away, so
    /// late subscribers are not blind until the next poll tick.
    pub async fn register_update_callback(&self, callback: UpdateCallback) -> CallbackId {
        let id = CallbackId(self.next_callback_id.fetch_add(1, Ordering::Relaxed));
        let snapshot = self.latest_state.lock().await.clone();
        self.subscribers
            .lock()
            .await
            .push((id, Arc::clone(&callback)));

        if let Some(state) = snapshot {
            self.dispatcher
                .dispatch(Box::new(move || callback(Some(state))));
        }
        id
    }

    /// Removes a subscriber. Unknown ids are ignored.
    pub async fn unregister_update_callback(&self, id: CallbackId) {
        self.subscribers
            .lock()
            .await
            .retain(|(existing, _)| *existing != id);
    }

    /// Starts the background polling loop. No-op when it is already running.
    pub async fn start_polling(self: Arc<Self>) {
        let mut poll = self.poll.lock().await;
        if let Some(handle) = poll.as_ref() {
            if !handle.task.is_finished() {
                return;
            }
        }

        let (stop_tx, stop_rx) = watch::channel(false);
        let controller = Arc::clone(&self);
        let task = tokio::spawn(async move { controller.poll_loop(stop_rx).await });
        *poll = Some(PollHandle {
            stop: stop_tx,
            task,
        });
    }

    /// Signals the polling loop to stop and waits for it to acknowledge,
    /// bounded by the poll interval plus a grace period. An in-flight
    /// request is allowed to finish; the task is never terminated forcibly.
    pub async fn stop_polling(&self) {
        let handle = self.poll.lock().await.take();
        let Some(PollHandle { stop, task }) = handle else {
            return;
        };

        let _ = stop.send(true);
        let grace = self.poll_interval + STOP_GRACE;
        if timeout(grace, task).await.is_err() {
            warning!("polling task did not stop within {:?}", grace);
        }
    }

    async fn poll_loop(self: Arc<Self>, mut stop: watch::Receiver<bool>) {
        loop {
            let tick_started = Instant::now();

            let observed = self.playback_state().await.state();

            let changed = {
                let mut cache = self.latest_state.lock().await;
                let changed = match (cache.as_ref(), observed.as_ref()) {
                    (None, None) => false,
                    (Some(previous), Some(current)) => !previous.same_observation(current),
                    _ => true,
                };
                if changed {
                    *cache = observed.clone();
                }
                changed
            };

            if changed {
                self.notify_subscribers(observed).await;
            }

            // tick cadence is start-to-start; a slow tick shortens the sleep
            // and an overrun fires the next tick immediately
            let wait = self.poll_interval.saturating_sub(tick_started.elapsed());
            tokio::select! {
                _ = tokio::time::sleep(wait) => {}
                result = stop.changed() => {
                    if result.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
            if *stop.borrow() {
                break;
            }
        }
    }

    async fn notify_subscribers(&self, state: Option<PlaybackState>) {
        let subscribers: Vec<UpdateCallback> = self
            .subscribers
            .lock()
            .await
            .iter()
            .map(|(_, callback)| Arc::clone(callback))
            .collect();

        for callback in subscribers {
            let snapshot = state.clone();
            self.dispatcher
                .dispatch(Box::new(move || callback(snapshot)));
        }
    }

    async fn bearer(&self, op: &str) -> Option<String> {
        let token = self.auth.valid_token().await;
        if token.is_none() {
            warning!("{}: no access token available, skipping request", op);
        }
        token
    }

    async fn resolve_state(&self, given: Option<&PlaybackState>) -> Option<PlaybackState> {
        if let Some(state) = given {
            return Some(state.clone());
        }
        if let Some(cached) = self.latest_state.lock().await.clone() {
            return Some(cached);
        }
        self.playback_state().await.state()
    }

    async fn send_command(&self, command: PlayerCommand) -> bool {
        let Some(token) = self.bearer(command.describe()).await else {
            return false;
        };

        match self.api.command(&token, &command).await {
            Ok(()) => true,
            Err(e) => {
                if e.is_auth() {
                    self.auth.invalidate_token().await;
                }
                error!("{} failed: {}", command.describe(), e);
                false
            }
        }
    }
}
