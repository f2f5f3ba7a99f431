#![allow(dead_code)]

// Shared test fixtures: a local mock of the Spotify endpoints plus scripted
// host capabilities.

use std::{
    collections::{HashMap, VecDeque},
    net::SocketAddr,
    sync::{Arc, Mutex},
    time::Duration,
};

use async_trait::async_trait;
use axum::{
    Json, Router,
    extract::{Form, State},
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde_json::json;
use spotideck::{
    config::{ApiEndpoints, PluginSettings},
    host::{LoginWindow, MemorySettingsStore, QueueDispatcher},
    management::{AuthController, SpotifyController, UpdateCallback},
    retry::RetryPolicy,
    types::{
        AlbumInfo, DeviceInfo, ImageInfo, PlaybackDevice, PlaybackItem, PlaybackState,
    },
};
use tokio::net::TcpListener;

/// Scripted reply for the token endpoint.
pub enum TokenReply {
    Token {
        access_token: String,
        expires_in: i64,
        refresh_token: Option<String>,
    },
    InvalidGrant,
    Status(u16),
}

#[derive(Default)]
struct MockState {
    playback: Mutex<Option<PlaybackState>>,
    devices: Mutex<Vec<DeviceInfo>>,
    token_replies: Mutex<VecDeque<TokenReply>>,
    token_requests: Mutex<Vec<HashMap<String, String>>>,
    player_requests: Mutex<Vec<String>>,
    player_status: Mutex<Option<u16>>,
}

/// Local server standing in for both the accounts service and the Web API.
pub struct MockSpotify {
    addr: SocketAddr,
    state: Arc<MockState>,
}

impl MockSpotify {
    pub async fn spawn() -> Self {
        let state = Arc::new(MockState::default());

        let app = Router::new()
            .route("/api/token", post(token_grant))
            .route("/v1/me/player", get(playback_state).put(record_command))
            .route("/v1/me/player/devices", get(device_list))
            .route("/v1/me/player/play", put(record_command))
            .route("/v1/me/player/pause", put(record_command))
            .route("/v1/me/player/next", post(record_command))
            .route("/v1/me/player/previous", post(record_command))
            .route("/v1/me/player/shuffle", put(record_command))
            .route("/v1/me/player/repeat", put(record_command))
            .route("/v1/me/player/volume", put(record_command))
            .with_state(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        MockSpotify { addr, state }
    }

    pub fn endpoints(&self) -> ApiEndpoints {
        ApiEndpoints {
            accounts_url: format!("http://{}", self.addr),
            api_url: format!("http://{}/v1", self.addr),
        }
    }

    /// What `GET /v1/me/player` answers: a state body (200) or `None` (204).
    pub fn set_playback(&self, state: Option<PlaybackState>) {
        *self.state.playback.lock().unwrap() = state;
    }

    pub fn set_devices(&self, devices: Vec<DeviceInfo>) {
        *self.state.devices.lock().unwrap() = devices;
    }

    /// Forces every player endpoint to answer with the given status.
    pub fn set_player_status(&self, status: Option<u16>) {
        *self.state.player_status.lock().unwrap() = status;
    }

    pub fn queue_token_reply(&self, reply: TokenReply) {
        self.state.token_replies.lock().unwrap().push_back(reply);
    }

    /// Form bodies received by the token endpoint, in order.
    pub fn token_requests(&self) -> Vec<HashMap<String, String>> {
        self.state.token_requests.lock().unwrap().clone()
    }

    /// "METHOD path?query" lines for every player-endpoint request.
    pub fn player_requests(&self) -> Vec<String> {
        self.state.player_requests.lock().unwrap().clone()
    }
}

async fn token_grant(
    State(state): State<Arc<MockState>>,
    Form(params): Form<HashMap<String, String>>,
) -> Response {
    state.token_requests.lock().unwrap().push(params);

    let reply = state
        .token_replies
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or(TokenReply::Token {
            access_token: "mock-access-token".to_string(),
            expires_in: 3600,
            refresh_token: Some("mock-refresh-token".to_string()),
        });

    match reply {
        TokenReply::Token {
            access_token,
            expires_in,
            refresh_token,
        } => {
            let mut body = json!({
                "access_token": access_token,
                "token_type": "Bearer",
                "expires_in": expires_in,
                "scope": "user-read-playback-state",
            });
            if let Some(refresh) = refresh_token {
                body["refresh_token"] = json!(refresh);
            }
            (StatusCode::OK, Json(body)).into_response()
        }
        TokenReply::InvalidGrant => (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "error": "invalid_grant",
                "error_description": "Refresh token revoked",
            })),
        )
            .into_response(),
        TokenReply::Status(code) => StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response(),
    }
}

async fn playback_state(State(state): State<Arc<MockState>>, method: Method, uri: Uri) -> Response {
    state
        .player_requests
        .lock()
        .unwrap()
        .push(format!("{} {}", method, uri));

    if let Some(code) = *state.player_status.lock().unwrap() {
        return StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response();
    }

    match state.playback.lock().unwrap().clone() {
        Some(playing) => (StatusCode::OK, Json(playing)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    }
}

async fn device_list(State(state): State<Arc<MockState>>, method: Method, uri: Uri) -> Response {
    state
        .player_requests
        .lock()
        .unwrap()
        .push(format!("{} {}", method, uri));

    if let Some(code) = *state.player_status.lock().unwrap() {
        return StatusCode::from_u16(code)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            .into_response();
    }

    let devices = state.devices.lock().unwrap().clone();
    (StatusCode::OK, Json(json!({ "devices": devices }))).into_response()
}

async fn record_command(
    State(state): State<Arc<MockState>>,
    method: Method,
    uri: Uri,
) -> StatusCode {
    state
        .player_requests
        .lock()
        .unwrap()
        .push(format!("{} {}", method, uri));

    if let Some(code) = *state.player_status.lock().unwrap() {
        return StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    }
    StatusCode::NO_CONTENT
}

/// Login window that records opened URLs and resolves to a fixed outcome.
pub struct ScriptedLoginWindow {
    code: Option<String>,
    pub opened_urls: Mutex<Vec<String>>,
}

impl ScriptedLoginWindow {
    pub fn returning(code: Option<&str>) -> Self {
        ScriptedLoginWindow {
            code: code.map(str::to_string),
            opened_urls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LoginWindow for ScriptedLoginWindow {
    async fn open_and_await_code(&self, url: &str) -> Option<String> {
        self.opened_urls.lock().unwrap().push(url.to_string());
        self.code.clone()
    }
}

/// Retry policy that keeps failing tests fast.
pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 0,
        initial_backoff: Duration::from_millis(1),
        max_backoff: Duration::from_millis(5),
        jitter_factor: 0.0,
    }
}

/// Settings of a fully logged-in installation.
pub fn logged_in_settings() -> PluginSettings {
    PluginSettings {
        client_id: Some("test-client-id".to_string()),
        client_secret: Some("test-client-secret".to_string()),
        client_authorization: None,
        client_refresh_token: Some("stored-refresh-token".to_string()),
    }
}

/// A representative playback state; tests clone and tweak single fields.
pub fn sample_state() -> PlaybackState {
    PlaybackState {
        timestamp: Some(1_700_000_000_000),
        is_playing: Some(true),
        shuffle_state: Some(false),
        repeat_state: Some("off".to_string()),
        item: Some(PlaybackItem {
            id: Some("track-1".to_string()),
            name: Some("Test Track".to_string()),
            album: Some(AlbumInfo {
                images: vec![ImageInfo {
                    url: "https://images.example/cover.jpg".to_string(),
                }],
            }),
        }),
        device: Some(PlaybackDevice {
            id: Some("device-1".to_string()),
            name: Some("Test Device".to_string()),
            is_active: Some(true),
            volume_percent: Some(30),
        }),
    }
}

/// Controller wired to the mock server with a logged-in settings store.
pub async fn logged_in_controller(
    server: &MockSpotify,
) -> (Arc<SpotifyController>, Arc<MemorySettingsStore>) {
    controller_with_settings(server, logged_in_settings()).await
}

pub async fn controller_with_settings(
    server: &MockSpotify,
    settings: PluginSettings,
) -> (Arc<SpotifyController>, Arc<MemorySettingsStore>) {
    let store = Arc::new(MemorySettingsStore::with_settings(settings));
    let window = Arc::new(ScriptedLoginWindow::returning(None));
    let auth = Arc::new(AuthController::new(
        store.clone(),
        window,
        server.endpoints(),
        fast_retry(),
    ));
    let controller = Arc::new(
        SpotifyController::new(
            auth,
            QueueDispatcher::spawn(),
            server.endpoints(),
            fast_retry(),
        )
        .with_poll_interval(Duration::from_millis(50)),
    );
    (controller, store)
}

/// Callback that appends every delivery to a shared vector.
pub fn recording_callback() -> (UpdateCallback, Arc<Mutex<Vec<Option<PlaybackState>>>>) {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    let callback: UpdateCallback = Arc::new(move |state| sink.lock().unwrap().push(state));
    (callback, events)
}
