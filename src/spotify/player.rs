use reqwest::{Client, RequestBuilder, Response, StatusCode};
use thiserror::Error;

use crate::{
    config::ApiEndpoints,
    retry::{RetryPolicy, send_with_retry},
    spotify::{REQUEST_TIMEOUT, truncate_body},
    types::{DeviceInfo, DevicesResponse, PlaybackState, RepeatMode},
};

/// Failure of a player-endpoint call.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The endpoint answered with a non-success status after retries.
    /// Carries a truncated response body.
    #[error("player endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request never produced a usable response (connection failure,
    /// timeout, malformed body).
    #[error("player request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl PlayerError {
    /// Whether the failure indicates a rejected bearer token, in which case
    /// the caller should invalidate its cached token and force a refresh.
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            PlayerError::Status { status, .. }
                if *status == StatusCode::UNAUTHORIZED || *status == StatusCode::FORBIDDEN
        )
    }
}

/// A playback command issued against the player endpoints.
#[derive(Debug, Clone)]
pub enum PlayerCommand {
    Play,
    Pause,
    NextTrack,
    PreviousTrack,
    Shuffle(bool),
    Repeat(RepeatMode),
    Volume(u8),
    TransferTo(String),
}

impl PlayerCommand {
    /// Operation name used in log output.
    pub fn describe(&self) -> &'static str {
        match self {
            PlayerCommand::Play => "play",
            PlayerCommand::Pause => "pause",
            PlayerCommand::NextTrack => "next track",
            PlayerCommand::PreviousTrack => "previous track",
            PlayerCommand::Shuffle(_) => "shuffle",
            PlayerCommand::Repeat(_) => "repeat",
            PlayerCommand::Volume(_) => "volume",
            PlayerCommand::TransferTo(_) => "transfer playback",
        }
    }
}

/// Bearer-authenticated client for the Web API player endpoints.
pub struct PlayerApi {
    client: Client,
    endpoints: ApiEndpoints,
    retry: RetryPolicy,
}

impl PlayerApi {
    pub fn new(endpoints: ApiEndpoints, retry: RetryPolicy) -> Self {
        Self {
            client: Client::new(),
            endpoints,
            retry,
        }
    }

    /// Fetches the current playback state.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(state))` - an active player answered with a state body (200)
    /// - `Ok(None)` - no active device (204)
    /// - `Err(_)` - any other outcome after retries
    pub async fn playback_state(&self, token: &str) -> Result<Option<PlaybackState>, PlayerError> {
        let url = self.endpoints.player_url("");
        let response = send_with_retry(&self.retry, "playback state", || {
            self.client
                .get(&url)
                .bearer_auth(token)
                .timeout(REQUEST_TIMEOUT)
                .send()
        })
        .await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json::<PlaybackState>().await?)),
            StatusCode::NO_CONTENT => Ok(None),
            _ => Err(status_error(response).await),
        }
    }

    /// Lists the devices currently available for playback.
    pub async fn devices(&self, token: &str) -> Result<Vec<DeviceInfo>, PlayerError> {
        let url = self.endpoints.player_url("/devices");
        let response = send_with_retry(&self.retry, "playback devices", || {
            self.client
                .get(&url)
                .bearer_auth(token)
                .timeout(REQUEST_TIMEOUT)
                .send()
        })
        .await?;

        if response.status() == StatusCode::OK {
            return Ok(response.json::<DevicesResponse>().await?.devices);
        }
        Err(status_error(response).await)
    }

    /// Issues a playback command.
    ///
    /// Success is HTTP 204; device transfer additionally accepts 202, which
    /// Spotify returns while the handover is still in flight.
    pub async fn command(&self, token: &str, command: &PlayerCommand) -> Result<(), PlayerError> {
        let response = send_with_retry(&self.retry, command.describe(), || {
            self.request_for(token, command).send()
        })
        .await?;

        let status = response.status();
        let accepted = status == StatusCode::NO_CONTENT
            || (matches!(command, PlayerCommand::TransferTo(_)) && status == StatusCode::ACCEPTED);
        if accepted {
            return Ok(());
        }
        Err(status_error(response).await)
    }

    fn request_for(&self, token: &str, command: &PlayerCommand) -> RequestBuilder {
        let builder = match command {
            PlayerCommand::Play => self.client.put(self.endpoints.player_url("/play")),
            PlayerCommand::Pause => self.client.put(self.endpoints.player_url("/pause")),
            PlayerCommand::NextTrack => self.client.post(self.endpoints.player_url("/next")),
            PlayerCommand::PreviousTrack => {
                self.client.post(self.endpoints.player_url("/previous"))
            }
            PlayerCommand::Shuffle(on) => self
                .client
                .put(self.endpoints.player_url("/shuffle"))
                .query(&[("state", if *on { "true" } else { "false" })]),
            PlayerCommand::Repeat(mode) => self
                .client
                .put(self.endpoints.player_url("/repeat"))
                .query(&[("state", mode.as_str())]),
            PlayerCommand::Volume(percent) => self
                .client
                .put(self.endpoints.player_url("/volume"))
                .query(&[("volume_percent", percent.to_string())]),
            PlayerCommand::TransferTo(device_id) => self
                .client
                .put(self.endpoints.player_url(""))
                .json(&serde_json::json!({ "device_ids": [device_id] })),
        };

        builder.bearer_auth(token).timeout(REQUEST_TIMEOUT)
    }
}

async fn status_error(response: Response) -> PlayerError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    PlayerError::Status {
        status,
        body: truncate_body(&body),
    }
}
