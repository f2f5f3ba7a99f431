use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::redact;

/// Seconds subtracted from the advertised lifetime so a token is replaced
/// before Spotify actually rejects it.
pub const TOKEN_EXPIRY_BUFFER_SECS: i64 = 60;

#[derive(Clone)]
pub struct Token {
    secret: String,
    expires_at: DateTime<Utc>,
}

impl Token {
    pub fn new(secret: String, expires_in_secs: i64) -> Self {
        Token {
            secret,
            expires_at: Utc::now() + Duration::seconds(expires_in_secs - TOKEN_EXPIRY_BUFFER_SECS),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }
}

impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("secret", &redact(&self.secret))
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackState {
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub is_playing: Option<bool>,
    #[serde(default)]
    pub shuffle_state: Option<bool>,
    #[serde(default)]
    pub repeat_state: Option<String>,
    #[serde(default)]
    pub item: Option<PlaybackItem>,
    #[serde(default)]
    pub device: Option<PlaybackDevice>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackItem {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub album: Option<AlbumInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlbumInfo {
    #[serde(default)]
    pub images: Vec<ImageInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageInfo {
    pub url: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackDevice {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

impl PlaybackState {
    pub fn item_id(&self) -> Option<&str> {
        self.item.as_ref()?.id.as_deref()
    }

    pub fn device_id(&self) -> Option<&str> {
        self.device.as_ref()?.id.as_deref()
    }

    pub fn volume_percent(&self) -> Option<u8> {
        self.device.as_ref()?.volume_percent
    }

    pub fn art_url(&self) -> Option<&str> {
        let album = self.item.as_ref()?.album.as_ref()?;
        album.images.first().map(|image| image.url.as_str())
    }

    pub fn repeat_mode(&self) -> Option<RepeatMode> {
        self.repeat_state.as_deref()?.parse().ok()
    }

    /// Whether two snapshots describe the same observation for the purposes
    /// of change notification. Compares the field set subscribers care about
    /// rather than whole-record equality.
    pub fn same_observation(&self, other: &PlaybackState) -> bool {
        self.timestamp == other.timestamp
            && self.item_id() == other.item_id()
            && self.is_playing == other.is_playing
            && self.shuffle_state == other.shuffle_state
            && self.repeat_state == other.repeat_state
            && self.device_id() == other.device_id()
            && self.volume_percent() == other.volume_percent()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub volume_percent: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<DeviceInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    Off,
    Track,
    Context,
}

impl RepeatMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            RepeatMode::Off => "off",
            RepeatMode::Track => "track",
            RepeatMode::Context => "context",
        }
    }

    /// Advances to the next mode in the cycle off -> track -> context -> off.
    pub fn cycle(&self) -> RepeatMode {
        match self {
            RepeatMode::Off => RepeatMode::Track,
            RepeatMode::Track => RepeatMode::Context,
            RepeatMode::Context => RepeatMode::Off,
        }
    }
}

impl std::str::FromStr for RepeatMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "off" => Ok(RepeatMode::Off),
            "track" => Ok(RepeatMode::Track),
            "context" => Ok(RepeatMode::Context),
            other => Err(format!(
                "invalid repeat mode '{other}', expected one of: off, track, context"
            )),
        }
    }
}

impl std::fmt::Display for RepeatMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of a playback-state query.
///
/// `Inactive` is the 204 "no active device" answer and is distinct from
/// `Unknown`, which means the query itself failed after retries.
#[derive(Debug, Clone)]
pub enum PlaybackQuery {
    Active(PlaybackState),
    Inactive,
    Unknown,
}

impl PlaybackQuery {
    pub fn state(self) -> Option<PlaybackState> {
        match self {
            PlaybackQuery::Active(state) => Some(state),
            PlaybackQuery::Inactive | PlaybackQuery::Unknown => None,
        }
    }
}
