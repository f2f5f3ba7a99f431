//! Configuration for the Spotify playback core.
//!
//! This module defines the typed plugin settings persisted through the host
//! application's settings store, and the API endpoint configuration used by
//! the HTTP layer. Settings are validated at load time: empty strings are
//! normalized to `None` so the rest of the code only ever has to distinguish
//! "present" from "absent".
//!
//! The endpoint configuration carries production defaults for Spotify's
//! accounts service and Web API, and can be pointed at a different base URL
//! (e.g. a local mock server in tests).

use serde::{Deserialize, Serialize};

/// OAuth redirect target registered for the plugin.
///
/// The embedded login window intercepts navigation to this URL and extracts
/// the `code` query parameter instead of letting the navigation complete.
pub const REDIRECT_URI: &str = "https://stream-controller/callback";

/// OAuth scopes requested during the login flow.
///
/// Covers reading the playback state and controlling playback, which is the
/// full surface this plugin needs.
pub const AUTH_SCOPE: &str =
    "user-read-playback-state user-modify-playback-state user-read-currently-playing";

/// Plugin settings persisted through the host's settings store.
///
/// All fields are optional: a fresh installation starts with nothing, and the
/// login flow fills the fields in over time. `client_authorization` is a
/// one-time authorization code that is cleared again after a successful
/// token exchange; `client_refresh_token` is the only long-lived credential.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct PluginSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_authorization: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_refresh_token: Option<String>,
}

impl PluginSettings {
    /// Normalizes the settings after loading from the host store.
    ///
    /// Hosts commonly persist cleared text entries as empty strings; those
    /// are folded into `None` so presence checks stay meaningful.
    pub fn sanitize(mut self) -> Self {
        fn non_empty(value: Option<String>) -> Option<String> {
            value.filter(|v| !v.trim().is_empty())
        }

        self.client_id = non_empty(self.client_id);
        self.client_secret = non_empty(self.client_secret);
        self.client_authorization = non_empty(self.client_authorization);
        self.client_refresh_token = non_empty(self.client_refresh_token);
        self
    }
}

impl std::fmt::Debug for PluginSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PluginSettings")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_deref().map(redact))
            .field(
                "client_authorization",
                &self.client_authorization.as_deref().map(redact),
            )
            .field(
                "client_refresh_token",
                &self.client_refresh_token.as_deref().map(redact),
            )
            .finish()
    }
}

/// Base URLs for the Spotify services consumed by the plugin.
///
/// The defaults point at production Spotify. Tests and host prototypes can
/// substitute a local server by constructing the value explicitly.
#[derive(Debug, Clone)]
pub struct ApiEndpoints {
    /// Base URL of the accounts service (authorization and token grants).
    pub accounts_url: String,
    /// Base URL of the Web API, including the version prefix.
    pub api_url: String,
}

impl Default for ApiEndpoints {
    fn default() -> Self {
        Self {
            accounts_url: "https://accounts.spotify.com".to_string(),
            api_url: "https://api.spotify.com/v1".to_string(),
        }
    }
}

impl ApiEndpoints {
    /// URL of the browser-rendered authorization page.
    pub fn authorize_url(&self) -> String {
        format!("{}/authorize", self.accounts_url)
    }

    /// URL of the token endpoint for both grant types.
    pub fn token_url(&self) -> String {
        format!("{}/api/token", self.accounts_url)
    }

    /// URL of the player endpoint, with an optional sub-path.
    pub fn player_url(&self, path: &str) -> String {
        format!("{}/me/player{}", self.api_url, path)
    }
}

/// Shortens a secret for log output, keeping just enough to correlate.
pub(crate) fn redact(value: &str) -> String {
    if value.chars().count() <= 8 {
        return "***".to_string();
    }
    let head: String = value.chars().take(8).collect();
    format!("{head}***")
}
