//! # Spotify Integration Module
//!
//! This module provides the raw HTTP interface to the Spotify services the
//! plugin consumes: the accounts service for OAuth token grants and the Web
//! API player endpoints for playback control and state queries. It handles
//! request construction, authentication headers, retry behavior and status
//! interpretation, providing a clean Rust interface for the controllers in
//! [`crate::management`].
//!
//! ## Core Modules
//!
//! ### Authentication Module
//!
//! [`auth`] - Token-endpoint grants for the OAuth 2.0 authorization-code
//! flow:
//! - **Code Exchange**: Exchanges a one-time authorization code for the
//!   initial access and refresh tokens
//! - **Token Refresh**: Exchanges the long-lived refresh token for a fresh
//!   access token without user interaction
//! - **Basic Auth**: Both grants authenticate with
//!   `Authorization: Basic base64(client_id:client_secret)`
//! - **Terminal Errors**: A 400 response carrying `invalid_grant` is
//!   surfaced as its own error variant so callers can purge the dead
//!   refresh token
//!
//! ### Player Module
//!
//! [`player`] - Bearer-authenticated Web API calls:
//! - **State Queries**: Playback state (200 with a body, 204 for no active
//!   device) and the available-device list
//! - **Playback Commands**: Play, pause, skip, shuffle, repeat, volume and
//!   device transfer, all expecting 204 on success
//!
//! ## Error Handling
//!
//! Every outbound request goes through [`crate::retry::send_with_retry`]:
//! 429 and 5xx responses and transport failures are retried with backoff,
//! other 4xx responses fail immediately. Response bodies included in errors
//! are truncated so log lines stay readable and never carry full payloads.
//!
//! ## API Coverage
//!
//! - `POST /api/token` - authorization-code and refresh-token grants
//! - `GET /me/player` - playback state
//! - `GET /me/player/devices` - available playback devices
//! - `PUT /me/player/play`, `PUT /me/player/pause` - start/stop playback
//! - `POST /me/player/next`, `POST /me/player/previous` - track skipping
//! - `PUT /me/player/shuffle?state=` - shuffle toggle
//! - `PUT /me/player/repeat?state=` - repeat mode
//! - `PUT /me/player/volume?volume_percent=` - volume
//! - `PUT /me/player` - transfer playback to another device

use std::time::Duration;

pub mod auth;
pub mod player;

/// Per-request timeout applied to every outbound call.
pub(crate) const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

const MAX_LOGGED_BODY: usize = 200;

/// Truncates a response body for inclusion in error messages and logs.
pub(crate) fn truncate_body(body: &str) -> String {
    if body.chars().count() <= MAX_LOGGED_BODY {
        return body.to_string();
    }
    let head: String = body.chars().take(MAX_LOGGED_BODY).collect();
    format!("{head}...")
}
