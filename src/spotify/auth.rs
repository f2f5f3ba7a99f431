use base64::{Engine as _, engine::general_purpose::STANDARD};
use reqwest::{Client, StatusCode};
use thiserror::Error;

use crate::{
    config::{ApiEndpoints, REDIRECT_URI},
    retry::{RetryPolicy, send_with_retry},
    spotify::{REQUEST_TIMEOUT, truncate_body},
    types::TokenResponse,
};

/// Failure of a token-endpoint grant.
#[derive(Debug, Error)]
pub enum GrantError {
    /// The grant was rejected with `invalid_grant`: the refresh token (or
    /// authorization code) is permanently dead and must be replaced through
    /// a fresh login flow.
    #[error("grant rejected: credential is no longer valid")]
    InvalidGrant,

    /// The token endpoint answered with a non-success status other than an
    /// `invalid_grant` rejection. Carries a truncated response body.
    #[error("token endpoint returned {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The request never produced a usable response (connection failure,
    /// timeout, malformed body).
    #[error("token request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Exchanges a one-time authorization code for the initial token pair.
///
/// Posts an `authorization_code` grant to the token endpoint, authenticating
/// with HTTP Basic auth built from the client credentials. The code is
/// single-use; a second exchange with the same code yields `InvalidGrant`.
///
/// # Returns
///
/// The parsed token response, including the refresh token Spotify issues
/// alongside the first access token.
pub async fn exchange_code(
    client: &Client,
    endpoints: &ApiEndpoints,
    retry: &RetryPolicy,
    client_id: &str,
    client_secret: &str,
    code: &str,
) -> Result<TokenResponse, GrantError> {
    post_grant(
        client,
        endpoints,
        retry,
        "token exchange",
        client_id,
        client_secret,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", REDIRECT_URI),
        ],
    )
    .await
}

/// Exchanges the long-lived refresh token for a fresh access token.
///
/// Posts a `refresh_token` grant with the refresh token and client id in the
/// body and the client credentials in the Basic auth header. Spotify may
/// rotate the refresh token; when the response carries a new one the caller
/// must persist it before discarding the old value.
///
/// # Errors
///
/// Returns [`GrantError::InvalidGrant`] when the stored refresh token has
/// been revoked, which callers treat as a terminal condition requiring a
/// fresh login flow.
pub async fn refresh_grant(
    client: &Client,
    endpoints: &ApiEndpoints,
    retry: &RetryPolicy,
    client_id: &str,
    client_secret: &str,
    refresh_token: &str,
) -> Result<TokenResponse, GrantError> {
    post_grant(
        client,
        endpoints,
        retry,
        "token refresh",
        client_id,
        client_secret,
        &[
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token),
            ("client_id", client_id),
        ],
    )
    .await
}

async fn post_grant(
    client: &Client,
    endpoints: &ApiEndpoints,
    retry: &RetryPolicy,
    op: &str,
    client_id: &str,
    client_secret: &str,
    form: &[(&str, &str)],
) -> Result<TokenResponse, GrantError> {
    let secrets = STANDARD.encode(format!("{client_id}:{client_secret}"));
    let url = endpoints.token_url();

    let response = send_with_retry(retry, op, || {
        client
            .post(&url)
            .header("Authorization", format!("Basic {secrets}"))
            .form(form)
            .timeout(REQUEST_TIMEOUT)
            .send()
    })
    .await?;

    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<TokenResponse>().await?);
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::BAD_REQUEST && is_invalid_grant(&body) {
        return Err(GrantError::InvalidGrant);
    }

    Err(GrantError::Status {
        status,
        body: truncate_body(&body),
    })
}

fn is_invalid_grant(body: &str) -> bool {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            value
                .get("error")
                .and_then(|e| e.as_str())
                .map(|e| e == "invalid_grant")
        })
        .unwrap_or(false)
}
