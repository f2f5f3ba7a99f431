//! Retry policy for outbound HTTP calls.
//!
//! Spotify's API is rate-limited and occasionally flaky. The wrapper in this
//! module retries transient failures (429, 5xx, transport errors) with
//! exponential backoff and jitter, while failing immediately on other client
//! errors where a retry cannot possibly help.

use std::{future::Future, time::Duration};

use rand::Rng;
use reqwest::{Response, StatusCode};

use crate::warning;

/// Parameters controlling the retry behavior of a single logical request.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Maximum number of retries after the initial attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound for the exponentially growing delay.
    pub max_backoff: Duration,
    /// Each delay is multiplied by a uniform random factor in
    /// `1 ± jitter_factor`.
    pub jitter_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(10),
            jitter_factor: 0.1,
        }
    }
}

fn transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Performs an HTTP call with bounded retries and exponential backoff.
///
/// `send` must perform exactly one outbound request per invocation. Responses
/// with a 4xx status other than 429 are returned immediately without retry;
/// 429, 5xx and transport-level failures are retried until `max_retries` is
/// exhausted, after which the last outcome is surfaced unchanged.
///
/// # Arguments
///
/// * `policy` - Backoff parameters for this call
/// * `op` - Operation name used in log output
/// * `send` - Closure issuing the request
///
/// # Returns
///
/// The final `reqwest` outcome: a response (whose status the caller still has
/// to interpret) or the last transport error.
///
/// # Example
///
/// ```
/// let response = send_with_retry(&policy, "playback state", || {
///     client.get(&url).bearer_auth(token).send()
/// })
/// .await?;
/// ```
pub async fn send_with_retry<F, Fut>(
    policy: &RetryPolicy,
    op: &str,
    mut send: F,
) -> Result<Response, reqwest::Error>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Response, reqwest::Error>>,
{
    let mut backoff = policy.initial_backoff;
    let mut attempt = 0u32;

    loop {
        let outcome = send().await;

        let retryable = match &outcome {
            Ok(response) => transient(response.status()),
            Err(_) => true,
        };
        if !retryable || attempt >= policy.max_retries {
            return outcome;
        }

        let low = (1.0 - policy.jitter_factor).max(0.0);
        let high = 1.0 + policy.jitter_factor;
        let jitter = rand::rng().random_range(low..=high);
        let delay = backoff.mul_f64(jitter);

        match &outcome {
            Ok(response) => warning!(
                "{}: received {}, retrying in {:?}",
                op,
                response.status(),
                delay
            ),
            Err(err) => warning!("{}: request failed ({}), retrying in {:?}", op, err, delay),
        }

        tokio::time::sleep(delay).await;
        attempt += 1;
        backoff = (backoff * 2).min(policy.max_backoff);
    }
}
