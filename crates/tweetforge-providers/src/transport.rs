//! Retrying request executor.
//!
//! One HTTP call with bounded retries, exponential backoff, and
//! `Retry-After` support. Status-code failures are data, not errors: the
//! final failing response is *returned* so callers can inspect it; only a
//! request that never produced a response surfaces as
//! [`GenerationError::Network`].

use std::time::Duration;

use reqwest::{RequestBuilder, Response, StatusCode};
use tracing::{debug, warn};

use tweetforge_core::error::GenerationError;

// ─────────────────────────────────────────────
// Policy
// ─────────────────────────────────────────────

/// Retry behavior for one call.
#[derive(Clone, Copy, Debug)]
pub struct RetryPolicy {
    /// Retries after the first attempt; total attempts = `max_retries + 1`.
    pub max_retries: u32,
    /// First backoff delay; doubles per attempt.
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `attempt` (0-based), absent `Retry-After`.
    fn backoff(&self, attempt: u32) -> Duration {
        self.initial_delay.saturating_mul(1u32 << attempt.min(16))
    }
}

/// Why a retry is about to happen — handed to the observer callback.
#[derive(Clone, Debug)]
pub enum RetryReason {
    /// The response carried a retryable status (429 or 5xx).
    Status(u16),
    /// The request failed without producing a response.
    Network(String),
}

/// Observer invoked before each retry with `(attempt, reason)`.
pub type RetryObserver<'a> = &'a mut (dyn FnMut(u32, &RetryReason) + Send);

// ─────────────────────────────────────────────
// Executor
// ─────────────────────────────────────────────

/// Execute a request with retries.
///
/// `factory` builds a fresh request per attempt (request bodies are not
/// replayable once sent).
///
/// - ok, or a 4xx other than 429 → returned immediately; client errors
///   besides rate-limiting are never retried.
/// - 429 or 5xx → back off (`Retry-After` seconds when parseable, doubled
///   `initial_delay` otherwise) and retry; the last attempt's failing
///   response is returned rather than an error.
/// - No response at all → same schedule; the last error propagates.
pub async fn execute(
    factory: impl Fn() -> RequestBuilder,
    policy: RetryPolicy,
    mut observer: Option<RetryObserver<'_>>,
) -> Result<Response, GenerationError> {
    let mut attempt: u32 = 0;

    loop {
        match factory().send().await {
            Ok(response) => {
                let status = response.status();
                if !is_retryable_status(status) {
                    return Ok(response);
                }
                if attempt >= policy.max_retries {
                    debug!(status = %status, attempts = attempt + 1, "retries exhausted, returning failing response");
                    return Ok(response);
                }

                let delay = retry_after(&response).unwrap_or_else(|| policy.backoff(attempt));
                warn!(
                    status = %status,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "retryable response, backing off"
                );
                let reason = RetryReason::Status(status.as_u16());
                if let Some(cb) = observer.as_deref_mut() {
                    cb(attempt, &reason);
                }
                tokio::time::sleep(delay).await;
            }
            Err(e) => {
                if attempt >= policy.max_retries {
                    return Err(GenerationError::Network(e.to_string()));
                }

                let delay = policy.backoff(attempt);
                warn!(
                    error = %e,
                    attempt = attempt + 1,
                    delay_ms = delay.as_millis() as u64,
                    "network error, backing off"
                );
                let reason = RetryReason::Network(e.to_string());
                if let Some(cb) = observer.as_deref_mut() {
                    cb(attempt, &reason);
                }
                tokio::time::sleep(delay).await;
            }
        }
        attempt += 1;
    }
}

/// 429 and all 5xx retry; everything else is final.
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// A parseable `Retry-After` header, in whole seconds.
fn retry_after(response: &Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

// ─────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────
