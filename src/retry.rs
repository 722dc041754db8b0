//! Throttle handling for API requests
//!
//! The API signals rate limiting with `429 Too Many Requests` and a
//! `retry-after` header giving the cooldown in whole seconds. This module
//! sleeps for that cooldown and resubmits the identical request, as many times
//! as the server asks. There is no attempt cap, no jitter and no growth: the
//! server dictates the pace.
//!
//! Only the integer-seconds form of `retry-after` is understood. The HTTP-date
//! form is rejected with [`Error::RetryAfter`].
//!
//! # Example
//!
//! ```no_run
//! use listen_harvest::retry::{FetchCounters, send_with_throttle_retry};
//!
//! # async fn example() -> listen_harvest::Result<()> {
//! let http = reqwest::Client::new();
//! let counters = FetchCounters::default();
//! let response = send_with_throttle_retry(&counters, || {
//!     http.get("https://api.spotify.com/v1/me").send()
//! })
//! .await?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Error, Result};
use crate::types::FetchStats;
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Diagnostic counters for one client
///
/// Never consulted for control decisions.
#[derive(Debug, Default)]
pub struct FetchCounters {
    requests: AtomicU64,
    backoffs: AtomicU64,
}

impl FetchCounters {
    /// Count one HTTP attempt
    pub fn record_request(&self) {
        self.requests.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one 429 response
    pub fn record_backoff(&self) {
        self.backoffs.fetch_add(1, Ordering::Relaxed);
    }

    /// Current values
    pub fn snapshot(&self) -> FetchStats {
        FetchStats {
            requests: self.requests.load(Ordering::Relaxed),
            backoffs: self.backoffs.load(Ordering::Relaxed),
        }
    }
}

/// Send a request, sleeping and resubmitting for as long as the server answers 429
///
/// `send` is called once per attempt and must build the same request every
/// time. Any response other than 429 is returned as-is; status checking is the
/// caller's business.
///
/// # Errors
///
/// - [`Error::Network`] if sending fails (not retried)
/// - [`Error::RetryAfter`] if a 429 carries no integer `retry-after`
pub async fn send_with_throttle_retry<F, Fut>(
    counters: &FetchCounters,
    mut send: F,
) -> Result<reqwest::Response>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = std::result::Result<reqwest::Response, reqwest::Error>>,
{
    let mut throttled = 0u32;

    loop {
        counters.record_request();
        let response = send().await?;

        if response.status() != StatusCode::TOO_MANY_REQUESTS {
            if throttled > 0 {
                tracing::info!(
                    attempts = throttled + 1,
                    url = %response.url(),
                    "Request succeeded after throttling"
                );
            }
            return Ok(response);
        }

        counters.record_backoff();
        let cooldown = retry_after(response.headers())?;
        throttled += 1;

        tracing::warn!(
            url = %response.url(),
            cooldown_secs = cooldown.as_secs(),
            throttled = throttled,
            "Rate limited, sleeping before resubmitting"
        );

        tokio::time::sleep(cooldown).await;
    }
}

/// Cooldown requested by a 429 response
///
/// # Errors
/// Returns [`Error::RetryAfter`] if the header is missing or not a whole number of seconds.
pub fn retry_after(headers: &HeaderMap) -> Result<Duration> {
    let value = headers
        .get(RETRY_AFTER)
        .ok_or_else(|| Error::RetryAfter("missing".to_string()))?;

    let text = value
        .to_str()
        .map_err(|e| Error::RetryAfter(format!("not valid text: {e}")))?;

    text.trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::RetryAfter(format!("'{text}' is not a whole number of seconds")))
}
