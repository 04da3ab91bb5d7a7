//! Handling of `429 Too Many Requests` responses.

use std::time::Duration;

use reqwest::header::{self, HeaderMap};
use tokio_util::sync::CancellationToken;

use crate::config::BackoffConfig;
use crate::error::{Error, Result};

/// What to do with a throttled response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Throttle {
    /// Wait this long, then send the same request again.
    Retry(Duration),
    /// The retry budget is spent.
    Exhausted(Duration),
    /// No usable `Retry-After`; the response is treated as an ordinary error.
    Unhandled,
}

/// Decides how throttled requests are retried.
#[derive(Debug, Clone, Copy, Default)]
pub struct Backoff {
    config: BackoffConfig,
}

impl Backoff {
    #[must_use]
    pub fn new(config: BackoffConfig) -> Self {
        Self { config }
    }

    /// Classifies a 429 response given how many retries this request already made.
    #[must_use]
    pub fn on_throttled(&self, headers: &HeaderMap, retries: u32) -> Throttle {
        let Some(wait) = retry_after(headers) else {
            return Throttle::Unhandled;
        };
        match self.config.max_retries {
            Some(max) if retries >= max => Throttle::Exhausted(wait),
            _ => Throttle::Retry(wait),
        }
    }
}

/// Parses the `Retry-After` header as a whole number of seconds.
#[must_use]
pub fn retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Sleeps for `wait` unless `cancel` fires first.
pub(crate) async fn sleep_unless_cancelled(wait: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        () = cancel.cancelled() => Err(Error::Cancelled),
        () = tokio::time::sleep(wait) => Ok(()),
    }
}
