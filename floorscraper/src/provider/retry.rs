//! Bounded retry with exponential backoff.
//!
//! The scraper makes no retries by default: a failed request aborts the
//! floor. Wrapping the client in [`RetryingClient`] with a non-zero
//! `max_retries` lets flaky tile servers be ridden out without changing
//! what the rest of the pipeline sees.

use std::thread;
use std::time::Duration;

use tracing::warn;

use super::http::HttpClient;
use crate::error::ScrapeResult;

/// Default initial backoff between attempts.
pub const DEFAULT_RETRY_BACKOFF_MS: u64 = 500;

/// Upper bound on a single backoff sleep.
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// How often and how patiently to retry a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    /// Sleep before the first retry; doubled on each subsequent one.
    pub initial_backoff: Duration,
    /// Cap applied to the doubled backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    /// Never retry.
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            initial_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
            max_backoff: MAX_BACKOFF,
        }
    }

    pub fn new(max_retries: u32, initial_backoff: Duration) -> Self {
        Self {
            max_retries,
            initial_backoff,
            max_backoff: MAX_BACKOFF,
        }
    }

    /// Backoff before retry number `attempt` (1-based).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt.saturating_sub(1)).unwrap_or(u32::MAX);
        self.initial_backoff
            .checked_mul(factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }
}

/// HTTP client decorator that retries failed requests.
#[derive(Debug, Clone)]
pub struct RetryingClient<C> {
    inner: C,
    policy: RetryPolicy,
}

impl<C: HttpClient> RetryingClient<C> {
    pub fn new(inner: C, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn into_inner(self) -> C {
        self.inner
    }
}

impl<C: HttpClient> HttpClient for RetryingClient<C> {
    fn get(&self, url: &str) -> ScrapeResult<Vec<u8>> {
        let mut attempt = 0;
        loop {
            match self.inner.get(url) {
                Ok(body) => return Ok(body),
                Err(e) if attempt < self.policy.max_retries => {
                    attempt += 1;
                    let backoff = self.policy.backoff_for(attempt);
                    warn!(
                        url,
                        attempt,
                        max_retries = self.policy.max_retries,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "Request failed, retrying"
                    );
                    thread::sleep(backoff);
                }
                Err(e) => return Err(e),
            }
        }
    }
}
