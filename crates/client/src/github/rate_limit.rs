//! GitHub API rate-limit tracking.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use augments_core::ProviderError;
use chrono::{DateTime, TimeZone, Utc};
use reqwest::header::HeaderMap;

use crate::fetch::classify::{RATE_LIMIT_REMAINING, RATE_LIMIT_RESET};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Window {
    remaining: Option<u64>,
    reset: Option<DateTime<Utc>>,
}

/// Spaces requests and fails fast while the API window is exhausted.
#[derive(Debug)]
pub struct RateLimiter {
    last_request: tokio::sync::Mutex<Option<Instant>>,
    min_interval: Duration,
    window: Mutex<Window>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self { last_request: tokio::sync::Mutex::new(None), min_interval, window: Mutex::new(Window::default()) }
    }

    /// Wait out the minimum interval, or fail with `RateLimited` while the
    /// last seen window is exhausted and not yet reset.
    pub async fn acquire(&self) -> Result<(), ProviderError> {
        self.check(Utc::now())?;

        let mut last = self.last_request.lock().await;
        if let Some(at) = *last {
            let elapsed = at.elapsed();
            if elapsed < self.min_interval {
                tokio::time::sleep(self.min_interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
        Ok(())
    }

    fn check(&self, now: DateTime<Utc>) -> Result<(), ProviderError> {
        let window = *self.window.lock().unwrap_or_else(PoisonError::into_inner);
        match window {
            Window { remaining: Some(0), reset: Some(reset) } if reset > now => Err(ProviderError::RateLimited(format!(
                "GitHub API rate limit exhausted, resets at {}",
                reset.to_rfc3339()
            ))),
            _ => Ok(()),
        }
    }

    /// Record the window reported by a response.
    pub fn observe(&self, headers: &HeaderMap) {
        let parse = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).and_then(|v| v.trim().parse::<i64>().ok());

        let mut window = self.window.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(remaining) = parse(RATE_LIMIT_REMAINING) {
            window.remaining = u64::try_from(remaining).ok();
        }
        if let Some(reset) = parse(RATE_LIMIT_RESET) {
            window.reset = Utc.timestamp_opt(reset, 0).single();
        }
        if window.remaining == Some(0) {
            tracing::warn!(reset = ?window.reset, "GitHub API rate limit exhausted");
        }
    }

    /// Requests left in the current window, if a response reported it.
    pub fn remaining(&self) -> Option<u64> {
        self.window.lock().unwrap_or_else(PoisonError::into_inner).remaining
    }
}
