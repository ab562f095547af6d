//! Outbound request limiting for upstream marketplaces.
//!
//! Each platform tolerates only so much traffic before it starts answering
//! 429 or serving captcha pages. [`PlatformLimiter`] caps the number of live
//! strategy attempts in flight against one platform across all concurrent
//! searches. Nothing here retries; a failed strategy is never repeated
//! within a call.

use std::sync::Arc;

use reqwest::header::{HeaderMap, RETRY_AFTER};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use vitrine_core::Platform;

use crate::error::StrategyError;

/// Shared cap on concurrent outbound attempts for one platform.
///
/// Clones share the same permits.
#[derive(Debug, Clone)]
pub struct PlatformLimiter {
    platform: Platform,
    permits: Arc<Semaphore>,
    capacity: usize,
}

impl PlatformLimiter {
    /// A limiter allowing `max_concurrent` attempts at once (at least one).
    #[must_use]
    pub fn new(platform: Platform, max_concurrent: usize) -> Self {
        let capacity = max_concurrent.max(1);
        Self {
            platform,
            permits: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    #[must_use]
    pub fn platform(&self) -> Platform {
        self.platform
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits not currently held.
    #[must_use]
    pub fn available(&self) -> usize {
        self.permits.available_permits()
    }

    /// Wait for a permit. The attempt may proceed while the permit is held.
    ///
    /// # Errors
    ///
    /// Returns [`StrategyError::LimiterClosed`] if the semaphore was closed.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, StrategyError> {
        if self.permits.available_permits() == 0 {
            tracing::debug!(
                platform = %self.platform,
                capacity = self.capacity,
                "outbound limit reached; waiting for a permit"
            );
        }
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| StrategyError::LimiterClosed {
                platform: self.platform,
            })
    }
}

/// `Retry-After` in whole seconds. HTTP-date values are not interpreted.
pub(crate) fn retry_after_secs(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<u64>().ok())
}
