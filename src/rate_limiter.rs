//! Outbound request rate limiting.
//!
//! A thin wrapper around a `governor` direct limiter. The stream client calls
//! [`RateLimiter::wait`] before every request when a limit is configured.

use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};

use crate::config::RateLimiterConfig;
use crate::error::ConfigError;

/// Token-bucket gate bounding the outbound request rate.
///
/// Cloning is cheap and clones share the same bucket.
#[derive(Clone)]
pub struct RateLimiter {
    limiter: Arc<GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>>,
}

impl RateLimiter {
    /// Build a limiter allowing `max_requests` per `period_seconds`, with
    /// bursts of up to `burst_size`.
    pub fn new(config: &RateLimiterConfig) -> Result<Self, ConfigError> {
        let max_requests = NonZeroU32::new(config.max_requests).ok_or_else(|| {
            ConfigError::InvalidRateLimit("max_requests must be greater than zero".to_string())
        })?;
        let burst_size = NonZeroU32::new(config.burst_size).ok_or_else(|| {
            ConfigError::InvalidRateLimit("burst_size must be greater than zero".to_string())
        })?;
        if config.period_seconds == 0 {
            return Err(ConfigError::InvalidRateLimit(
                "period_seconds must be greater than zero".to_string(),
            ));
        }

        let replenish = Duration::from_secs(config.period_seconds) / max_requests.get();
        let quota = Quota::with_period(replenish)
            .ok_or_else(|| ConfigError::InvalidRateLimit("replenish period is zero".to_string()))?
            .allow_burst(burst_size);

        Ok(Self {
            limiter: Arc::new(GovernorRateLimiter::direct(quota)),
        })
    }

    /// Wait until the limiter lets a request through.
    pub async fn wait(&self) {
        self.limiter.until_ready().await;
    }

    /// Take a permit if one is available right now.
    #[must_use]
    pub fn check(&self) -> bool {
        self.limiter.check().is_ok()
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter").finish_non_exhaustive()
    }
}
