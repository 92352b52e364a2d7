use governor::{
    Quota, RateLimiter as GovernorRateLimiter,
    clock::{Clock, DefaultClock},
    middleware::NoOpMiddleware,
    state::{InMemoryState, NotKeyed},
};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

type DirectLimiter = GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock, NoOpMiddleware>;

/// Client-side request throttle shared by every clone of a pipeline.
///
/// Only spaces requests out; it never rejects one that the caller is willing
/// to wait for. Throttling reported by the service is a separate concern
/// surfaced as [`ClientError::Service`](super::ClientError::Service) with status 429.
#[derive(Clone)]
pub struct RateLimiter {
    inner: Arc<DirectLimiter>,
    requests_per_second: u32,
    burst: u32,
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .field("burst", &self.burst)
            .finish()
    }
}

impl RateLimiter {
    /// `requests_per_second` with a burst of the same size.
    pub fn new(requests_per_second: u32) -> Result<Self, RateLimitError> {
        Self::with_burst(requests_per_second, requests_per_second)
    }

    pub fn with_burst(requests_per_second: u32, burst: u32) -> Result<Self, RateLimitError> {
        let rate = non_zero("requests_per_second", requests_per_second)?;
        let burst_size = non_zero("burst", burst)?;

        Ok(Self {
            inner: Arc::new(GovernorRateLimiter::direct(
                Quota::per_second(rate).allow_burst(burst_size),
            )),
            requests_per_second,
            burst,
        })
    }

    /// Takes a slot if one is free right now.
    pub fn try_acquire(&self) -> Result<(), RateLimitError> {
        self.inner.check().map_err(|not_until| RateLimitError::TooManyRequests {
            retry_after: not_until.wait_time_from(DefaultClock::default().now()),
        })
    }

    /// Waits for a slot.
    pub async fn acquire(&self) {
        if let Err(RateLimitError::TooManyRequests { retry_after }) = self.try_acquire() {
            log::debug!("Client-side throttle: waiting {retry_after:?} before next request");
            self.inner.until_ready().await;
        }
    }

    pub fn requests_per_second(&self) -> u32 {
        self.requests_per_second
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }
}

fn non_zero(name: &str, value: u32) -> Result<NonZeroU32, RateLimitError> {
    NonZeroU32::new(value).ok_or_else(|| RateLimitError::InvalidQuota {
        reason: format!("{name} must be greater than zero"),
    })
}

#[derive(Debug, thiserror::Error)]
pub enum RateLimitError {
    #[error("Client-side rate limit reached, next slot in {retry_after:?}")]
    TooManyRequests { retry_after: Duration },
    #[error("Invalid rate limit quota: {reason}")]
    InvalidQuota { reason: String },
}
