use std::future::Future;
use std::num::NonZeroU32;
use std::time::Duration;

use color_eyre::eyre::{Result, eyre};
use governor::{
    Quota, RateLimiter, clock::DefaultClock, state::InMemoryState, state::direct::NotKeyed,
};
use tokio::sync::Semaphore;

use crate::ports::remote_playlist::RemoteError;

use super::SyncError;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Runs remote calls under one shared budget: at most `max_concurrent_calls`
/// in flight, at least `min_interval` between call starts, and a fixed
/// timeout per call. One instance per API credential.
pub struct RateLimitedExecutor {
    limiter: Option<DirectRateLimiter>,
    permits: Semaphore,
    call_timeout: Duration,
}

impl RateLimitedExecutor {
    pub fn new(
        max_concurrent_calls: usize,
        min_interval: Duration,
        call_timeout: Duration,
    ) -> Result<Self> {
        if max_concurrent_calls == 0 {
            return Err(eyre!("max_concurrent_calls must be greater than 0"));
        }

        // A zero interval means no pacing at all
        let limiter = Quota::with_period(min_interval)
            .map(|quota| RateLimiter::direct(quota.allow_burst(NonZeroU32::MIN)));

        log::debug!(
            "Remote executor: {} concurrent calls, {:?} between calls, {:?} timeout",
            max_concurrent_calls,
            min_interval,
            call_timeout
        );

        Ok(Self {
            limiter,
            permits: Semaphore::new(max_concurrent_calls),
            call_timeout,
        })
    }

    /// No pacing and effectively unbounded concurrency.
    pub fn unlimited(call_timeout: Duration) -> Self {
        Self {
            limiter: None,
            permits: Semaphore::new(Semaphore::MAX_PERMITS),
            call_timeout,
        }
    }

    /// Waits for a slot, then runs `call` under the call timeout. A timeout is
    /// reported as a transient failure and never retried here.
    pub async fn run<T, F>(&self, operation: &str, call: F) -> Result<T, SyncError>
    where
        F: Future<Output = Result<T, RemoteError>>,
    {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| SyncError::RemoteTransient("remote executor closed".to_string()))?;

        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }

        log::trace!("Remote call: {}", operation);
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result.map_err(SyncError::from),
            Err(_) => Err(SyncError::RemoteTransient(format!(
                "{} timed out after {:?}",
                operation, self.call_timeout
            ))),
        }
    }
}
