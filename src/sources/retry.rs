//! Bounded retry with per-attempt timeouts

use std::time::Duration;
use tracing::{debug, warn};

use crate::config::UpstreamConfig;
use crate::source::SessionSource;
use crate::types::{SessionBundle, SessionKey};
use crate::{Result, TelemetryError};

/// Retry policy for upstream fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts including the first
    pub max_attempts: u32,
    /// Deadline for a single attempt
    pub timeout: Duration,
    /// Delay before the second attempt; doubles afterwards
    pub backoff_base: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &UpstreamConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            timeout: config.timeout(),
            backoff_base: config.backoff_base(),
        }
    }

    /// Delay after the given failed attempt (1-based): base, 2*base, 4*base, ...
    pub fn backoff(&self, attempt: u32) -> Duration {
        self.backoff_base * (1u32 << attempt.saturating_sub(1).min(5))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&UpstreamConfig::default())
    }
}

/// Source decorator adding timeouts and bounded retry
///
/// Only retryable failures (transport errors, timeouts) are retried. Not-found
/// and unparseable responses return immediately. When attempts run out the
/// last error propagates unchanged.
pub struct RetryingSource<S> {
    inner: S,
    policy: RetryPolicy,
}

impl<S: SessionSource> RetryingSource<S> {
    pub fn new(inner: S, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }
}

#[async_trait::async_trait]
impl<S: SessionSource> SessionSource for RetryingSource<S> {
    async fn fetch_session(&self, key: &SessionKey) -> Result<SessionBundle> {
        let mut attempt = 0u32;
        loop {
            attempt += 1;

            let result =
                match tokio::time::timeout(self.policy.timeout, self.inner.fetch_session(key)).await
                {
                    Ok(result) => result,
                    Err(_) => Err(TelemetryError::Timeout { duration: self.policy.timeout }),
                };

            let error = match result {
                Ok(bundle) => {
                    if attempt > 1 {
                        debug!(session = %key, attempt, "Upstream fetch recovered");
                    }
                    return Ok(bundle);
                }
                Err(e) => e,
            };

            if !error.is_retryable() || attempt >= self.policy.max_attempts {
                if error.is_retryable() {
                    warn!(
                        session = %key,
                        source = self.inner.name(),
                        attempts = attempt,
                        "Upstream fetch failed, retries exhausted: {}",
                        error
                    );
                }
                return Err(error);
            }

            let backoff = self.policy.backoff(attempt);
            warn!(
                session = %key,
                attempt,
                max_attempts = self.policy.max_attempts,
                backoff_ms = backoff.as_millis() as u64,
                "Upstream fetch failed: {}",
                error
            );
            tokio::time::sleep(backoff).await;
        }
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
