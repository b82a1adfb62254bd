//! Client-side reconnection backoff.
//!
//! The counterpart of the server's grace window: a dropped client keeps
//! retrying its reconnect with exponentially growing, capped delays
//! until it either succeeds or exhausts its attempt budget. The schedule
//! lives in [`BackoffPolicy`]; [`ReconnectBackoff`] tracks one
//! connection's progress through it; [`reconnect_with_backoff`] drives
//! an arbitrary async reconnect operation to completion or abandonment.

use std::future::Future;
use std::time::Duration;

/// Exponential backoff schedule for reconnection attempts.
#[derive(Debug, Clone)]
pub struct BackoffPolicy {
    /// Delay before the first retry.
    pub initial: Duration,
    /// Multiplier applied to the delay after each failure.
    pub factor: u32,
    /// Upper bound on any single delay.
    pub cap: Duration,
    /// Total attempts before the connection is abandoned.
    pub max_attempts: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: Duration::from_millis(500),
            factor: 2,
            cap: Duration::from_secs(30),
            max_attempts: 8,
        }
    }
}

/// Raised when every attempt in the policy's budget has failed.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("reconnection abandoned after {attempts} attempts")]
pub struct ReconnectAbandoned {
    pub attempts: u32,
}

/// Tracks one connection's position in a backoff schedule.
#[derive(Debug, Clone)]
pub struct ReconnectBackoff {
    policy: BackoffPolicy,
    attempt: u32,
}

impl ReconnectBackoff {
    pub fn new(policy: BackoffPolicy) -> Self {
        Self { policy, attempt: 0 }
    }

    /// Records a failed attempt and returns the delay before the next
    /// one, or `None` once the attempt budget is spent.
    pub fn next_delay(&mut self) -> Option<Duration> {
        self.attempt += 1;
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        let exponent = self.attempt.saturating_sub(1);
        let delay = self
            .policy
            .initial
            .saturating_mul(self.policy.factor.saturating_pow(exponent));
        Some(delay.min(self.policy.cap))
    }

    /// Number of attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempt
    }

    /// Resets the schedule after a successful connection.
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

/// Runs `op` until it succeeds or the policy's attempt budget is spent,
/// sleeping the scheduled delay between failures.
///
/// Errors from individual attempts are logged and swallowed; only
/// exhaustion surfaces, as [`ReconnectAbandoned`].
pub async fn reconnect_with_backoff<T, E, F, Fut>(
    policy: BackoffPolicy,
    mut op: F,
) -> Result<T, ReconnectAbandoned>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut backoff = ReconnectBackoff::new(policy);
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) => match backoff.next_delay() {
                Some(delay) => {
                    tracing::debug!(
                        attempt = backoff.attempts(),
                        delay_ms = delay.as_millis() as u64,
                        %err,
                        "reconnect attempt failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::warn!(
                        attempts = backoff.attempts(),
                        %err,
                        "reconnect abandoned"
                    );
                    return Err(ReconnectAbandoned {
                        attempts: backoff.attempts(),
                    });
                }
            },
        }
    }
}
