use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

use crate::connection::Connection;
use crate::error::{Error, Result};

/// Exponential backoff for supervising reconnects from outside the
/// connection.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::default()
        }
    }

    /// Delay slept after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = self.multiplier.powi(attempt.saturating_sub(1) as i32);
        let secs = self.initial_backoff.as_secs_f64() * factor;
        if !secs.is_finite() || secs >= self.max_backoff.as_secs_f64() {
            return self.max_backoff;
        }
        Duration::from_secs_f64(secs)
    }
}

/// Calls `connect` until it succeeds or the policy runs out, marking the
/// connection as reconnecting between attempts.
pub async fn connect_with_retry(connection: &Connection, policy: &RetryPolicy) -> Result<()> {
    if policy.max_attempts == 0 {
        return Err(Error::NoAttempts);
    }

    let mut attempt = 1;
    loop {
        match connection.connect().await {
            Ok(()) => return Ok(()),
            Err(err) if attempt >= policy.max_attempts => {
                warn!(
                    "Connect failed after {} attempts: {}",
                    policy.max_attempts, err
                );
                return Err(err);
            }
            Err(err) => {
                let delay = policy.backoff(attempt);
                warn!(
                    "Connect failed (attempt {}): {}, retrying in {:?}",
                    attempt, err, delay
                );
                connection.mark_reconnecting(attempt);
                sleep(delay).await;
                attempt += 1;
            }
        }
    }
}
