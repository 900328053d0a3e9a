//! Convergence poller
//!
//! Repeats a probe until it matches or its attempt budget runs out,
//! sleeping a fixed interval between unsuccessful attempts. A mismatch is
//! retried; an execution error ends polling at once.

use std::future::Future;
use std::time::Duration;

use serde::Serialize;

use crate::common::{Error, Result};

/// Attempt budget for one polled check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub max_attempts: u32,
    pub interval: Duration,
}

impl PollPolicy {
    pub fn new(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            interval,
        }
    }

    /// Build the `ConvergenceTimeout` error for `subject` under this policy
    pub fn timeout_error(&self, subject: impl Into<String>) -> Error {
        Error::ConvergenceTimeout {
            subject: subject.into(),
            attempts: self.max_attempts,
            interval_ms: u64::try_from(self.interval.as_millis()).unwrap_or(u64::MAX),
        }
    }
}

/// How a poll ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PollOutcome {
    /// The condition held on attempt number `attempts`
    Converged { attempts: u32 },
    /// All `attempts` ran without a match
    TimedOut { attempts: u32 },
}

impl PollOutcome {
    pub fn is_converged(&self) -> bool {
        matches!(self, PollOutcome::Converged { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            PollOutcome::Converged { attempts } | PollOutcome::TimedOut { attempts } => *attempts,
        }
    }
}

/// Call `attempt` until it returns `Ok(true)` or the budget is spent
///
/// Sleeps `policy.interval` after every `Ok(false)` that still has an
/// attempt after it; there is no sleep after the last attempt. The first
/// `Err` is returned unchanged without another attempt.
pub async fn poll<F, Fut>(policy: PollPolicy, mut attempt: F) -> Result<PollOutcome>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    if policy.max_attempts == 0 {
        return Err(Error::Config(
            "poll requires at least one attempt".to_string(),
        ));
    }

    for n in 1..=policy.max_attempts {
        if attempt().await? {
            tracing::debug!(attempt = n, "Converged");
            return Ok(PollOutcome::Converged { attempts: n });
        }

        tracing::debug!(attempt = n, max = policy.max_attempts, "Not converged yet");
        if n < policy.max_attempts {
            tokio::time::sleep(policy.interval).await;
        }
    }

    Ok(PollOutcome::TimedOut {
        attempts: policy.max_attempts,
    })
}

/// Poll, turning a timeout into a fatal `ConvergenceTimeout` for `subject`
pub async fn poll_until<F, Fut>(policy: PollPolicy, subject: &str, attempt: F) -> Result<u32>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    match poll(policy, attempt).await? {
        PollOutcome::Converged { attempts } => Ok(attempts),
        PollOutcome::TimedOut { .. } => {
            tracing::warn!(
                subject,
                attempts = policy.max_attempts,
                "Convergence timed out"
            );
            Err(policy.timeout_error(subject))
        }
    }
}
