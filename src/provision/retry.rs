//! Bounded retry with exponential backoff and jitter.
//!
//! The Azure directory is eventually consistent: an app registration created
//! a moment ago may not yet be visible to the call that creates its service
//! principal. The policy here retries such operations with growing, jittered
//! delays under both an attempt budget and an overall deadline.

use std::thread;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::warn;

use crate::error::AzFederateError;

/// Backoff policy for operations racing directory replication.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Maximum number of attempts (at least 1).
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Growth factor applied to the delay after each failed attempt.
    pub multiplier: f64,
    /// Upper bound on any single delay.
    pub max_delay: Duration,
    /// Overall budget; no new attempt starts once this much time has passed.
    pub deadline: Duration,
    /// Randomize each delay uniformly in `[delay/2, delay]`.
    pub jitter: bool,
}

impl RetryPolicy {
    /// A policy that never sleeps and never retries. Used where a failure
    /// should surface immediately (and by tests).
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            multiplier: 1.0,
            max_delay: Duration::ZERO,
            deadline: Duration::ZERO,
            jitter: false,
        }
    }

    /// Runs `attempt` until it succeeds, retrying on any error.
    ///
    /// Gives up after `max_attempts` attempts or once the deadline has
    /// passed, whichever comes first, and returns a
    /// [`AzFederateError::RetryExhausted`] carrying the final error.
    pub fn run<T, F>(&self, operation: &str, mut attempt: F) -> Result<T, AzFederateError>
    where
        F: FnMut() -> anyhow::Result<T>,
    {
        let started = Instant::now();
        let mut delay = self.initial_delay;
        let mut attempts = 0;

        loop {
            attempts += 1;
            let error = match attempt() {
                Ok(value) => return Ok(value),
                Err(e) => e,
            };

            let out_of_attempts = attempts >= self.max_attempts;
            let out_of_time = started.elapsed() >= self.deadline;
            if out_of_attempts || out_of_time {
                if out_of_time && !out_of_attempts {
                    warn!("{}: deadline of {:?} reached", operation, self.deadline);
                }
                return Err(AzFederateError::RetryExhausted {
                    operation: operation.to_string(),
                    attempts,
                    last_error: format!("{:#}", error),
                });
            }

            let sleep = self.jittered(delay);
            warn!(
                "{} failed (attempt {}/{}), retrying in {:?}: {:#}",
                operation, attempts, self.max_attempts, sleep, error
            );
            if !sleep.is_zero() {
                thread::sleep(sleep);
            }

            delay = self.next_delay(delay);
        }
    }

    fn next_delay(&self, current: Duration) -> Duration {
        let grown = current.mul_f64(self.multiplier.max(1.0));
        grown.min(self.max_delay)
    }

    fn jittered(&self, delay: Duration) -> Duration {
        if !self.jitter || delay.is_zero() {
            return delay;
        }
        let nanos = delay.as_nanos() as u64;
        let jittered = rand::rng().random_range(nanos / 2..=nanos);
        Duration::from_nanos(jittered)
    }
}
