//! Bounded retry for backend calls, expressed as an explicit state machine.
//!
//! `Attempting(n)` runs the call; the outcome moves to `Succeeded`,
//! `PermanentFailure` or `Backoff`, and `Backoff` returns to
//! `Attempting(n + 1)` after an interruptible sleep.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{DEFAULT_BACKOFF_BASE_MS, DEFAULT_MAX_ATTEMPTS, MAX_BACKOFF_SECS};

use super::{BackendError, GenerationError};

/// Granularity at which a backoff sleep notices cancellation.
const CANCEL_POLL: Duration = Duration::from_millis(25);

/// Shared cancellation flag for an in-flight generation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    flag: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }

    /// Sleep for `duration` unless cancelled first. Returns `false` on cancellation.
    pub fn sleep(&self, duration: Duration) -> bool {
        let deadline = Instant::now() + duration;
        loop {
            if self.is_cancelled() {
                return false;
            }
            let now = Instant::now();
            if now >= deadline {
                return true;
            }
            std::thread::sleep(CANCEL_POLL.min(deadline - now));
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Configured attempts, including the first.
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff_base: Duration::from_millis(DEFAULT_BACKOFF_BASE_MS),
        }
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt` (1-based): base × 2^(attempt-1), capped.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.backoff_base
            .saturating_mul(factor)
            .min(Duration::from_secs(MAX_BACKOFF_SECS))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetryState {
    Attempting(u32),
    Backoff { attempt: u32, delay: Duration },
    Succeeded(String),
    PermanentFailure(GenerationError),
}

/// Transition bookkeeping for one generation.
#[derive(Debug)]
pub struct RetryMachine {
    policy: RetryPolicy,
    limit: u32,
    seen_empty: bool,
    attempts: u32,
}

impl RetryMachine {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            limit: policy.max_attempts.max(1),
            policy,
            seen_empty: false,
            attempts: 0,
        }
    }

    /// Attempts made so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Next state after attempt `attempt` produced `outcome`.
    ///
    /// The first empty response always earns one more attempt, even when
    /// it arrives on the last configured one.
    pub fn on_outcome(&mut self, attempt: u32, outcome: Result<String, BackendError>) -> RetryState {
        self.attempts = attempt;
        let error = match outcome {
            Ok(text) => return RetryState::Succeeded(text),
            Err(e) => e,
        };

        if !error.is_transient() {
            return self.fail(error);
        }

        if error == BackendError::EmptyResponse && !self.seen_empty {
            self.seen_empty = true;
            if attempt >= self.limit {
                self.limit = attempt + 1;
            }
        }

        if attempt >= self.limit {
            return self.fail(error);
        }

        tracing::warn!(
            attempt,
            max_attempts = self.limit,
            error = %error,
            "Backend call failed, retrying"
        );
        RetryState::Backoff {
            attempt,
            delay: self.policy.delay_for(attempt),
        }
    }

    fn fail(&self, last: BackendError) -> RetryState {
        RetryState::PermanentFailure(GenerationError::GenerationFailure {
            attempts: self.attempts,
            last,
        })
    }
}

/// Drive `call` through the retry machine until success, failure or cancellation.
///
/// Returns the successful text and the number of attempts it took.
pub fn run_with_retry<F>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    mut call: F,
) -> Result<(String, u32), GenerationError>
where
    F: FnMut(u32) -> Result<String, BackendError>,
{
    let mut machine = RetryMachine::new(policy);
    let mut state = RetryState::Attempting(1);

    loop {
        state = match state {
            RetryState::Attempting(n) => {
                if cancel.is_cancelled() {
                    return Err(GenerationError::Cancelled);
                }
                let outcome = call(n);
                machine.on_outcome(n, outcome)
            }
            RetryState::Backoff { attempt, delay } => {
                tracing::debug!(attempt, delay_ms = delay.as_millis() as u64, "Backing off");
                if !cancel.sleep(delay) {
                    return Err(GenerationError::Cancelled);
                }
                RetryState::Attempting(attempt + 1)
            }
            RetryState::Succeeded(text) => return Ok((text, machine.attempts())),
            RetryState::PermanentFailure(err) => return Err(err),
        };
    }
}
