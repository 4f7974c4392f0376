//! Attempt sequencing with capped exponential backoff.
//!
//! [`RetryPolicy`] is plain data and is shared read-only by every worker.
//! [`run`] drives an operation until it succeeds, reports a terminal failure,
//! or exhausts the policy. The operation classifies its own failures through
//! [`Failure`], so "what failed" stays apart from "how long to wait".

use std::future::Future;
use std::time::Duration;

use tokio::time::sleep;

/// Attempt bound and backoff shape for one retry layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total tries, including the first one.
    pub max_attempts: u32,
    /// Sleep after the first failed attempt.
    pub initial_delay: Duration,
    /// Upper bound for any single sleep.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_max_retries(15, Duration::from_secs(2), Duration::from_secs(10))
    }
}

impl RetryPolicy {
    /// Builds a policy allowing `max_retries` retries after the first attempt.
    pub fn from_max_retries(
        max_retries: u32,
        initial_delay: Duration,
        max_delay: Duration,
    ) -> Self {
        Self {
            max_attempts: max_retries.saturating_add(1),
            initial_delay,
            max_delay,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_attempts.saturating_sub(1)
    }

    /// Whether another attempt may follow the 1-based attempt `attempt`.
    pub fn should_retry(&self, attempt: u32) -> bool {
        attempt < self.max_attempts
    }

    /// The delay following `prev`: doubled, capped at `max_delay`.
    pub fn next_delay(&self, prev: Duration) -> Duration {
        prev.saturating_mul(2).min(self.max_delay)
    }

    /// Sleep taken after the 1-based attempt `attempt` fails.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let mut delay = self.initial_delay.min(self.max_delay);
        for _ in 1..attempt {
            if delay == self.max_delay {
                break;
            }
            delay = self.next_delay(delay);
        }
        delay
    }
}

/// How an operation failed, as judged by the operation itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure<E> {
    /// Worth another attempt if the policy allows one.
    Retryable(E),
    /// Retrying cannot help; stop now.
    Terminal(E),
}

/// The classification of a [`Failure`], without its error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Retryable,
    Terminal,
}

impl<E> Failure<E> {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Retryable(_) => FailureKind::Retryable,
            Failure::Terminal(_) => FailureKind::Terminal,
        }
    }
}

/// One try within a retry loop. Owned by the caller driving the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attempt {
    /// 1-based attempt number.
    pub number: u32,
    /// Sleep taken before the next attempt if this one fails.
    pub delay: Duration,
    /// `None` while the attempt is running or when it succeeded.
    pub failure: Option<FailureKind>,
}

/// Final state of a retry loop.
#[derive(Debug)]
pub enum RetryOutcome<T, E> {
    Succeeded { value: T, attempts: u32 },
    /// Every allowed attempt failed with a retryable error; `error` is the last one.
    Exhausted { error: E, attempts: u32 },
    /// A terminal failure stopped the loop early.
    Aborted { error: E, attempts: u32 },
}

impl<T, E> RetryOutcome<T, E> {
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Succeeded { attempts, .. }
            | Self::Exhausted { attempts, .. }
            | Self::Aborted { attempts, .. } => *attempts,
        }
    }
}

/// Runs `op` under `policy`.
///
/// Attempts are strictly sequential. `on_retry` fires once per retry, after a
/// retryable failure and before the sleep, with the failed attempt (whose
/// `delay` is the sleep about to happen) and its error.
pub async fn run<T, E, Op, Fut, Hook>(
    policy: &RetryPolicy,
    mut op: Op,
    mut on_retry: Hook,
) -> RetryOutcome<T, E>
where
    Op: FnMut(Attempt) -> Fut,
    Fut: Future<Output = Result<T, Failure<E>>>,
    Hook: FnMut(&Attempt, &E),
{
    let mut number = 1;
    loop {
        let mut attempt = Attempt {
            number,
            delay: policy.delay_for(number),
            failure: None,
        };
        let failure = match op(attempt).await {
            Ok(value) => {
                return RetryOutcome::Succeeded {
                    value,
                    attempts: number,
                };
            }
            Err(failure) => failure,
        };
        attempt.failure = Some(failure.kind());

        match failure {
            Failure::Terminal(error) => {
                return RetryOutcome::Aborted {
                    error,
                    attempts: number,
                };
            }
            Failure::Retryable(error) => {
                if !policy.should_retry(number) {
                    return RetryOutcome::Exhausted {
                        error,
                        attempts: number,
                    };
                }
                on_retry(&attempt, &error);
                sleep(attempt.delay).await;
                number += 1;
            }
        }
    }
}
