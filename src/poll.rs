//! Generic bounded-retry polling primitive
//!
//! One loop shared by the relay watcher, confirmation tracking, and
//! post-condition verification, so the interval/backoff/deadline policy is
//! defined and tested once instead of copy-pasted per call site.
//!
//! Semantics:
//! - A probe that reports "not yet" is expected steady state, not an error;
//!   polling continues at the base interval.
//! - Transient (transport) failures are retried with exponential backoff up
//!   to `retry_limit` consecutive failures; a successful probe resets the
//!   count.
//! - Non-transient failures (reverts) abort immediately.
//! - The deadline is checked before every probe and sleeps are clamped to
//!   it, so the loop times out at/after the deadline and never sleeps past
//!   it.

use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;

use crate::error::{ReadError, RelayError};

/// Interval/backoff/deadline policy for one polling operation
#[derive(Debug, Clone)]
pub struct PollPolicy {
    /// Base interval between probes
    pub interval: Duration,
    /// Ceiling for backed-off intervals
    pub max_interval: Duration,
    /// Overall deadline for the operation
    pub deadline: Duration,
    /// Maximum consecutive transient failures before giving up
    pub retry_limit: u32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            deadline: Duration::from_secs(120),
            retry_limit: 3,
        }
    }
}

impl PollPolicy {
    /// Same policy with a different deadline
    pub fn with_deadline(&self, deadline: Duration) -> Self {
        Self {
            deadline,
            ..self.clone()
        }
    }

    /// Backoff duration for a given consecutive-failure attempt (0-indexed),
    /// doubling from the base interval and capped at `max_interval`.
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let exp = attempt.min(16);
        let backed_off = self.interval.saturating_mul(1u32 << exp);
        backed_off.min(self.max_interval)
    }
}

/// Outcome of one probe
pub enum Probe<T> {
    /// The awaited condition holds; stop polling.
    Ready(T),
    /// Probe succeeded but the condition does not hold yet.
    NotYet,
}

/// Successful polling result
#[derive(Debug)]
pub struct PollOutcome<T> {
    pub value: T,
    /// Number of probes issued, including the successful one
    pub polls: u32,
    pub waited: Duration,
}

/// Failure of a polling operation
#[derive(Debug, thiserror::Error)]
pub enum PollError {
    #[error("deadline elapsed after {}ms ({polls} polls)", waited.as_millis())]
    Timeout { waited: Duration, polls: u32 },

    #[error(transparent)]
    Read(ReadError),
}

impl PollError {
    /// Map onto the generic error taxonomy. Call sites that need a more
    /// specific timeout (the relay watcher) match on `Timeout` themselves.
    pub fn into_relay_error(self) -> RelayError {
        match self {
            PollError::Timeout { waited, polls } => RelayError::Timeout {
                waited_ms: waited.as_millis() as u64,
                polls,
            },
            PollError::Read(e) => RelayError::Read(e),
        }
    }
}

/// Poll `probe` until it reports ready, the deadline elapses, or the
/// transient-failure budget is exhausted.
///
/// The first probe happens immediately: a condition that already holds is
/// observed without any sleep.
pub async fn poll_until<T, F, Fut>(
    policy: &PollPolicy,
    mut probe: F,
) -> Result<PollOutcome<T>, PollError>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<Probe<T>, ReadError>>,
{
    let start = Instant::now();
    let mut polls: u32 = 0;
    let mut consecutive_failures: u32 = 0;

    loop {
        if start.elapsed() >= policy.deadline {
            return Err(PollError::Timeout {
                waited: start.elapsed(),
                polls,
            });
        }

        polls += 1;
        match probe(polls).await {
            Ok(Probe::Ready(value)) => {
                return Ok(PollOutcome {
                    value,
                    polls,
                    waited: start.elapsed(),
                });
            }
            Ok(Probe::NotYet) => {
                consecutive_failures = 0;
            }
            Err(e) if e.is_transient() => {
                consecutive_failures += 1;
                if consecutive_failures > policy.retry_limit {
                    return Err(PollError::Read(e));
                }
                tracing::warn!(
                    attempt = consecutive_failures,
                    retry_limit = policy.retry_limit,
                    error = %e,
                    "Transient read failure, will retry with backoff"
                );
            }
            Err(e) => return Err(PollError::Read(e)),
        }

        let next = if consecutive_failures > 0 {
            policy.backoff_for_attempt(consecutive_failures - 1)
        } else {
            policy.interval
        };
        let remaining = policy.deadline.saturating_sub(start.elapsed());
        tokio::time::sleep(next.min(remaining)).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(interval_ms: u64, deadline_ms: u64) -> PollPolicy {
        PollPolicy {
            interval: Duration::from_millis(interval_ms),
            max_interval: Duration::from_millis(interval_ms),
            deadline: Duration::from_millis(deadline_ms),
            retry_limit: 3,
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = PollPolicy {
            interval: Duration::from_millis(500),
            max_interval: Duration::from_secs(5),
            deadline: Duration::from_secs(120),
            retry_limit: 3,
        };
        assert_eq!(policy.backoff_for_attempt(0), Duration::from_millis(500));
        assert_eq!(policy.backoff_for_attempt(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_for_attempt(2), Duration::from_secs(2));
        assert_eq!(policy.backoff_for_attempt(3), Duration::from_secs(4));
        assert_eq!(policy.backoff_for_attempt(4), Duration::from_secs(5)); // capped
        assert_eq!(policy.backoff_for_attempt(20), Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ready_condition_returns_without_sleeping() {
        let start = Instant::now();
        let outcome = poll_until(&policy(50, 500), |_| async { Ok(Probe::Ready(7u32)) })
            .await
            .unwrap();
        assert_eq!(outcome.value, 7);
        assert_eq!(outcome.polls, 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_at_deadline_never_before() {
        let start = Instant::now();
        let result: Result<PollOutcome<()>, _> =
            poll_until(&policy(50, 500), |_| async { Ok(Probe::NotYet) }).await;
        match result {
            Err(PollError::Timeout { polls, waited }) => {
                // 10 probes at 0,50,...,450ms; the deadline trips at 500ms
                assert_eq!(polls, 10);
                assert!(waited >= Duration::from_millis(500));
            }
            other => panic!("expected timeout, got {:?}", other.map(|o| o.polls)),
        }
        assert!(start.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_bounded() {
        let result: Result<PollOutcome<()>, _> = poll_until(&policy(50, 60_000), |_| async {
            Err(ReadError::Transport("connection refused".into()))
        })
        .await;
        match result {
            Err(PollError::Read(ReadError::Transport(_))) => {}
            other => panic!("expected transport error, got {:?}", other.map(|o| o.polls)),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_revert_aborts_immediately() {
        let start = Instant::now();
        let result: Result<PollOutcome<()>, _> = poll_until(&policy(50, 60_000), |_| async {
            Err(ReadError::Revert("bad call".into()))
        })
        .await;
        assert!(matches!(result, Err(PollError::Read(ReadError::Revert(_)))));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_success_resets_failure_budget() {
        // Alternate failure/not-yet probes; with retry_limit 3 the loop must
        // survive more than 3 total failures as long as they never run
        // consecutively past the limit.
        let outcome = poll_until(&policy(50, 60_000), |n| async move {
            match n {
                1 | 3 | 5 | 7 => Err(ReadError::Transport("flaky".into())),
                8 => Ok(Probe::Ready(n)),
                _ => Ok(Probe::NotYet),
            }
        })
        .await
        .unwrap();
        assert_eq!(outcome.value, 8);
        assert_eq!(outcome.polls, 8);
    }
}
