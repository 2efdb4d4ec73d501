//! Blocking retry primitive for entity spawns
//!
//! 默认策略与后端约定一致：无上限、无退避，一直等到仿真就绪。
//! 测试和 CLI 可以注入退避、次数上限或截止时间。

use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;
use tracing::trace;

/// Delay between two attempts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Retry immediately (only yields to the runtime)
    #[default]
    None,
    /// Constant delay
    Fixed(Duration),
    /// Doubling delay, capped at `max`
    Exponential { initial: Duration, max: Duration },
}

impl Backoff {
    /// Delay after the given failed attempt (1-based)
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            Self::None => Duration::ZERO,
            Self::Fixed(delay) => delay,
            Self::Exponential { initial, max } => {
                let shift = attempt.saturating_sub(1).min(16);
                initial.saturating_mul(1 << shift).min(max)
            }
        }
    }
}

/// Retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RetryPolicy {
    pub backoff: Backoff,
    /// `None` = unbounded
    pub max_attempts: Option<u32>,
    /// `None` = wait forever
    pub deadline: Option<Duration>,
}

impl RetryPolicy {
    /// Retry until the backend accepts
    pub fn unbounded() -> Self {
        Self::default()
    }

    /// Give up after `max_attempts` attempts
    pub fn bounded(max_attempts: u32) -> Self {
        Self {
            max_attempts: Some(max_attempts.max(1)),
            ..Self::default()
        }
    }

    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn is_unbounded(&self) -> bool {
        self.max_attempts.is_none() && self.deadline.is_none()
    }

    /// Run `op` until it reports `Ready`, fails hard, or the policy gives up.
    ///
    /// `op` receives the 1-based attempt number. `NotYet` is retried,
    /// `Err` is returned immediately as `RetryError::Failed`.
    pub async fn run<T, E, F, Fut>(&self, mut op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<Attempt<T>, E>>,
    {
        let started = Instant::now();
        let mut attempt: u32 = 0;

        loop {
            attempt = attempt.saturating_add(1);

            let reason = match op(attempt).await.map_err(RetryError::Failed)? {
                Attempt::Ready(value) => return Ok(value),
                Attempt::NotYet(reason) => reason,
            };

            let out_of_attempts = self.max_attempts.is_some_and(|max| attempt >= max);
            let out_of_time = self
                .deadline
                .is_some_and(|deadline| started.elapsed() >= deadline);
            if out_of_attempts || out_of_time {
                return Err(RetryError::Exhausted {
                    attempts: attempt,
                    last_reason: reason,
                });
            }

            let delay = self.backoff.delay(attempt);
            trace!(attempt, delay_ms = delay.as_millis() as u64, "retrying");
            if delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(delay).await;
            }
        }
    }
}

/// Outcome of one attempt
#[derive(Debug, Clone, PartialEq)]
pub enum Attempt<T> {
    Ready(T),
    /// Transient refusal, with the reason
    NotYet(String),
}

/// Why the retry loop stopped without a value
#[derive(Debug, Clone, PartialEq)]
pub enum RetryError<E> {
    /// The operation itself failed
    Failed(E),
    /// Bounded policy ran out
    Exhausted { attempts: u32, last_reason: String },
}
