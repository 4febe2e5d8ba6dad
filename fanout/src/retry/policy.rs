//! Retry policy and jittered exponential backoff.
//!
//! The delay before retry `n` (0-based) is
//! `min(initial_delay * 2^n, max_delay) * (1 + U * jitter_factor)` with `U`
//! drawn uniformly from `[-1, 1]`. The base is derived from the attempt
//! number alone, so jitter never feeds back into later delays.

use crate::errors::UnitError;
use rand::Rng;
use std::sync::Arc;
use std::time::Duration;

/// Decides whether a failure is worth retrying.
pub type RetryPredicate = Arc<dyn Fn(&UnitError) -> bool + Send + Sync>;

/// Exponents above this already exceed any sane cap.
const MAX_EXPONENT: u32 = 62;

/// Configuration for retrying a unit.
///
/// Values are immutable in practice: the `with_*` methods return new
/// policies and [`RetryPolicy::DEFAULT`] is a constant.
#[derive(Clone)]
pub struct RetryPolicy {
    /// Maximum additional attempts after the first one.
    pub max_retries: usize,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Cap on the un-jittered delay.
    pub max_delay: Duration,
    /// Jitter factor in `[0, 1]`.
    pub jitter_factor: f64,
    /// Retry predicate; `None` retries every failure.
    should_retry: Option<RetryPredicate>,
}

/// The process-wide default retry policy.
pub const DEFAULT_RETRY_POLICY: RetryPolicy = RetryPolicy::DEFAULT;

impl RetryPolicy {
    /// 5 retries, 100ms initial delay, 3s cap, 20% jitter, retry everything.
    pub const DEFAULT: Self = Self::new(
        5,
        Duration::from_millis(100),
        Duration::from_secs(3),
        0.2,
    );

    /// Creates a policy that retries every failure.
    #[must_use]
    pub const fn new(
        max_retries: usize,
        initial_delay: Duration,
        max_delay: Duration,
        jitter_factor: f64,
    ) -> Self {
        Self {
            max_retries,
            initial_delay,
            max_delay,
            jitter_factor,
            should_retry: None,
        }
    }

    /// Sets the maximum number of retries.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Sets the initial delay.
    #[must_use]
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the delay cap.
    #[must_use]
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the jitter factor, clamped to `[0, 1]`.
    #[must_use]
    pub fn with_jitter_factor(mut self, factor: f64) -> Self {
        self.jitter_factor = if factor.is_nan() { 0.0 } else { factor.clamp(0.0, 1.0) };
        self
    }

    /// Only retries failures for which `predicate` returns true.
    ///
    /// A rejected failure is reported immediately, wrapped in the same
    /// retry summary as an exhausted one.
    #[must_use]
    pub fn retry_if<P>(mut self, predicate: P) -> Self
    where
        P: Fn(&UnitError) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Some(Arc::new(predicate));
        self
    }

    /// Returns true if `err` may be retried.
    #[must_use]
    pub fn should_retry(&self, err: &UnitError) -> bool {
        self.should_retry.as_ref().map_or(true, |p| p(err))
    }

    /// Total handler invocations this policy allows.
    #[must_use]
    pub const fn max_attempts(&self) -> usize {
        self.max_retries.saturating_add(1)
    }

    /// Computes the jittered delay before retry `attempt` (0-based).
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        backoff_delay(attempt, self)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl std::fmt::Debug for RetryPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_retries", &self.max_retries)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("jitter_factor", &self.jitter_factor)
            .field("has_predicate", &self.should_retry.is_some())
            .finish()
    }
}

/// Computes the un-jittered delay: `min(initial_delay * 2^attempt, max_delay)`.
#[must_use]
pub fn base_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let exponent = attempt.min(MAX_EXPONENT);
    let scaled = policy.initial_delay.as_secs_f64() * f64::from(2u32).powi(exponent as i32);
    secs_to_duration(scaled.min(policy.max_delay.as_secs_f64()))
}

/// Computes the jittered delay before retry `attempt` (0-based).
///
/// The result is never negative and never exceeds
/// `max_delay * (1 + jitter_factor)`.
#[must_use]
pub fn backoff_delay(attempt: u32, policy: &RetryPolicy) -> Duration {
    let base = base_delay(attempt, policy).as_secs_f64();
    let jitter = if policy.jitter_factor.is_nan() {
        0.0
    } else {
        policy.jitter_factor.clamp(0.0, 1.0)
    };
    if jitter == 0.0 || base == 0.0 {
        return secs_to_duration(base);
    }

    let u: f64 = rand::thread_rng().gen_range(-1.0..=1.0);
    secs_to_duration(base * u.mul_add(jitter, 1.0))
}

/// Converts seconds to a `Duration`, saturating at both ends.
fn secs_to_duration(secs: f64) -> Duration {
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
}
