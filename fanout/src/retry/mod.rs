//! Retry policies, backoff calculation and the retry decorator.

mod handler;
mod policy;

pub use handler::{with_retry, RetryHandler};
pub use policy::{backoff_delay, base_delay, RetryPolicy, RetryPredicate, DEFAULT_RETRY_POLICY};
