//! Retry decorator for unit handlers.

use super::RetryPolicy;
use crate::errors::UnitError;
use crate::record::RecordView;
use crate::units::{UnitContext, UnitHandler, UnitResult};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// Wraps `handler` so failures are retried according to `policy`.
///
/// This is a pure transformation applied once, when the registry is built.
#[must_use]
pub fn with_retry(
    unit: impl Into<String>,
    handler: Arc<dyn UnitHandler>,
    policy: RetryPolicy,
) -> Arc<dyn UnitHandler> {
    Arc::new(RetryHandler::new(unit, handler, policy))
}

/// A handler that re-invokes its inner handler on failure.
///
/// At most `max_retries + 1` invocations happen. Once the attempts run out,
/// the predicate rejects a failure, or the call is cancelled, the last
/// failure is returned wrapped in [`UnitError::RetriesExhausted`].
pub struct RetryHandler {
    unit: String,
    inner: Arc<dyn UnitHandler>,
    policy: RetryPolicy,
}

impl RetryHandler {
    /// Creates a new retry handler.
    #[must_use]
    pub fn new(unit: impl Into<String>, inner: Arc<dyn UnitHandler>, policy: RetryPolicy) -> Self {
        Self {
            unit: unit.into(),
            inner,
            policy,
        }
    }

    /// Returns the policy in use.
    #[must_use]
    pub const fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

impl std::fmt::Debug for RetryHandler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryHandler")
            .field("unit", &self.unit)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl UnitHandler for RetryHandler {
    async fn call(&self, ctx: UnitContext, record: RecordView) -> UnitResult {
        let mut attempts = 1;
        let mut outcome = self.inner.call(ctx.clone(), record.clone()).await;

        loop {
            let err = match outcome {
                Ok(value) => return Ok(value),
                Err(err) => err,
            };

            let retries_done = attempts - 1;
            if retries_done >= self.policy.max_retries
                || !self.policy.should_retry(&err)
                || ctx.is_cancelled()
            {
                return Err(UnitError::exhausted(&self.unit, attempts, err));
            }

            let delay = self
                .policy
                .delay_for(u32::try_from(retries_done).unwrap_or(u32::MAX));
            debug!(
                unit = %self.unit,
                attempt = attempts,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %err,
                "Retrying unit after failure"
            );
            tokio::time::sleep(delay).await;

            attempts += 1;
            outcome = self
                .inner
                .call(ctx.clone().with_attempt(attempts), record.clone())
                .await;
        }
    }
}
