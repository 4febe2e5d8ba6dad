//! Per-invocation context handed to unit handlers.

use crate::cancellation::CancellationToken;
use std::sync::Arc;

/// Context for one handler invocation.
///
/// Cheap to clone: every field is shared.
#[derive(Debug, Clone)]
pub struct UnitContext {
    unit: Arc<str>,
    run_id: Arc<str>,
    attempt: usize,
    cancel: Arc<CancellationToken>,
}

impl UnitContext {
    /// Creates a context for the first attempt of `unit`.
    #[must_use]
    pub fn new(unit: impl Into<Arc<str>>, run_id: Arc<str>, cancel: Arc<CancellationToken>) -> Self {
        Self {
            unit: unit.into(),
            run_id,
            attempt: 1,
            cancel,
        }
    }

    /// Returns a copy of this context for the given 1-based attempt.
    #[must_use]
    pub fn with_attempt(mut self, attempt: usize) -> Self {
        self.attempt = attempt;
        self
    }

    /// Returns the unit name.
    #[must_use]
    pub fn unit_name(&self) -> &str {
        &self.unit
    }

    /// Returns the run id of the call.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Returns the 1-based attempt number.
    #[must_use]
    pub const fn attempt(&self) -> usize {
        self.attempt
    }

    /// Returns the call's cancellation token.
    #[must_use]
    pub fn cancel_token(&self) -> &Arc<CancellationToken> {
        &self.cancel
    }

    /// Returns true if the call has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Completes once the call is cancelled.
    pub async fn cancelled(&self) {
        self.cancel.cancelled().await;
    }
}
