//! Unit descriptors.

use super::{AsyncFnHandler, FnHandler, UnitContext, UnitHandler, UnitResult};
use crate::record::RecordView;
use crate::retry::RetryPolicy;
use std::future::Future;
use std::sync::Arc;

/// Specification for a single unit.
///
/// Descriptors are consumed when the orchestrator is built and are immutable
/// from then on.
#[derive(Clone)]
pub struct UnitSpec {
    /// The unique name of the unit.
    pub name: String,
    /// Names of units this unit waits for, in declaration order.
    pub dependencies: Vec<String>,
    /// Retry policy; `None` runs the handler exactly once.
    pub retry: Option<RetryPolicy>,
    /// The unit implementation.
    pub handler: Arc<dyn UnitHandler>,
}

impl UnitSpec {
    /// Creates a new unit specification.
    #[must_use]
    pub fn new(name: impl Into<String>, handler: Arc<dyn UnitHandler>) -> Self {
        Self {
            name: name.into(),
            dependencies: Vec::new(),
            retry: None,
            handler,
        }
    }

    /// Creates a unit from a synchronous closure.
    #[must_use]
    pub fn from_fn<F>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(&UnitContext, &RecordView) -> UnitResult + Send + Sync + 'static,
    {
        Self::new(name, Arc::new(FnHandler::new(func)))
    }

    /// Creates a unit from a closure returning a future.
    #[must_use]
    pub fn from_async<F, Fut>(name: impl Into<String>, func: F) -> Self
    where
        F: Fn(UnitContext, RecordView) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = UnitResult> + Send + 'static,
    {
        Self::new(name, Arc::new(AsyncFnHandler::new(func)))
    }

    /// Sets the dependencies.
    #[must_use]
    pub fn with_dependencies(mut self, deps: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.dependencies = deps.into_iter().map(Into::into).collect();
        self
    }

    /// Adds a dependency.
    #[must_use]
    pub fn with_dependency(mut self, dep: impl Into<String>) -> Self {
        self.dependencies.push(dep.into());
        self
    }

    /// Sets the retry policy.
    #[must_use]
    pub fn with_retry(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Uses [`RetryPolicy::DEFAULT`].
    #[must_use]
    pub fn with_default_retry(self) -> Self {
        self.with_retry(RetryPolicy::DEFAULT)
    }

    /// Returns true if the unit waits on nothing.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.dependencies.is_empty()
    }
}

impl std::fmt::Debug for UnitSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitSpec")
            .field("name", &self.name)
            .field("dependencies", &self.dependencies)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}
