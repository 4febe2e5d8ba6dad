//! Unit handler trait and implementations.
//!
//! Units are the fundamental pieces of work the orchestrator fans out.

mod context;
mod spec;

pub use context::UnitContext;
pub use spec::UnitSpec;

use crate::errors::UnitError;
use crate::record::RecordView;
use async_trait::async_trait;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;

/// The outcome of one handler invocation.
pub type UnitResult = Result<serde_json::Value, UnitError>;

/// Trait for unit handlers.
///
/// A handler reads the call's record through `record` and returns either a
/// value, which lands in the record's results, or an error, whose text lands
/// in the record's warnings.
#[async_trait]
pub trait UnitHandler: Send + Sync {
    /// Executes the unit once.
    async fn call(&self, ctx: UnitContext, record: RecordView) -> UnitResult;
}

/// A handler backed by a synchronous closure.
pub struct FnHandler<F>
where
    F: Fn(&UnitContext, &RecordView) -> UnitResult + Send + Sync,
{
    func: F,
}

impl<F> FnHandler<F>
where
    F: Fn(&UnitContext, &RecordView) -> UnitResult + Send + Sync,
{
    /// Creates a new function-based handler.
    pub const fn new(func: F) -> Self {
        Self { func }
    }
}

impl<F> Debug for FnHandler<F>
where
    F: Fn(&UnitContext, &RecordView) -> UnitResult + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F> UnitHandler for FnHandler<F>
where
    F: Fn(&UnitContext, &RecordView) -> UnitResult + Send + Sync,
{
    async fn call(&self, ctx: UnitContext, record: RecordView) -> UnitResult {
        (self.func)(&ctx, &record)
    }
}

/// A handler backed by a closure returning a future.
pub struct AsyncFnHandler<F, Fut>
where
    F: Fn(UnitContext, RecordView) -> Fut + Send + Sync,
    Fut: Future<Output = UnitResult> + Send,
{
    func: F,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> AsyncFnHandler<F, Fut>
where
    F: Fn(UnitContext, RecordView) -> Fut + Send + Sync,
    Fut: Future<Output = UnitResult> + Send,
{
    /// Creates a new async function-based handler.
    pub const fn new(func: F) -> Self {
        Self {
            func,
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Debug for AsyncFnHandler<F, Fut>
where
    F: Fn(UnitContext, RecordView) -> Fut + Send + Sync,
    Fut: Future<Output = UnitResult> + Send,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AsyncFnHandler").finish_non_exhaustive()
    }
}

#[async_trait]
impl<F, Fut> UnitHandler for AsyncFnHandler<F, Fut>
where
    F: Fn(UnitContext, RecordView) -> Fut + Send + Sync,
    Fut: Future<Output = UnitResult> + Send,
{
    async fn call(&self, ctx: UnitContext, record: RecordView) -> UnitResult {
        (self.func)(ctx, record).await
    }
}
