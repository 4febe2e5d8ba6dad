//! Best-effort journaling of finished execution records.
//!
//! The orchestrator hands each finished record to its journaler on a detached
//! task. A journaling failure is only reported through the event sink; it
//! never changes the record returned to the caller.

mod file;
mod stdout;

pub use file::JsonLinesJournaler;
pub use stdout::StdoutJournaler;

use crate::errors::JournalError;
use crate::record::ExecutionRecord;
use async_trait::async_trait;

/// Durably records finished execution records.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Journaler: Send + Sync {
    /// Persists one finished record.
    async fn journal(&self, record: &ExecutionRecord) -> Result<(), JournalError>;
}
