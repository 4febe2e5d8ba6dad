//! Requests, execution records and the per-call aggregator.
//!
//! This module provides:
//! - The [`Request`] a caller hands to the orchestrator
//! - The [`ExecutionRecord`] every call returns
//! - The [`RecordAggregator`] unit tasks commit into, and the read-only
//!   [`RecordView`] handlers see

mod aggregator;
mod execution;
mod request;

pub use aggregator::{CommitKind, RecordAggregator, RecordView};
pub use execution::ExecutionRecord;
pub use request::Request;
