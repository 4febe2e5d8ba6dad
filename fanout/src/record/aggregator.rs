//! Mutation-guarded aggregation of unit outcomes into one record.

use super::{ExecutionRecord, Request};
use crate::units::UnitResult;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Where a unit's outcome landed in the record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitKind {
    /// The unit's value was inserted into `results`.
    Result,
    /// The unit's error text was appended to `warnings`.
    Warning,
}

/// The shared record of one orchestration call.
///
/// Every unit task commits exactly once, inside a single critical section.
/// The record is read back in full only after every task has been joined.
#[derive(Debug)]
pub struct RecordAggregator {
    run_id: Arc<str>,
    request: Arc<Request>,
    record: Mutex<ExecutionRecord>,
}

impl RecordAggregator {
    /// Creates the aggregator for a new call.
    #[must_use]
    pub fn new(request: Request) -> Self {
        let record = ExecutionRecord::new(request);
        Self {
            run_id: Arc::from(record.run_id.as_str()),
            request: Arc::new(record.request.clone()),
            record: Mutex::new(record),
        }
    }

    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Returns a shared handle to the run id.
    #[must_use]
    pub fn shared_run_id(&self) -> Arc<str> {
        self.run_id.clone()
    }

    /// Commits a unit's outcome.
    ///
    /// Success inserts into `results`; failure appends the error's display
    /// text to `warnings`. Never both.
    pub fn commit(&self, unit: &str, outcome: UnitResult) -> CommitKind {
        let mut record = self.record.lock();
        match outcome {
            Ok(value) => {
                record.results.insert(unit.to_string(), value);
                CommitKind::Result
            }
            Err(err) => {
                record.warnings.push(err.to_string());
                CommitKind::Warning
            }
        }
    }

    /// Returns a read-only view for handlers.
    #[must_use]
    pub fn view(self: &Arc<Self>) -> RecordView {
        RecordView {
            inner: Arc::clone(self),
        }
    }

    /// Clones the current state of the record.
    #[must_use]
    pub fn snapshot(&self) -> ExecutionRecord {
        self.record.lock().clone()
    }

    /// Consumes the aggregator and returns the finished record.
    ///
    /// Falls back to a snapshot if a handler still holds a view.
    #[must_use]
    pub fn finish(self: Arc<Self>) -> ExecutionRecord {
        match Arc::try_unwrap(self) {
            Ok(aggregator) => aggregator.record.into_inner(),
            Err(shared) => shared.snapshot(),
        }
    }
}

/// A cheap, read-only window over the live record of a call.
///
/// Dependencies' results are guaranteed visible: a handler only runs after
/// every dependency committed and fired its signal.
#[derive(Debug, Clone)]
pub struct RecordView {
    inner: Arc<RecordAggregator>,
}

impl RecordView {
    /// Returns the run id.
    #[must_use]
    pub fn run_id(&self) -> &str {
        self.inner.run_id()
    }

    /// Returns the request that started the run.
    #[must_use]
    pub fn request(&self) -> &Request {
        &self.inner.request
    }

    /// Returns the request payload.
    #[must_use]
    pub fn payload(&self) -> &serde_json::Value {
        &self.inner.request.payload
    }

    /// Returns a clone of a unit's result, if it has succeeded.
    #[must_use]
    pub fn result(&self, unit: &str) -> Option<serde_json::Value> {
        self.inner.record.lock().results.get(unit).cloned()
    }

    /// Returns true if `unit` has committed a result.
    #[must_use]
    pub fn has_result(&self, unit: &str) -> bool {
        self.inner.record.lock().results.contains_key(unit)
    }

    /// Returns a clone of every result committed so far.
    #[must_use]
    pub fn results(&self) -> BTreeMap<String, serde_json::Value> {
        self.inner.record.lock().results.clone()
    }

    /// Returns a clone of every warning committed so far.
    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        self.inner.record.lock().warnings.clone()
    }

    /// Clones the whole record as it stands now.
    #[must_use]
    pub fn snapshot(&self) -> ExecutionRecord {
        self.inner.snapshot()
    }
}
