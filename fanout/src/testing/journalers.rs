//! Journalers for tests.

use crate::errors::JournalError;
use crate::journal::Journaler;
use crate::record::ExecutionRecord;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::time::Duration;
use tokio::sync::Notify;

/// Keeps every journaled record in memory.
#[derive(Debug, Default)]
pub struct CollectingJournaler {
    records: Mutex<Vec<ExecutionRecord>>,
    notify: Notify,
}

impl CollectingJournaler {
    /// Creates a new collecting journaler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the records journaled so far.
    #[must_use]
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.records.lock().clone()
    }

    /// Waits until at least `count` records arrived, or `timeout` elapses.
    ///
    /// Returns the records seen either way.
    pub async fn wait_for(&self, count: usize, timeout: Duration) -> Vec<ExecutionRecord> {
        let wait = async {
            loop {
                let notified = self.notify.notified();
                if self.records.lock().len() >= count {
                    return;
                }
                notified.await;
            }
        };
        let _ = tokio::time::timeout(timeout, wait).await;
        self.records()
    }
}

#[async_trait]
impl Journaler for CollectingJournaler {
    async fn journal(&self, record: &ExecutionRecord) -> Result<(), JournalError> {
        self.records.lock().push(record.clone());
        self.notify.notify_waiters();
        Ok(())
    }
}

/// Rejects every record.
#[derive(Debug, Clone)]
pub struct FailingJournaler {
    reason: String,
}

impl FailingJournaler {
    /// Creates a journaler that fails with `reason`.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Journaler for FailingJournaler {
    async fn journal(&self, _record: &ExecutionRecord) -> Result<(), JournalError> {
        Err(JournalError::Rejected(self.reason.clone()))
    }
}

/// Sleeps before accepting each record.
#[derive(Debug)]
pub struct SlowJournaler {
    delay: Duration,
    inner: CollectingJournaler,
}

impl SlowJournaler {
    /// Creates a journaler that takes `delay` per record.
    #[must_use]
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            inner: CollectingJournaler::new(),
        }
    }

    /// Returns the records accepted so far.
    #[must_use]
    pub fn records(&self) -> Vec<ExecutionRecord> {
        self.inner.records()
    }
}

#[async_trait]
impl Journaler for SlowJournaler {
    async fn journal(&self, record: &ExecutionRecord) -> Result<(), JournalError> {
        tokio::time::sleep(self.delay).await;
        self.inner.journal(record).await
    }
}
