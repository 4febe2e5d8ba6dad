//! Journaler that appends records to a JSON-lines file.

use super::Journaler;
use crate::errors::JournalError;
use crate::record::ExecutionRecord;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

/// Appends one compact JSON document per record to a file.
///
/// Writes are serialized so concurrent journal tasks never interleave lines.
#[derive(Debug)]
pub struct JsonLinesJournaler {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonLinesJournaler {
    /// Creates a journaler writing to `path`. The file is created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Returns the journal file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Journaler for JsonLinesJournaler {
    async fn journal(&self, record: &ExecutionRecord) -> Result<(), JournalError> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');

        let _guard = self.write_lock.lock().await;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}
