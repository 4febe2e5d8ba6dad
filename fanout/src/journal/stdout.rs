//! Journaler that prints records to standard output.

use super::Journaler;
use crate::errors::JournalError;
use crate::record::ExecutionRecord;
use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

/// Writes each record to stdout as indented JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct StdoutJournaler;

impl StdoutJournaler {
    /// Creates a new stdout journaler.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Journaler for StdoutJournaler {
    async fn journal(&self, record: &ExecutionRecord) -> Result<(), JournalError> {
        let mut rendered = record.to_json_pretty()?;
        rendered.push('\n');

        let mut stdout = tokio::io::stdout();
        stdout.write_all(rendered.as_bytes()).await?;
        stdout.flush().await?;
        Ok(())
    }
}
