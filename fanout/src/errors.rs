//! Error types for the fanout dispatcher.
//!
//! Three families exist:
//! - [`FanoutError`] for construction and setup failures, the only errors a
//!   caller ever sees as `Err`.
//! - [`UnitError`] for a unit's handler failing. These never cross the
//!   orchestrator boundary; they become warnings in the execution record.
//! - [`JournalError`] for journaling failures, which are only logged.

use thiserror::Error;

/// The main error type for building and configuring an orchestrator.
#[derive(Debug, Error)]
pub enum FanoutError {
    /// The orchestrator was given no units.
    #[error("no units provided")]
    NoUnits,

    /// A configuration value was rejected.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The tracing subscriber could not be installed.
    #[error("Logging setup failed: {0}")]
    Logging(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// A failure produced by a unit's handler.
///
/// The display text of the terminal `UnitError` is exactly what ends up in
/// the execution record's warnings.
#[derive(Debug, Error)]
pub enum UnitError {
    /// The handler reported a failure.
    #[error("{0}")]
    Failed(String),

    /// The handler observed cancellation and gave up.
    #[error("cancelled: {0}")]
    Cancelled(String),

    /// The handler panicked; the payload message is kept when it is a string.
    #[error("unit panicked: {0}")]
    Panicked(String),

    /// An arbitrary error from a handler built on `anyhow`.
    #[error(transparent)]
    Other(#[from] anyhow::Error),

    /// A retried unit ran out of attempts, or its last failure was not retryable.
    #[error("{source}\nunit {unit} failed after {attempts} attempts")]
    RetriesExhausted {
        /// Name of the unit.
        unit: String,
        /// Number of handler invocations performed.
        attempts: usize,
        /// The last failure observed.
        source: Box<UnitError>,
    },
}

impl UnitError {
    /// Creates a plain failure from a message.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failed(message.into())
    }

    /// Wraps the last failure of a retried unit with the retry summary.
    #[must_use]
    pub fn exhausted(unit: impl Into<String>, attempts: usize, last: Self) -> Self {
        Self::RetriesExhausted {
            unit: unit.into(),
            attempts,
            source: Box::new(last),
        }
    }

    /// Returns the underlying failure, looking through retry summaries.
    #[must_use]
    pub fn root(&self) -> &Self {
        match self {
            Self::RetriesExhausted { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the attempt count if this failure carries a retry summary.
    #[must_use]
    pub const fn attempts(&self) -> Option<usize> {
        match self {
            Self::RetriesExhausted { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }

    /// Returns true if the root failure is a cancellation.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        matches!(self.root(), Self::Cancelled(_))
    }
}

/// Error returned by a [`Journaler`](crate::journal::Journaler).
#[derive(Debug, Error)]
pub enum JournalError {
    /// IO error while writing the record.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The record could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The journal backend refused the record.
    #[error("Journal rejected record: {0}")]
    Rejected(String),
}
