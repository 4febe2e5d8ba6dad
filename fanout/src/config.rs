//! Configuration types for building an orchestrator.

use crate::errors::FanoutError;
use crate::journal::{Journaler, JsonLinesJournaler, StdoutJournaler};
use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FanoutConfig {
    /// Retry policy applied to units that declare none. Absent means such
    /// units run exactly once.
    #[serde(default)]
    pub retry: Option<RetryPolicyConfig>,
    /// Journaling backend.
    #[serde(default)]
    pub journal: JournalConfig,
    /// Log output.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FanoutConfig {
    /// Creates a configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or fails validation.
    pub fn from_json_str(json: &str) -> Result<Self, FanoutError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, FanoutError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    /// Sets the default retry policy.
    #[must_use]
    pub fn with_retry(mut self, retry: RetryPolicyConfig) -> Self {
        self.retry = Some(retry);
        self
    }

    /// Sets the journal configuration.
    #[must_use]
    pub fn with_journal(mut self, journal: JournalConfig) -> Self {
        self.journal = journal;
        self
    }

    /// Checks every section.
    ///
    /// # Errors
    ///
    /// Returns the first invalid value found.
    pub fn validate(&self) -> Result<(), FanoutError> {
        if let Some(retry) = &self.retry {
            retry.to_policy()?;
        }
        self.journal.validate()
    }

    /// Returns the configured default retry policy, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the retry section is invalid.
    pub fn default_retry_policy(&self) -> Result<Option<RetryPolicy>, FanoutError> {
        self.retry.as_ref().map(RetryPolicyConfig::to_policy).transpose()
    }
}

/// Serializable retry policy parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    /// Maximum additional attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: usize,
    /// Initial delay in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Delay cap in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Jitter factor in `[0, 1]`.
    #[serde(default = "default_jitter_factor")]
    pub jitter_factor: f64,
}

const fn default_max_retries() -> usize {
    5
}

const fn default_initial_delay_ms() -> u64 {
    100
}

const fn default_max_delay_ms() -> u64 {
    3000
}

const fn default_jitter_factor() -> f64 {
    0.2
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_delay_ms: default_initial_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            jitter_factor: default_jitter_factor(),
        }
    }
}

impl RetryPolicyConfig {
    /// Converts to a [`RetryPolicy`].
    ///
    /// # Errors
    ///
    /// Returns an error if the jitter factor is outside `[0, 1]` or the
    /// initial delay exceeds the cap.
    pub fn to_policy(&self) -> Result<RetryPolicy, FanoutError> {
        if !(0.0..=1.0).contains(&self.jitter_factor) {
            return Err(FanoutError::InvalidConfig(format!(
                "retry.jitter_factor must be in [0, 1], got {}",
                self.jitter_factor
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(FanoutError::InvalidConfig(format!(
                "retry.initial_delay_ms ({}) exceeds retry.max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(RetryPolicy::new(
            self.max_retries,
            Duration::from_millis(self.initial_delay_ms),
            Duration::from_millis(self.max_delay_ms),
            self.jitter_factor,
        ))
    }
}

/// Which journaling backend to use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JournalKind {
    /// Journaling disabled.
    #[default]
    None,
    /// Pretty JSON on stdout.
    Stdout,
    /// JSON lines appended to `path`.
    File,
}

/// Journal configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalConfig {
    /// Backend.
    #[serde(default)]
    pub kind: JournalKind,
    /// File path, required for [`JournalKind::File`].
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl JournalConfig {
    /// Journals to a JSON-lines file.
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            kind: JournalKind::File,
            path: Some(path.into()),
        }
    }

    /// Journals to stdout.
    #[must_use]
    pub const fn stdout() -> Self {
        Self {
            kind: JournalKind::Stdout,
            path: None,
        }
    }

    fn validate(&self) -> Result<(), FanoutError> {
        if self.kind == JournalKind::File && self.path.is_none() {
            return Err(FanoutError::InvalidConfig(
                "journal.path is required when journal.kind is \"file\"".to_string(),
            ));
        }
        Ok(())
    }

    /// Builds the configured journaler, or `None` when disabled.
    ///
    /// # Errors
    ///
    /// Returns an error if a file journal has no path.
    pub fn build(&self) -> Result<Option<Arc<dyn Journaler>>, FanoutError> {
        self.validate()?;
        let journaler: Option<Arc<dyn Journaler>> = match (self.kind, &self.path) {
            (JournalKind::Stdout, _) => Some(Arc::new(StdoutJournaler::new())),
            (JournalKind::File, Some(path)) => Some(Arc::new(JsonLinesJournaler::new(path.clone()))),
            (JournalKind::None | JournalKind::File, _) => None,
        };
        Ok(journaler)
    }
}

/// Log output configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    #[serde(default = "default_log_filter")]
    pub filter: String,
    /// Emit JSON lines instead of human-readable text.
    #[serde(default)]
    pub json: bool,
}

fn default_log_filter() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
            json: false,
        }
    }
}
