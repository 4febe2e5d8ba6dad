//! Fluent builder for orchestrators.

use super::Orchestrator;
use crate::config::FanoutConfig;
use crate::errors::FanoutError;
use crate::events::{EventSink, LoggingEventSink};
use crate::journal::Journaler;
use crate::retry::RetryPolicy;
use crate::units::UnitSpec;
use std::sync::Arc;

/// Builder for creating orchestrators.
#[derive(Default)]
pub struct OrchestratorBuilder {
    units: Vec<UnitSpec>,
    sink: Option<Arc<dyn EventSink>>,
    journaler: Option<Arc<dyn Journaler>>,
    default_retry: Option<RetryPolicy>,
}

impl OrchestratorBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder with journaling and default retries from `config`.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn from_config(config: &FanoutConfig) -> Result<Self, FanoutError> {
        config.validate()?;
        Ok(Self {
            journaler: config.journal.build()?,
            default_retry: config.default_retry_policy()?,
            ..Self::default()
        })
    }

    /// Adds a unit.
    #[must_use]
    pub fn unit(mut self, spec: UnitSpec) -> Self {
        self.units.push(spec);
        self
    }

    /// Adds several units.
    #[must_use]
    pub fn units(mut self, specs: impl IntoIterator<Item = UnitSpec>) -> Self {
        self.units.extend(specs);
        self
    }

    /// Sets the event sink. Defaults to a [`LoggingEventSink`].
    #[must_use]
    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Sets the journaler.
    #[must_use]
    pub fn journaler(mut self, journaler: Arc<dyn Journaler>) -> Self {
        self.journaler = Some(journaler);
        self
    }

    /// Disables journaling.
    #[must_use]
    pub fn without_journal(mut self) -> Self {
        self.journaler = None;
        self
    }

    /// Retry policy for units that declare none.
    #[must_use]
    pub fn default_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.default_retry = Some(policy);
        self
    }

    /// Returns the number of units added so far.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Builds the orchestrator.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError::NoUnits`] if no unit was added.
    pub fn build(self) -> Result<Orchestrator, FanoutError> {
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(LoggingEventSink::default()));
        let units = match self.default_retry {
            Some(policy) => self
                .units
                .into_iter()
                .map(|spec| match spec.retry {
                    Some(_) => spec,
                    None => spec.with_retry(policy.clone()),
                })
                .collect(),
            None => self.units,
        };
        Orchestrator::new(sink, self.journaler, units)
    }
}

impl std::fmt::Debug for OrchestratorBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrchestratorBuilder")
            .field("units", &self.units)
            .field("has_sink", &self.sink.is_some())
            .field("has_journaler", &self.journaler.is_some())
            .field("default_retry", &self.default_retry)
            .finish()
    }
}
