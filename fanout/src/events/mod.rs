//! Event sink system for observability.
//!
//! The orchestrator never logs directly to a global logger; it reports
//! leveled, structured events to the [`EventSink`] it was built with.

mod sink;

pub use sink::{CollectedEvent, CollectingEventSink, EventSink, LoggingEventSink, NoOpEventSink};

/// Event types emitted by the orchestrator.
pub mod event_types {
    /// A call started; carries the run id and unit count.
    pub const ORCHESTRATION_STARTED: &str = "orchestration.started";
    /// A call finished; carries result and warning counts.
    pub const ORCHESTRATION_COMPLETED: &str = "orchestration.completed";
    /// A unit's dependencies fired and its handler is about to run.
    pub const UNIT_STARTED: &str = "unit.started";
    /// A unit committed a result.
    pub const UNIT_COMPLETED: &str = "unit.completed";
    /// A unit committed a warning.
    pub const UNIT_FAILED: &str = "unit.failed";
    /// A unit's handler panicked.
    pub const UNIT_PANICKED: &str = "unit.panicked";
    /// The journaler accepted the record.
    pub const JOURNAL_COMPLETED: &str = "journal.completed";
    /// The journaler failed.
    pub const JOURNAL_FAILED: &str = "journal.failed";
    /// Two unit descriptors shared a name; the later one replaced the earlier.
    pub const REGISTRY_DUPLICATE_UNIT: &str = "registry.duplicate_unit";
    /// A unit depends on a name no unit carries.
    pub const REGISTRY_UNKNOWN_DEPENDENCY: &str = "registry.unknown_dependency";
}
