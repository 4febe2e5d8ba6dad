//! Event sink trait and implementations.

use parking_lot::RwLock;
use tracing::{debug, error, info, trace, warn, Level};

/// Trait for sinks that receive leveled, structured events.
///
/// Sinks are shared by every unit task of every in-flight call, so
/// `try_emit` must be cheap and must never fail.
pub trait EventSink: Send + Sync {
    /// Emits an event without blocking.
    ///
    /// # Arguments
    ///
    /// * `level` - Severity of the event
    /// * `event_type` - The type of event (e.g., "unit.failed")
    /// * `data` - Optional structured event data
    fn try_emit(&self, level: Level, event_type: &str, data: Option<serde_json::Value>);
}

/// A no-op event sink that discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpEventSink;

impl EventSink for NoOpEventSink {
    fn try_emit(&self, _level: Level, _event_type: &str, _data: Option<serde_json::Value>) {}
}

/// An event sink that forwards events to the tracing framework.
#[derive(Debug, Clone)]
pub struct LoggingEventSink {
    /// Events less severe than this are dropped.
    min_level: Level,
}

impl Default for LoggingEventSink {
    fn default() -> Self {
        Self {
            min_level: Level::DEBUG,
        }
    }
}

impl LoggingEventSink {
    /// Creates a logging sink that drops events below `min_level`.
    #[must_use]
    pub const fn new(min_level: Level) -> Self {
        Self { min_level }
    }

    /// Creates a sink that forwards everything from debug upwards.
    #[must_use]
    pub const fn debug() -> Self {
        Self::new(Level::DEBUG)
    }

    /// Creates a sink that forwards info and more severe events.
    #[must_use]
    pub const fn info() -> Self {
        Self::new(Level::INFO)
    }

    /// Returns true if an event at `level` would be forwarded.
    #[must_use]
    pub fn enabled(&self, level: Level) -> bool {
        // tracing orders levels by verbosity: TRACE > DEBUG > ... > ERROR
        level <= self.min_level
    }

    fn log_event(level: Level, event_type: &str, data: Option<&serde_json::Value>) {
        match level {
            Level::ERROR => error!(event_type = %event_type, event_data = ?data, "Event: {}", event_type),
            Level::WARN => warn!(event_type = %event_type, event_data = ?data, "Event: {}", event_type),
            Level::INFO => info!(event_type = %event_type, event_data = ?data, "Event: {}", event_type),
            Level::DEBUG => debug!(event_type = %event_type, event_data = ?data, "Event: {}", event_type),
            Level::TRACE => trace!(event_type = %event_type, event_data = ?data, "Event: {}", event_type),
        }
    }
}

impl EventSink for LoggingEventSink {
    fn try_emit(&self, level: Level, event_type: &str, data: Option<serde_json::Value>) {
        if self.enabled(level) {
            Self::log_event(level, event_type, data.as_ref());
        }
    }
}

/// An event recorded by [`CollectingEventSink`].
#[derive(Debug, Clone, PartialEq)]
pub struct CollectedEvent {
    /// Severity.
    pub level: Level,
    /// Event type.
    pub event_type: String,
    /// Event data.
    pub data: Option<serde_json::Value>,
}

/// A collecting event sink for testing purposes.
#[derive(Debug, Default)]
pub struct CollectingEventSink {
    events: RwLock<Vec<CollectedEvent>>,
}

impl CollectingEventSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected events.
    #[must_use]
    pub fn events(&self) -> Vec<CollectedEvent> {
        self.events.read().clone()
    }

    /// Returns the number of collected events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.read().len()
    }

    /// Returns true if no events have been collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.read().is_empty()
    }

    /// Returns events matching a type prefix.
    #[must_use]
    pub fn events_of_type(&self, type_prefix: &str) -> Vec<CollectedEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.event_type.starts_with(type_prefix))
            .cloned()
            .collect()
    }

    /// Returns events emitted at exactly `level`.
    #[must_use]
    pub fn events_at(&self, level: Level) -> Vec<CollectedEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.level == level)
            .cloned()
            .collect()
    }
}

impl EventSink for CollectingEventSink {
    fn try_emit(&self, level: Level, event_type: &str, data: Option<serde_json::Value>) {
        self.events.write().push(CollectedEvent {
            level,
            event_type: event_type.to_string(),
            data,
        });
    }
}
