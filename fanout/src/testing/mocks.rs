//! Scripted handlers and ordering instrumentation.

use crate::errors::UnitError;
use crate::record::RecordView;
use crate::units::{UnitContext, UnitHandler, UnitResult, UnitSpec};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// A handler that fails a fixed number of times, then succeeds.
#[derive(Debug)]
pub struct FlakyHandler {
    failures: usize,
    value: serde_json::Value,
    error: String,
    calls: AtomicUsize,
    attempts: Mutex<Vec<usize>>,
}

impl FlakyHandler {
    /// Fails `failures` times with "transient failure", then returns `value`.
    #[must_use]
    pub fn new(failures: usize, value: serde_json::Value) -> Self {
        Self {
            failures,
            value,
            error: "transient failure".to_string(),
            calls: AtomicUsize::new(0),
            attempts: Mutex::new(Vec::new()),
        }
    }

    /// Never succeeds; every call fails with `error`.
    #[must_use]
    pub fn always_failing(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            ..Self::new(usize::MAX, serde_json::Value::Null)
        }
    }

    /// Sets the error message used for failures.
    #[must_use]
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = error.into();
        self
    }

    /// Returns how many times the handler was invoked.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Returns the attempt number the context reported on each call.
    #[must_use]
    pub fn attempts_seen(&self) -> Vec<usize> {
        self.attempts.lock().clone()
    }
}

#[async_trait]
impl UnitHandler for FlakyHandler {
    async fn call(&self, ctx: UnitContext, _record: RecordView) -> UnitResult {
        self.attempts.lock().push(ctx.attempt());
        let previous = self.calls.fetch_add(1, Ordering::SeqCst);
        if previous < self.failures {
            Err(UnitError::msg(self.error.clone()))
        } else {
            Ok(self.value.clone())
        }
    }
}

/// What the probe saw a unit do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeEvent {
    /// The unit's handler started; carries the dependency results it could see.
    Started {
        /// Unit name.
        unit: String,
        /// Dependencies that had a committed result at start.
        visible: Vec<String>,
    },
    /// The unit's handler returned.
    Finished {
        /// Unit name.
        unit: String,
    },
}

/// Records the order in which instrumented handlers start and finish.
#[derive(Debug, Default)]
pub struct OrderingProbe {
    events: Mutex<Vec<ProbeEvent>>,
}

impl OrderingProbe {
    /// Creates a shared probe.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Returns every recorded event in order.
    #[must_use]
    pub fn events(&self) -> Vec<ProbeEvent> {
        self.events.lock().clone()
    }

    /// Position of the unit's start event.
    #[must_use]
    pub fn started_at(&self, unit: &str) -> Option<usize> {
        self.events
            .lock()
            .iter()
            .position(|e| matches!(e, ProbeEvent::Started { unit: u, .. } if u == unit))
    }

    /// Position of the unit's finish event.
    #[must_use]
    pub fn finished_at(&self, unit: &str) -> Option<usize> {
        self.events
            .lock()
            .iter()
            .position(|e| matches!(e, ProbeEvent::Finished { unit: u } if u == unit))
    }

    /// Builds a unit that records its start and finish, sleeps for `work`,
    /// then returns `"<NAME>-OUT"`.
    #[must_use]
    pub fn unit(self: &Arc<Self>, name: &str, dependencies: &[&str], work: Duration) -> UnitSpec {
        let probe = Arc::clone(self);
        let deps: Vec<String> = dependencies.iter().map(|d| (*d).to_string()).collect();
        let watched = deps.clone();
        UnitSpec::from_async(name, move |ctx: UnitContext, record: RecordView| {
            let probe = probe.clone();
            let watched = watched.clone();
            async move {
                let visible = watched.into_iter().filter(|d| record.has_result(d)).collect();
                probe.events.lock().push(ProbeEvent::Started {
                    unit: ctx.unit_name().to_string(),
                    visible,
                });
                if !work.is_zero() {
                    tokio::time::sleep(work).await;
                }
                probe.events.lock().push(ProbeEvent::Finished {
                    unit: ctx.unit_name().to_string(),
                });
                let out: UnitResult = Ok(serde_json::json!(format!(
                    "{}-OUT",
                    ctx.unit_name().to_uppercase()
                )));
                out
            }
        })
        .with_dependencies(deps)
    }
}
