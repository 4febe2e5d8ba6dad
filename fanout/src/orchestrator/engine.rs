//! The orchestration engine.
//!
//! Every call gets a fresh record and a fresh signal graph, so concurrent
//! calls on one orchestrator never share state beyond the read-only registry.

use crate::cancellation::CancellationToken;
use crate::errors::{FanoutError, UnitError};
use crate::events::{event_types, EventSink};
use crate::journal::Journaler;
use crate::record::{CommitKind, ExecutionRecord, RecordAggregator, Request};
use crate::retry::with_retry;
use crate::signals::SignalGraph;
use crate::units::{UnitContext, UnitHandler, UnitSpec};
use futures::FutureExt;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinSet;
use tracing::{error, info_span, Instrument, Level};

/// A unit as stored in the registry: its handler already retry-wrapped.
#[derive(Clone)]
struct RegisteredUnit {
    name: Arc<str>,
    dependencies: Arc<[String]>,
    handler: Arc<dyn UnitHandler>,
}

/// Runs a fixed set of units concurrently, respecting their dependencies.
pub struct Orchestrator {
    sink: Arc<dyn EventSink>,
    journaler: Option<Arc<dyn Journaler>>,
    /// In registration order; names are unique.
    units: Arc<[RegisteredUnit]>,
}

impl Orchestrator {
    /// Builds an orchestrator from unit descriptors.
    ///
    /// Units carrying a retry policy get their handler wrapped once, here.
    /// A later descriptor with an already-registered name replaces the
    /// earlier one. Dependencies on unknown names are reported but kept;
    /// such a unit never runs and its call never returns.
    ///
    /// # Errors
    ///
    /// Returns [`FanoutError::NoUnits`] if `units` is empty.
    pub fn new(
        sink: Arc<dyn EventSink>,
        journaler: Option<Arc<dyn Journaler>>,
        units: Vec<UnitSpec>,
    ) -> Result<Self, FanoutError> {
        if units.is_empty() {
            return Err(FanoutError::NoUnits);
        }

        let mut registry: Vec<RegisteredUnit> = Vec::with_capacity(units.len());
        let mut index: HashMap<String, usize> = HashMap::with_capacity(units.len());

        for spec in units {
            let handler = match spec.retry {
                Some(policy) => with_retry(spec.name.clone(), spec.handler, policy),
                None => spec.handler,
            };
            let unit = RegisteredUnit {
                name: Arc::from(spec.name.as_str()),
                dependencies: spec.dependencies.into(),
                handler,
            };

            if let Some(&slot) = index.get(&spec.name) {
                sink.try_emit(
                    Level::WARN,
                    event_types::REGISTRY_DUPLICATE_UNIT,
                    Some(json!({ "unit": spec.name })),
                );
                registry[slot] = unit;
            } else {
                index.insert(spec.name, registry.len());
                registry.push(unit);
            }
        }

        let known: HashSet<&str> = registry.iter().map(|u| &*u.name).collect();
        for unit in &registry {
            for dependency in unit.dependencies.iter() {
                if !known.contains(dependency.as_str()) {
                    sink.try_emit(
                        Level::WARN,
                        event_types::REGISTRY_UNKNOWN_DEPENDENCY,
                        Some(json!({ "unit": &*unit.name, "dependency": dependency })),
                    );
                }
            }
        }

        Ok(Self {
            sink,
            journaler,
            units: registry.into(),
        })
    }

    /// Returns the number of registered units.
    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Returns the unit names in registration order.
    #[must_use]
    pub fn unit_names(&self) -> Vec<&str> {
        self.units.iter().map(|u| &*u.name).collect()
    }

    /// Returns a unit's declared dependencies.
    #[must_use]
    pub fn dependencies_of(&self, unit: &str) -> Option<&[String]> {
        self.units
            .iter()
            .find(|u| &*u.name == unit)
            .map(|u| &*u.dependencies)
    }

    /// Returns true if finished records are journaled.
    #[must_use]
    pub fn journals(&self) -> bool {
        self.journaler.is_some()
    }

    /// Runs every unit for `request` and returns the finished record.
    ///
    /// Unit failures become warnings in the record; the call itself does not
    /// fail.
    pub async fn orchestrate(&self, request: Request) -> ExecutionRecord {
        self.orchestrate_with_cancel(request, Arc::new(CancellationToken::new()))
            .await
    }

    /// Like [`orchestrate`](Self::orchestrate), threading `cancel` into every
    /// handler.
    ///
    /// Cancellation is advisory: handlers that ignore it run to completion,
    /// and siblings of a cancelled unit are not aborted. The call itself runs
    /// on a detached task, so dropping the returned future (for example under
    /// `tokio::time::timeout`) leaves every handler running and the record
    /// is still journaled.
    pub async fn orchestrate_with_cancel(
        &self,
        request: Request,
        cancel: Arc<CancellationToken>,
    ) -> ExecutionRecord {
        let aggregator = Arc::new(RecordAggregator::new(request));
        let span = info_span!("orchestrate", run_id = %aggregator.run_id());
        let call = Call {
            units: self.units.clone(),
            sink: self.sink.clone(),
            journaler: self.journaler.clone(),
            aggregator: aggregator.clone(),
            cancel,
        };

        match tokio::spawn(call.run().instrument(span)).await {
            Ok(record) => record,
            Err(e) => {
                error!(run_id = %aggregator.run_id(), error = %e, "Orchestration task did not complete");
                aggregator.snapshot()
            }
        }
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("units", &self.unit_names())
            .field("journals", &self.journals())
            .finish_non_exhaustive()
    }
}

/// Everything one call needs, owned so it can outlive the caller's future.
struct Call {
    units: Arc<[RegisteredUnit]>,
    sink: Arc<dyn EventSink>,
    journaler: Option<Arc<dyn Journaler>>,
    aggregator: Arc<RecordAggregator>,
    cancel: Arc<CancellationToken>,
}

impl Call {
    async fn run(self) -> ExecutionRecord {
        let Self {
            units,
            sink,
            journaler,
            aggregator,
            cancel,
        } = self;
        let signals = Arc::new(SignalGraph::new(units.iter().map(|u| &*u.name)));
        let start = Instant::now();

        sink.try_emit(
            Level::INFO,
            event_types::ORCHESTRATION_STARTED,
            Some(json!({ "run_id": aggregator.run_id(), "units": units.len() })),
        );

        let mut tasks = JoinSet::new();
        for unit in units.iter() {
            tasks.spawn(
                run_unit(
                    unit.clone(),
                    signals.clone(),
                    aggregator.clone(),
                    cancel.clone(),
                    sink.clone(),
                )
                .in_current_span(),
            );
        }

        let mut finished = 0;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(()) => finished += 1,
                Err(e) => {
                    error!(run_id = %aggregator.run_id(), error = %e, "Unit task did not complete");
                }
            }
        }
        if finished != units.len() {
            error!(
                run_id = %aggregator.run_id(),
                finished,
                expected = units.len(),
                "Unit task count mismatch"
            );
        }

        let record = aggregator.finish();

        sink.try_emit(
            Level::INFO,
            event_types::ORCHESTRATION_COMPLETED,
            Some(json!({
                "run_id": &record.run_id,
                "results": record.results.len(),
                "warnings": record.warnings.len(),
                "duration_ms": start.elapsed().as_secs_f64() * 1000.0,
            })),
        );

        if let Some(journaler) = journaler {
            spawn_journal(journaler, sink, record.clone());
        }

        record
    }
}

/// Fires a unit's signal when dropped, so dependents are released even if
/// the unit task unwinds.
struct FireOnDrop {
    signals: Arc<SignalGraph>,
    unit: Arc<str>,
}

impl Drop for FireOnDrop {
    fn drop(&mut self) {
        self.signals.fire(&self.unit);
    }
}

/// Waits for dependencies, runs the handler, commits, then fires.
async fn run_unit(
    unit: RegisteredUnit,
    signals: Arc<SignalGraph>,
    aggregator: Arc<RecordAggregator>,
    cancel: Arc<CancellationToken>,
    sink: Arc<dyn EventSink>,
) {
    signals.wait_all(&unit.dependencies).await;
    // Fires on every exit path, after the commit below.
    let _fire = FireOnDrop {
        signals,
        unit: unit.name.clone(),
    };

    sink.try_emit(
        Level::DEBUG,
        event_types::UNIT_STARTED,
        Some(json!({ "unit": &*unit.name })),
    );

    let ctx = UnitContext::new(unit.name.clone(), aggregator.shared_run_id(), cancel);
    let started = Instant::now();
    let outcome = AssertUnwindSafe(unit.handler.call(ctx, aggregator.view()))
        .catch_unwind()
        .await
        .unwrap_or_else(|panic| {
            let message = panic_message(panic.as_ref());
            sink.try_emit(
                Level::ERROR,
                event_types::UNIT_PANICKED,
                Some(json!({ "unit": &*unit.name, "panic": &message })),
            );
            Err(UnitError::Panicked(message))
        });
    let duration_ms = started.elapsed().as_secs_f64() * 1000.0;

    if let Err(err) = &outcome {
        sink.try_emit(
            Level::ERROR,
            event_types::UNIT_FAILED,
            Some(json!({ "unit": &*unit.name, "error": err.to_string(), "duration_ms": duration_ms })),
        );
    }

    if aggregator.commit(&unit.name, outcome) == CommitKind::Result {
        sink.try_emit(
            Level::DEBUG,
            event_types::UNIT_COMPLETED,
            Some(json!({ "unit": &*unit.name, "duration_ms": duration_ms })),
        );
    }
}

/// Hands the record to the journaler on a detached task.
fn spawn_journal(journaler: Arc<dyn Journaler>, sink: Arc<dyn EventSink>, record: ExecutionRecord) {
    tokio::spawn(async move {
        match journaler.journal(&record).await {
            Ok(()) => sink.try_emit(
                Level::DEBUG,
                event_types::JOURNAL_COMPLETED,
                Some(json!({ "run_id": &record.run_id })),
            ),
            Err(e) => sink.try_emit(
                Level::ERROR,
                event_types::JOURNAL_FAILED,
                Some(json!({ "run_id": &record.run_id, "error": e.to_string() })),
            ),
        }
    });
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string())
}
