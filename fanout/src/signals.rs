//! One-shot completion signals, one per unit, rebuilt for every call.
//!
//! A signal moves from pending to fired exactly once and never reverts.
//! Firing happens after the unit's outcome is committed, so a dependent that
//! passes [`SignalGraph::wait_all`] observes every dependency's commit.

use std::collections::HashMap;
use tokio::sync::watch;
use tracing::warn;

/// A single-fire latch that any number of tasks can wait on.
#[derive(Debug)]
pub struct CompletionSignal {
    fired: watch::Sender<bool>,
}

impl Default for CompletionSignal {
    fn default() -> Self {
        Self::new()
    }
}

impl CompletionSignal {
    /// Creates a pending signal.
    #[must_use]
    pub fn new() -> Self {
        let (fired, _) = watch::channel(false);
        Self { fired }
    }

    /// Fires the signal, waking every waiter.
    ///
    /// Returns false if it had already fired.
    pub fn fire(&self) -> bool {
        self.fired.send_if_modified(|fired| {
            if *fired {
                false
            } else {
                *fired = true;
                true
            }
        })
    }

    /// Returns true once the signal has fired.
    #[must_use]
    pub fn is_fired(&self) -> bool {
        *self.fired.borrow()
    }

    /// Completes once the signal has fired; immediately if it already has.
    pub async fn wait(&self) {
        let mut rx = self.fired.subscribe();
        // The sender lives as long as `self`, so this cannot observe a closed channel.
        let _ = rx.wait_for(|fired| *fired).await;
    }
}

/// The per-call set of completion signals, keyed by unit name.
#[derive(Debug, Default)]
pub struct SignalGraph {
    signals: HashMap<String, CompletionSignal>,
}

impl SignalGraph {
    /// Creates one pending signal per unit name.
    #[must_use]
    pub fn new<I, S>(units: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            signals: units
                .into_iter()
                .map(|name| (name.into(), CompletionSignal::new()))
                .collect(),
        }
    }

    /// Returns the number of signals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    /// Returns true if the graph holds no signals.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    /// Returns true if the unit's signal has fired.
    #[must_use]
    pub fn is_fired(&self, unit: &str) -> bool {
        self.signals.get(unit).is_some_and(CompletionSignal::is_fired)
    }

    /// Fires the unit's signal. Returns false if unknown or already fired.
    pub fn fire(&self, unit: &str) -> bool {
        self.signals.get(unit).is_some_and(CompletionSignal::fire)
    }

    /// Completes once every named dependency has fired.
    ///
    /// With no dependencies this returns immediately. A name with no signal
    /// never fires, so waiting on it never completes.
    pub async fn wait_all(&self, dependencies: &[String]) {
        for dependency in dependencies {
            match self.signals.get(dependency) {
                Some(signal) => signal.wait().await,
                None => {
                    warn!(dependency = %dependency, "Waiting on a unit that does not exist");
                    std::future::pending::<()>().await;
                }
            }
        }
    }
}
