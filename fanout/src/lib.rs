//! # Fanout
//!
//! A dependency-aware fan-out dispatcher.
//!
//! Fanout runs a fixed set of named units concurrently. Each unit starts as
//! soon as every unit it depends on has committed an outcome, and every
//! outcome is aggregated into one execution record per call:
//!
//! - **Concurrent execution**: one task per unit per call
//! - **One-shot dependency signals**: rebuilt for every call
//! - **Retries**: jittered exponential backoff, wrapped at build time
//! - **Failures as data**: a failing unit becomes a warning, not an error
//! - **Journaling**: best-effort, fire-and-forget persistence of records
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use fanout::prelude::*;
//! use serde_json::json;
//!
//! let orchestrator = OrchestratorBuilder::new()
//!     .unit(UnitSpec::from_fn("authorize", |_, _| Ok(json!("AUTHORIZED"))))
//!     .unit(UnitSpec::from_fn("charge", |_, _| Ok(json!("CHARGED")))
//!         .with_dependency("authorize")
//!         .with_default_retry())
//!     .build()?;
//!
//! let record = orchestrator.orchestrate(Request::new("req-1", json!({}))).await;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod cancellation;
pub mod config;
pub mod errors;
pub mod events;
pub mod journal;
pub mod logging;
pub mod orchestrator;
pub mod record;
pub mod retry;
pub mod signals;
pub mod testing;
pub mod units;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::cancellation::CancellationToken;
    pub use crate::config::{FanoutConfig, JournalConfig, LoggingConfig, RetryPolicyConfig};
    pub use crate::errors::{FanoutError, JournalError, UnitError};
    pub use crate::events::{EventSink, LoggingEventSink, NoOpEventSink};
    pub use crate::journal::{Journaler, JsonLinesJournaler, StdoutJournaler};
    pub use crate::orchestrator::{Orchestrator, OrchestratorBuilder};
    pub use crate::record::{ExecutionRecord, RecordView, Request};
    pub use crate::retry::{RetryPolicy, DEFAULT_RETRY_POLICY};
    pub use crate::units::{UnitContext, UnitHandler, UnitResult, UnitSpec};
}
