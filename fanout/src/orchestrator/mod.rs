//! Orchestrator construction and execution.
//!
//! This module provides:
//! - The [`Orchestrator`] engine
//! - A fluent [`OrchestratorBuilder`] with config support

mod builder;
mod engine;
mod integration_tests;

pub use builder::OrchestratorBuilder;
pub use engine::Orchestrator;
