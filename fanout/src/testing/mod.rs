//! Testing utilities for orchestrators.
//!
//! This module provides:
//! - Handlers with scripted failures
//! - Journalers that collect or reject records
//! - An ordering probe for asserting dependency ordering

mod journalers;
mod mocks;

pub use journalers::{CollectingJournaler, FailingJournaler, SlowJournaler};
pub use mocks::{FlakyHandler, OrderingProbe, ProbeEvent};
