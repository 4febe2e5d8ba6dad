//! The finished execution record returned by every call.

use super::Request;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The per-call record of what every unit produced.
///
/// Once a call returns, each registered unit appears exactly once: either as
/// a key in `results` or as one entry in `warnings`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    /// Identifier of this run.
    pub run_id: String,
    /// When the run started.
    pub created_at: DateTime<Utc>,
    /// The request that started the run.
    pub request: Request,
    /// Results of the units that succeeded, keyed by unit name.
    pub results: BTreeMap<String, serde_json::Value>,
    /// Terminal error text of each unit that failed, in commit order.
    pub warnings: Vec<String>,
}

impl ExecutionRecord {
    /// Creates an empty record for a request.
    ///
    /// An empty request id is replaced with a generated UUID.
    #[must_use]
    pub fn new(request: Request) -> Self {
        let run_id = if request.request_id.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            request.request_id.clone()
        };
        Self {
            run_id,
            created_at: Utc::now(),
            request,
            results: BTreeMap::new(),
            warnings: Vec::new(),
        }
    }

    /// Returns the result of a unit, if it succeeded.
    #[must_use]
    pub fn result(&self, unit: &str) -> Option<&serde_json::Value> {
        self.results.get(unit)
    }

    /// Returns true if no unit failed.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Number of units that have committed an outcome.
    #[must_use]
    pub fn committed(&self) -> usize {
        self.results.len() + self.warnings.len()
    }

    /// Serializes the record as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if a result value cannot be serialized.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
