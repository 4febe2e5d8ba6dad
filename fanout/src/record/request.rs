//! The caller-supplied request.

use serde::{Deserialize, Serialize};

/// A request to the orchestrator: an identifier plus an arbitrary payload.
///
/// The request is read-only input; it is echoed into the execution record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    /// Caller-chosen identifier, reused as the run id.
    pub request_id: String,
    /// Arbitrary payload visible to every handler.
    #[serde(default)]
    pub payload: serde_json::Value,
}

impl Request {
    /// Creates a new request.
    #[must_use]
    pub fn new(request_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            request_id: request_id.into(),
            payload,
        }
    }

    /// Creates a request with a generated UUID v4 identifier.
    #[must_use]
    pub fn generated(payload: serde_json::Value) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), payload)
    }
}
