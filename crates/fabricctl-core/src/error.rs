// ── Core error types ──
//
// Every failure a dispatch or wait call can produce. Transport-layer
// errors are wrapped with their source chain intact; controller
// rejections carry the raw response so operators can see exactly what
// the controller said.

use std::collections::BTreeSet;

use serde_json::{Value, json};
use thiserror::Error;

use fabricctl_api::RawResponse;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    /// Malformed caller input. Raised before any network call.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    // ── Controller errors ────────────────────────────────────────────
    /// Network-level failure; the controller never answered.
    #[error("Cannot reach controller: {source}")]
    Transport {
        #[from]
        source: fabricctl_api::Error,
    },

    /// Controller answered with a non-success status or an error body.
    #[error(
        "Controller rejected {} {} (HTTP {}): {}",
        .response.method, .response.request_path, .response.return_code, .response.message
    )]
    ControllerResponse { response: Box<RawResponse> },

    #[error("Entity not found: {entity_type} {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Wait errors ──────────────────────────────────────────────────
    /// Budget exhausted with items still pending.
    #[error(
        "Timed out waiting for {operation} after {budget_secs}s; pending: {}; done: {}",
        join_keys(.todo), join_keys(.done)
    )]
    Timeout {
        operation: String,
        budget_secs: u64,
        done: BTreeSet<String>,
        todo: BTreeSet<String>,
    },

    /// An item reached a terminal failure status.
    #[error("{operation} failed on {item} (status {status}); pending: {}; done: {}", join_keys(.todo), join_keys(.done))]
    Convergence {
        operation: String,
        item: String,
        status: String,
        done: BTreeSet<String>,
        todo: BTreeSet<String>,
    },

    #[error("Wait for {operation} cancelled; pending: {}; done: {}", join_keys(.todo), join_keys(.done))]
    Cancelled {
        operation: String,
        done: BTreeSet<String>,
        todo: BTreeSet<String>,
    },
}

fn join_keys(keys: &BTreeSet<String>) -> String {
    if keys.is_empty() {
        return "-".into();
    }
    keys.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub(crate) fn rejected(response: RawResponse) -> Self {
        Self::ControllerResponse {
            response: Box::new(response),
        }
    }

    /// The controller response to record in the ledger for this failure.
    ///
    /// Controller rejections keep the raw response; everything else gets a
    /// synthetic response carrying the error text.
    pub fn response_value(&self) -> Value {
        match self {
            Self::ControllerResponse { response } => {
                serde_json::to_value(response.as_ref()).unwrap_or(Value::Null)
            }
            other => json!({
                "RETURN_CODE": 0,
                "MESSAGE": other.to_string(),
                "DATA": {},
            }),
        }
    }

    /// Items still pending when a wait call gave up, if this is a wait error.
    pub fn pending(&self) -> Option<&BTreeSet<String>> {
        match self {
            Self::Timeout { todo, .. }
            | Self::Convergence { todo, .. }
            | Self::Cancelled { todo, .. } => Some(todo),
            _ => None,
        }
    }
}
