// ── Request dispatch ──
//
// One call in, at most one transport call out. Check mode short-circuits
// before the transport with a synthesized success so dry runs walk the
// same code path as real runs. Recording into the ledger is left to the
// caller, which is the only place that knows the diff.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;

use fabricctl_api::{RawResponse, Transport, Verb};

use crate::error::CoreError;

/// Body returned for every simulated call.
pub const CHECK_MODE_MESSAGE: &str = "Check mode: no request sent";

/// Derived outcome of one dispatched call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OperationResult {
    pub success: bool,
    pub changed: bool,
    pub found: bool,
}

impl OperationResult {
    /// Outcome for a call that succeeded without changing anything.
    pub const UNCHANGED: Self = Self {
        success: true,
        changed: false,
        found: true,
    };

    /// Outcome for a call that failed.
    pub const FAILED: Self = Self {
        success: false,
        changed: false,
        found: false,
    };

    /// Classify a controller response.
    ///
    /// Reads: 2xx is found; `404 Not Found` is a successful miss; anything
    /// else failed. Mutations: success needs 2xx, no `ERROR` key in the body
    /// and a message other than `ERROR`.
    pub fn classify(response: &RawResponse) -> Self {
        if response.method == Verb::Get {
            return if response.return_code == 404 && response.message == "Not Found" {
                Self {
                    success: true,
                    changed: false,
                    found: false,
                }
            } else if response.is_2xx() {
                Self::UNCHANGED
            } else {
                Self::FAILED
            };
        }

        let success =
            response.is_2xx() && !response.has_error_body() && response.message != "ERROR";
        Self {
            success,
            changed: success,
            found: success,
        }
    }
}

/// Executes HTTP-shaped operations against a transport.
pub struct Dispatcher<T> {
    transport: T,
    check_mode: bool,
}

impl<T: Transport> Dispatcher<T> {
    pub fn new(transport: T, check_mode: bool) -> Self {
        Self {
            transport,
            check_mode,
        }
    }

    /// Session-wide check-mode default.
    pub fn check_mode(&self) -> bool {
        self.check_mode
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Dispatch one operation.
    ///
    /// `check_mode` is explicit per call: status reads pass `false` so
    /// polling still sees real controller state during a dry run.
    pub async fn commit(
        &self,
        verb: Verb,
        path: &str,
        payload: Option<&Value>,
        check_mode: bool,
    ) -> Result<(RawResponse, OperationResult), CoreError> {
        validate(verb, path, payload)?;

        if check_mode {
            debug!(%verb, path, "check mode: simulating request");
            let response = RawResponse {
                return_code: 200,
                message: "OK".into(),
                method: verb,
                request_path: path.to_owned(),
                data: json!({ "simulated": CHECK_MODE_MESSAGE }),
            };
            let result = OperationResult {
                success: true,
                changed: verb.is_mutation(),
                found: true,
            };
            return Ok((response, result));
        }

        let response = self.transport.send(verb, path, payload).await?;
        let result = OperationResult::classify(&response);
        debug!(
            %verb,
            path,
            code = response.return_code,
            success = result.success,
            "request dispatched"
        );
        Ok((response, result))
    }
}

fn validate(verb: Verb, path: &str, payload: Option<&Value>) -> Result<(), CoreError> {
    if path.trim().is_empty() {
        return Err(CoreError::validation("request path must not be empty"));
    }
    match payload {
        Some(Value::Object(_)) => Ok(()),
        Some(other) => Err(CoreError::validation(format!(
            "{verb} payload must be a JSON object, got {other}"
        ))),
        None if verb.requires_payload() => Err(CoreError::validation(format!(
            "{verb} {path} requires a payload"
        ))),
        None => Ok(()),
    }
}
