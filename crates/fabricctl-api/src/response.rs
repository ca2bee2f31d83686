// ── Request verbs and raw controller responses ──
//
// `RawResponse` keeps the controller's upper-case field names on the wire
// so ledger output matches what operators see in controller logs.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use strum::{Display, EnumString};

/// HTTP verb accepted by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
pub enum Verb {
    Get,
    Post,
    Put,
    Delete,
}

impl Verb {
    /// Whether this verb mutates controller state.
    pub fn is_mutation(self) -> bool {
        !matches!(self, Self::Get)
    }

    /// Whether a JSON payload is mandatory for this verb.
    pub fn requires_payload(self) -> bool {
        matches!(self, Self::Post | Self::Put)
    }

    pub(crate) fn as_method(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

/// One controller response, exactly as the transport saw it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawResponse {
    #[serde(rename = "RETURN_CODE")]
    pub return_code: u16,
    #[serde(rename = "MESSAGE")]
    pub message: String,
    #[serde(rename = "METHOD")]
    pub method: Verb,
    #[serde(rename = "REQUEST_PATH")]
    pub request_path: String,
    #[serde(rename = "DATA")]
    pub data: Value,
}

impl RawResponse {
    /// Build a response from a status code and raw body text.
    ///
    /// Empty bodies become `{}`; bodies that do not parse as JSON become
    /// `{"INVALID_JSON": <text>}`.
    pub fn from_body(
        return_code: u16,
        message: impl Into<String>,
        method: Verb,
        request_path: impl Into<String>,
        body: &str,
    ) -> Self {
        let data = if body.trim().is_empty() {
            Value::Object(Map::new())
        } else {
            serde_json::from_str(body).unwrap_or_else(|_| json!({ "INVALID_JSON": body }))
        };
        Self {
            return_code,
            message: message.into(),
            method,
            request_path: request_path.into(),
            data,
        }
    }

    /// `true` for any 2xx status.
    pub fn is_2xx(&self) -> bool {
        (200..300).contains(&self.return_code)
    }

    /// `true` if the controller embedded an `ERROR` key in the body.
    pub fn has_error_body(&self) -> bool {
        self.data.get("ERROR").is_some()
    }
}
