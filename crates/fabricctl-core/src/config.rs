// ── Runtime connection configuration ──
//
// These types describe *how* to reach a controller and how long to wait
// on it. They carry credential data and tuning, but never touch disk.
// The CLI constructs a `ControllerConfig` and hands it in.

use std::time::Duration;

use secrecy::SecretString;
use serde_json::Value;
use url::Url;

use crate::error::CoreError;

/// Default seconds between status polls.
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 10;
/// Default total seconds a wait call may spend polling.
pub const DEFAULT_CHECK_TIMEOUT_SECS: u64 = 1800;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed certs). Default for lab controllers.
    #[default]
    DangerAcceptInvalid,
}

/// Polling knobs shared by every wait call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    /// Time between ticks.
    pub interval: Duration,
    /// Total budget for one wait call.
    pub timeout: Duration,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(DEFAULT_CHECK_INTERVAL_SECS),
            timeout: Duration::from_secs(DEFAULT_CHECK_TIMEOUT_SECS),
        }
    }
}

impl PollSettings {
    pub fn from_secs(interval: u64, timeout: u64) -> Self {
        Self {
            interval: Duration::from_secs(interval),
            timeout: Duration::from_secs(timeout),
        }
    }

    /// Build settings from loosely-typed configuration values.
    ///
    /// Absent values fall back to the defaults. Present values must be
    /// non-negative integers; booleans are rejected explicitly even though
    /// some config sources coerce them to 0/1.
    pub fn from_values(
        check_interval: Option<&Value>,
        check_timeout: Option<&Value>,
    ) -> Result<Self, CoreError> {
        let interval = match check_interval {
            Some(v) => knob_secs("check_interval", v)?,
            None => DEFAULT_CHECK_INTERVAL_SECS,
        };
        let timeout = match check_timeout {
            Some(v) => knob_secs("check_timeout", v)?,
            None => DEFAULT_CHECK_TIMEOUT_SECS,
        };
        Ok(Self::from_secs(interval, timeout))
    }
}

fn knob_secs(name: &str, value: &Value) -> Result<u64, CoreError> {
    match value {
        Value::Bool(b) => Err(CoreError::validation(format!(
            "{name} must be a non-negative integer, got boolean {b}"
        ))),
        Value::Number(n) => n.as_u64().ok_or_else(|| {
            CoreError::validation(format!(
                "{name} must be a non-negative integer, got {n}"
            ))
        }),
        other => Err(CoreError::validation(format!(
            "{name} must be a non-negative integer, got {other}"
        ))),
    }
}

/// Configuration for talking to a single controller.
///
/// Built by the CLI, passed to [`Session::connect`](crate::Session::connect).
/// Core never reads config files.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    /// Controller URL (e.g., `https://10.1.1.1`).
    pub url: Url,
    /// API key, sent as a bearer token when present.
    pub api_key: Option<SecretString>,
    /// TLS verification strategy.
    pub tls: TlsVerification,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Simulate mutations instead of sending them.
    pub check_mode: bool,
    /// Wait-call polling knobs.
    pub poll: PollSettings,
}
