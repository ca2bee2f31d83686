//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and a stable process exit code.

use miette::Diagnostic;
use thiserror::Error;

use fabricctl_config::ConfigError;
use fabricctl_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
    pub const CONVERGENCE: i32 = 9;
    pub const REJECTED: i32 = 10;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the controller")]
    #[diagnostic(
        code(fabricctl::connection_failed),
        help(
            "Check that the controller is running and reachable.\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed {
        #[source]
        source: fabricctl_api::Error,
    },

    #[error("Controller did not answer in time")]
    #[diagnostic(
        code(fabricctl::request_timeout),
        help("Increase the per-request timeout with --timeout or check controller load.")
    )]
    RequestTimeout {
        #[source]
        source: fabricctl_api::Error,
    },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Controller refused the credentials (HTTP {status})")]
    #[diagnostic(
        code(fabricctl::auth_failed),
        help(
            "Verify the API key for this profile.\n\
             Pass --api-key, set api_key_env in the profile, or store it in the\n\
             system keyring under service 'fabricctl', entry '<profile>/api-key'."
        )
    )]
    AuthFailed { status: u16 },

    // ── Controller ───────────────────────────────────────────────────
    #[error("Controller rejected {method} {path} (HTTP {status}): {message}")]
    #[diagnostic(
        code(fabricctl::rejected),
        help("The full controller response is in the ledger printed above.")
    )]
    Rejected {
        method: String,
        path: String,
        status: u16,
        message: String,
    },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(
        code(fabricctl::not_found),
        help("Run: fabricctl image status to see the switches the controller reports")
    )]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    // ── Waiting ──────────────────────────────────────────────────────
    #[error("Timed out after {seconds}s waiting for {operation}")]
    #[diagnostic(
        code(fabricctl::timeout),
        help(
            "Still pending: {pending}\n\
             Raise --check-timeout, or re-run: switches that already converged are skipped."
        )
    )]
    Timeout {
        operation: String,
        seconds: u64,
        pending: String,
    },

    #[error("{operation} failed on switch {item} (status {status})")]
    #[diagnostic(
        code(fabricctl::convergence_failed),
        help("Inspect the switch on the controller before retrying.\nStill pending: {pending}")
    )]
    ConvergenceFailed {
        operation: String,
        item: String,
        status: String,
        pending: String,
    },

    #[error("Interrupted while waiting for {operation}")]
    #[diagnostic(code(fabricctl::interrupted))]
    Interrupted { operation: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(fabricctl::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(fabricctl::profile_not_found),
        help("Available profiles: {available}\nRun: fabricctl config show")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No controller configured")]
    #[diagnostic(
        code(fabricctl::no_config),
        help(
            "Pass --controller, set FABRICCTL_CONTROLLER, or add a profile to\n\
             {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(fabricctl::config))]
    Config(Box<ConfigError>),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(fabricctl::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Failed to render output: {0}")]
    #[diagnostic(code(fabricctl::render))]
    Render(String),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Timeout { .. } | Self::RequestTimeout { .. } => exit_code::TIMEOUT,
            Self::ConvergenceFailed { .. } => exit_code::CONVERGENCE,
            Self::Interrupted { .. } => exit_code::INTERRUPTED,
            Self::Validation { .. } | Self::NonInteractiveRequiresYes { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

fn join(keys: &std::collections::BTreeSet<String>) -> String {
    if keys.is_empty() {
        return "-".into();
    }
    keys.iter().cloned().collect::<Vec<_>>().join(", ")
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },

            CoreError::Transport { source } if source.is_timeout() => {
                CliError::RequestTimeout { source }
            }
            CoreError::Transport { source } => CliError::ConnectionFailed { source },

            CoreError::ControllerResponse { response } => match response.return_code {
                status @ (401 | 403) => CliError::AuthFailed { status },
                status => CliError::Rejected {
                    method: response.method.to_string(),
                    path: response.request_path,
                    status,
                    message: response.message,
                },
            },

            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type,
                identifier,
            },

            CoreError::Timeout {
                operation,
                budget_secs,
                todo,
                ..
            } => CliError::Timeout {
                operation,
                seconds: budget_secs,
                pending: join(&todo),
            },

            CoreError::Convergence {
                operation,
                item,
                status,
                todo,
                ..
            } => CliError::ConvergenceFailed {
                operation,
                item,
                status,
                pending: join(&todo),
            },

            CoreError::Cancelled { operation, .. } => CliError::Interrupted { operation },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::Poll(CoreError::Validation { message }) => CliError::Validation {
                field: "poll settings".into(),
                reason: message,
            },
            ConfigError::UnknownProfile { profile } => CliError::ProfileNotFound {
                name: profile,
                available: "(none)".into(),
            },
            other => CliError::Config(Box::new(other)),
        }
    }
}
