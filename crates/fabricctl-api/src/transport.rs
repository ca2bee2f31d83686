// Transport trait and shared reqwest client configuration.
//
// The dispatcher only ever sees `Transport::send`. TLS, timeout, and
// default-header settings live in `TransportConfig` so the HTTP client is
// built in exactly one place.

use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::error::Error;
use crate::response::{RawResponse, Verb};

/// Something that can deliver one request to the controller.
///
/// Implementations make exactly one attempt per call. Non-2xx statuses are
/// returned as `Ok(RawResponse)`; `Err` is reserved for failures where the
/// controller never answered.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        verb: Verb,
        path: &str,
        payload: Option<&Value>,
    ) -> impl Future<Output = Result<RawResponse, Error>> + Send;
}

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed controllers).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a `reqwest::Client` with the given default headers.
    pub fn build_client(
        &self,
        headers: reqwest::header::HeaderMap,
    ) -> Result<reqwest::Client, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(concat!("fabricctl/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        builder
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }
}
