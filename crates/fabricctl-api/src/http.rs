// reqwest-backed `Transport`.
//
// Joins controller-relative paths onto the base URL, attaches JSON bodies,
// and hands back the status line and body untouched. Classification of
// success and failure belongs to the dispatcher, not here.

use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, trace};
use url::Url;

use crate::error::Error;
use crate::response::{RawResponse, Verb};
use crate::transport::{Transport, TransportConfig};

/// HTTP transport for a single controller.
#[derive(Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpTransport {
    /// Create a transport from a base URL, optional API key, and TLS settings.
    ///
    /// The API key, when present, is sent as an `Authorization` bearer token
    /// on every request.
    pub fn new(
        base_url: Url,
        api_key: Option<&SecretString>,
        config: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        if let Some(key) = api_key {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", key.expose_secret()))
                .map_err(|e| Error::InvalidCredential(format!("API key is not a valid header: {e}")))?;
            value.set_sensitive(true);
            headers.insert(reqwest::header::AUTHORIZATION, value);
        }
        let http = config.build_client(headers)?;
        Ok(Self { http, base_url })
    }

    /// Create a transport with a pre-built `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Build a full URL for a controller-relative path.
    fn url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

impl Transport for HttpTransport {
    async fn send(
        &self,
        verb: Verb,
        path: &str,
        payload: Option<&Value>,
    ) -> Result<RawResponse, Error> {
        let url = self.url(path)?;
        debug!(%verb, %url, "sending request");

        let mut builder = self.http.request(verb.as_method(), url);
        if let Some(body) = payload {
            builder = builder.json(body);
        }

        let resp = builder.send().await?;
        let status = resp.status();
        let message = status.canonical_reason().unwrap_or("Unknown").to_owned();
        let body = resp.text().await?;
        trace!(status = status.as_u16(), len = body.len(), "response received");

        Ok(RawResponse::from_body(
            status.as_u16(),
            message,
            verb,
            path,
            &body,
        ))
    }
}
