use thiserror::Error;

/// Top-level error type for the `fabricctl-api` crate.
///
/// Only covers failures where no controller response exists. A reachable
/// controller answering with a non-2xx status is NOT an error at this
/// layer; it comes back as a [`RawResponse`](crate::RawResponse) for the
/// dispatcher to classify.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// Credential could not be encoded as a request header.
    #[error("Invalid credential: {0}")]
    InvalidCredential(String),
}

impl Error {
    /// Returns `true` if the request timed out in flight.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Transport(e) if e.is_timeout())
    }
}
