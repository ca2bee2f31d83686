//! Transport boundary for fabric controller REST APIs.
//!
//! Everything above this crate talks to the controller through the
//! [`Transport`] trait: one verb, one path, an optional JSON payload, and a
//! [`RawResponse`] back. [`HttpTransport`] is the reqwest-backed
//! implementation; tests substitute scripted transports.

pub mod error;
pub mod http;
pub mod response;
pub mod transport;

pub use error::Error;
pub use http::HttpTransport;
pub use response::{RawResponse, Verb};
pub use transport::{TlsMode, Transport, TransportConfig};
