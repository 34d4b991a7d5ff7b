//! # Guardian Transport
//!
//! Typed request/result pipeline used by every Guardian API call.
//!
//! - **Pipeline**: [`NetworkOperation`] builds one request, runs it through an
//!   [`HttpTransport`] and classifies the response into a [`NetworkResult`]
//! - **Errors**: [`NetworkError`] covers local failures, transport failures, status
//!   classes, decode failures and structured remote errors in one channel
//! - **Configuration**: [`NetworkConfig`] carries the timeout, telemetry, default
//!   headers and transport explicitly into each operation
//!
//! ## Module Organization
//!
//! ```text
//! guardian-transport/
//! ├── config/      # NetworkConfig and its builder
//! ├── error/       # Error taxonomy and remote error bodies
//! ├── request/     # NetworkOperation and response classification
//! ├── telemetry/   # Auth0-Client header
//! └── transport/   # HttpTransport trait and reqwest implementation
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod request;
pub mod telemetry;
pub mod transport;

pub use config::{DEFAULT_TIMEOUT, NetworkConfig, NetworkConfigBuilder};
pub use error::{
    DecodeError, NetworkError, NetworkResult, ProtocolError, RemoteError, ResponseError,
    TransportError,
};
pub use request::{ErrorMapper, NetworkOperation, Payload, RequestHook, ResponseHook};
pub use telemetry::{TELEMETRY_HEADER, Telemetry};
pub use transport::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};

// HTTP vocabulary used in the public API
pub use reqwest::{Method, header};
pub use url::Url;

/// Current crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
