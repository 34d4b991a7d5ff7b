//! Network error taxonomy
//!
//! Every outcome of a [`crate::NetworkOperation`] that is not a success is a
//! [`NetworkError`]. Failures that happen before anything is sent (a bad secret, an
//! unencodable body) travel through the same result channel as failures reported by
//! the server, so callers handle both the same way.

use guardian_crypto::CryptoError;
use serde_json::{Map, Value};
use thiserror::Error;

/// Result type for network operations
pub type NetworkResult<T> = std::result::Result<T, NetworkError>;

/// Any failure of a network operation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum NetworkError {
    /// Local cryptographic failure while building the request
    #[error(transparent)]
    Crypto(CryptoError),

    /// The exchange did not follow HTTP or token framing rules
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// No response was obtained
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Server answered with a non-success status
    #[error("{0}")]
    Response(#[from] ResponseError),

    /// Success status, but the body could not be turned into the expected type
    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Server answered with a recognised Guardian error body
    #[error("{0}")]
    Remote(#[from] RemoteError),

    /// Request body could not be encoded
    #[error("Encoding failed: {reason}")]
    Encoding {
        /// Detailed reason for the encoding failure
        reason: String,
    },

    /// Operation could not be set up
    #[error("Configuration error: {reason}")]
    Configuration {
        /// Detailed reason for the configuration failure
        reason: String,
    },
}

impl NetworkError {
    /// Status code of the response that produced this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Response(err) => Some(err.status()),
            Self::Protocol(ProtocolError::InvalidHttpResponse { status }) => Some(*status),
            Self::Remote(err) => err.status,
            _ => None,
        }
    }

    /// Check if the operation failed before any request reached the network
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Self::Crypto(_)
                | Self::Encoding { .. }
                | Self::Configuration { .. }
                | Self::Protocol(ProtocolError::MalformedToken { .. })
        )
    }

    /// Check if a caller-side retry could plausibly succeed
    ///
    /// The pipeline never retries on its own; this is a hint for callers that do.
    pub fn is_retryable_hint(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Response(ResponseError::RateLimited { .. } | ResponseError::ServerError { .. }) => {
                true
            }
            _ => false,
        }
    }

    /// Remote error details, if the server sent a structured error body
    pub fn remote(&self) -> Option<&RemoteError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CryptoError> for NetworkError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::MalformedToken { reason } => {
                Self::Protocol(ProtocolError::MalformedToken { reason })
            }
            other => Self::Crypto(other),
        }
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encoding {
            reason: err.to_string(),
        }
    }
}

/// Framing failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A compact token could not be built or parsed
    #[error("malformed token: {reason}")]
    MalformedToken {
        /// Detailed reason
        reason: String,
    },

    /// The transport produced something that is not an HTTP response
    #[error("invalid HTTP response (status {status})")]
    InvalidHttpResponse {
        /// The unusable status value
        status: u16,
    },
}

/// Failures where no response was obtained
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// Could not connect to the server
    #[error("no connection: {reason}")]
    NoConnection {
        /// Detailed reason
        reason: String,
    },

    /// Connected, but the response never arrived intact
    #[error("no response: {reason}")]
    NoResponse {
        /// Detailed reason
        reason: String,
    },

    /// The configured timeout elapsed
    #[error("request timed out")]
    Timeout,
}

/// Non-success HTTP status classification
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResponseError {
    /// 400
    #[error("Bad request ({status}){}", suffix(.message))]
    BadRequest {
        /// Response status
        status: u16,
        /// `text/plain` body, if any
        message: Option<String>,
    },

    /// 401 or 403
    #[error("Not authorized ({status}){}", suffix(.message))]
    NotAuthorized {
        /// Response status
        status: u16,
        /// `text/plain` body, if any
        message: Option<String>,
    },

    /// 404
    #[error("Not found ({status}){}", suffix(.message))]
    NotFound {
        /// Response status
        status: u16,
        /// `text/plain` body, if any
        message: Option<String>,
    },

    /// 429
    #[error("Rate limited ({status}){}", suffix(.message))]
    RateLimited {
        /// Response status
        status: u16,
        /// `text/plain` body, if any
        message: Option<String>,
    },

    /// 500-599
    #[error("Server error ({status}){}", suffix(.message))]
    ServerError {
        /// Response status
        status: u16,
        /// `text/plain` body, if any
        message: Option<String>,
    },

    /// Any other non-success status
    #[error("Request failed ({status}){}", suffix(.message))]
    GenericFailure {
        /// Response status
        status: u16,
        /// `text/plain` body, if any
        message: Option<String>,
    },
}

impl ResponseError {
    /// Classify a non-success status
    pub fn from_status(status: u16, message: Option<String>) -> Self {
        match status {
            400 => Self::BadRequest { status, message },
            401 | 403 => Self::NotAuthorized { status, message },
            404 => Self::NotFound { status, message },
            429 => Self::RateLimited { status, message },
            500..=599 => Self::ServerError { status, message },
            _ => Self::GenericFailure { status, message },
        }
    }

    /// Response status
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest { status, .. }
            | Self::NotAuthorized { status, .. }
            | Self::NotFound { status, .. }
            | Self::RateLimited { status, .. }
            | Self::ServerError { status, .. }
            | Self::GenericFailure { status, .. } => *status,
        }
    }

    /// Plain-text message sent by the server
    pub fn message(&self) -> Option<&str> {
        match self {
            Self::BadRequest { message, .. }
            | Self::NotAuthorized { message, .. }
            | Self::NotFound { message, .. }
            | Self::RateLimited { message, .. }
            | Self::ServerError { message, .. }
            | Self::GenericFailure { message, .. } => message.as_deref(),
        }
    }
}

fn suffix(message: &Option<String>) -> String {
    message
        .as_ref()
        .map(|text| format!(": {text}"))
        .unwrap_or_default()
}

/// Success responses whose body is unusable
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// A body was expected but the response had none
    #[error("response has no body")]
    MissingBody,

    /// Body is not JSON, or does not decode as the expected type
    #[error("invalid response: {cause}")]
    InvalidResponse {
        /// Underlying cause
        cause: String,
    },

    /// The response is well formed but not the shape the caller asked for
    #[error("schema mismatch: {reason}")]
    SchemaMismatch {
        /// Detailed reason
        reason: String,
    },
}

/// Structured error body returned by the Guardian API
///
/// ```json
/// {"errorCode": "invalid_token", "description": "token expired", "retry": false}
/// ```
///
/// `errorCode` is required. Extra scalar fields are kept in `info`; arrays, objects
/// and nulls are dropped.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Guardian error {code}{}", suffix(.description))]
pub struct RemoteError {
    /// Machine-readable error code
    pub code: String,

    /// Human-readable description
    pub description: Option<String>,

    /// Remaining scalar fields of the body
    pub info: Map<String, Value>,

    /// Status of the response carrying the body
    pub status: Option<u16>,
}

impl RemoteError {
    const CODE_KEY: &'static str = "errorCode";
    const DESCRIPTION_KEY: &'static str = "description";

    /// Parse an error body, returning `None` when it is not a Guardian error
    pub fn from_body(body: &[u8]) -> Option<Self> {
        let Value::Object(mut object) = serde_json::from_slice::<Value>(body).ok()? else {
            return None;
        };

        let code = match object.remove(Self::CODE_KEY)? {
            Value::String(code) => code,
            _ => return None,
        };
        let description = match object.remove(Self::DESCRIPTION_KEY) {
            Some(Value::String(description)) => Some(description),
            _ => None,
        };

        let info = object
            .into_iter()
            .filter(|(_, value)| matches!(value, Value::String(_) | Value::Bool(_) | Value::Number(_)))
            .collect();

        Some(Self {
            code,
            description,
            info,
            status: None,
        })
    }

    /// Attach the response status
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}
