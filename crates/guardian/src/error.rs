//! Guardian error types

use guardian_crypto::CryptoError;
use guardian_transport::NetworkError;
use thiserror::Error;

/// Result type for Guardian operations
pub type GuardianResult<T> = std::result::Result<T, GuardianError>;

/// Errors produced while resolving a Guardian transaction
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GuardianError {
    /// The request failed locally or at any point of the exchange
    #[error(transparent)]
    Network(#[from] NetworkError),

    /// A notification action identifier matched neither accept nor reject
    #[error("Invalid notification action identifier: {identifier}")]
    InvalidNotificationActionIdentifier {
        /// The unrecognised identifier
        identifier: String,
    },

    /// The Guardian base URL is unusable
    #[error("Invalid Guardian URL {url}: {reason}")]
    InvalidUrl {
        /// The rejected URL
        url: String,
        /// Detailed reason
        reason: String,
    },
}

impl GuardianError {
    /// Stable error code for this failure
    ///
    /// Remote errors report the server's `errorCode`; local failures use the
    /// `a0.guardian.internal.` namespace.
    pub fn code(&self) -> String {
        match self {
            Self::Network(NetworkError::Remote(remote)) => remote.code.clone(),
            Self::Network(err) if err.is_local() => internal("failed_before_sending"),
            Self::Network(_) => internal("network_failure"),
            Self::InvalidNotificationActionIdentifier { .. } => {
                internal("invalid_notification_action_identifier")
            }
            Self::InvalidUrl { .. } => internal("invalid_url"),
        }
    }

    /// Check if the failure happened before anything was sent
    pub fn is_local(&self) -> bool {
        match self {
            Self::Network(err) => err.is_local(),
            Self::InvalidNotificationActionIdentifier { .. } | Self::InvalidUrl { .. } => true,
        }
    }

    /// Underlying network error, if any
    pub fn network(&self) -> Option<&NetworkError> {
        match self {
            Self::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl From<CryptoError> for GuardianError {
    fn from(err: CryptoError) -> Self {
        Self::Network(err.into())
    }
}

fn internal(name: &str) -> String {
    format!("a0.guardian.internal.{name}")
}
