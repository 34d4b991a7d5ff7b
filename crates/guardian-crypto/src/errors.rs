//! Cryptographic error types
//!
//! Every primitive in this crate fails with a [`CryptoError`]. The variants map onto
//! the local failure classes a caller has to distinguish: a bad OTP secret, unusable
//! key material, a signing failure inside the keystore, or a token that could not be
//! parsed. None of them is ever the result of a network exchange.

use thiserror::Error;

/// Local cryptographic failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// OTP secret could not be decoded or is empty
    #[error("Invalid OTP secret: {reason}")]
    InvalidSecret {
        /// Detailed reason for the rejection
        reason: String,
    },

    /// Key material is malformed or of the wrong kind
    #[error("Invalid key: {reason}")]
    InvalidKey {
        /// Detailed reason for the rejection
        reason: String,
    },

    /// The signing primitive refused or failed to produce a signature
    #[error("Signing failed: {reason}")]
    SignFailed {
        /// Detailed reason for the signing failure
        reason: String,
    },

    /// The verification primitive could not run at all
    ///
    /// A signature that simply does not match is reported as `false` by
    /// [`crate::Jwt::verify`], never as this error.
    #[error("Verification failed: {reason}")]
    VerifyFailed {
        /// Detailed reason for the verification failure
        reason: String,
    },

    /// Algorithm name is not one this crate implements
    #[error("Unsupported algorithm: {name}")]
    UnsupportedAlgorithm {
        /// The rejected algorithm name
        name: String,
    },

    /// Compact token is not three well formed segments
    #[error("Malformed token: {reason}")]
    MalformedToken {
        /// Detailed reason for the parse failure
        reason: String,
    },

    /// JSON serialization of a header or claim set failed
    #[error("Serialization error: {reason}")]
    SerializationError {
        /// Detailed reason for the serialization failure
        reason: String,
    },

    /// Key storage backend failed
    #[error("Key storage error: {reason}")]
    KeyStorageError {
        /// Detailed reason for the storage failure
        reason: String,
    },
}

impl CryptoError {
    /// Check if this error is caused by the caller's input rather than the keystore
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSecret { .. }
                | Self::InvalidKey { .. }
                | Self::UnsupportedAlgorithm { .. }
                | Self::MalformedToken { .. }
        )
    }
}

impl From<serde_json::Error> for CryptoError {
    fn from(err: serde_json::Error) -> Self {
        Self::SerializationError {
            reason: err.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors() {
        let secret = CryptoError::InvalidSecret {
            reason: "bad character".to_string(),
        };
        assert!(secret.is_input_error());

        let sign = CryptoError::SignFailed {
            reason: "keystore locked".to_string(),
        };
        assert!(!sign.is_input_error());
    }

    #[test]
    fn test_error_display() {
        let err = CryptoError::UnsupportedAlgorithm {
            name: "md5".to_string(),
        };
        assert_eq!(err.to_string(), "Unsupported algorithm: md5");
    }
}
