//! Enrolled device identity

use std::sync::Arc;

use guardian_crypto::{OtpParameters, SigningKey};

/// How an enrollment proves itself when resolving a transaction
#[derive(Debug, Clone)]
pub enum Credential {
    /// Rolling one-time codes from a shared secret
    Otp(OtpParameters),

    /// Signatures from a key held by the keystore
    Key(Arc<dyn SigningKey>),
}

impl Credential {
    /// Short name for logs
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Otp(_) => "otp",
            Self::Key(_) => "key",
        }
    }
}

/// A device registered as a second factor
///
/// Created once by the enrollment flow and supplied to every call. The signing key
/// is an opaque handle; its bytes stay in the keystore.
#[derive(Debug, Clone)]
pub struct Enrollment {
    id: String,
    user_id: String,
    device_token: String,
    local_identifier: String,
    credential: Credential,
}

impl Enrollment {
    /// Create an enrollment
    pub fn new(
        id: impl Into<String>,
        user_id: impl Into<String>,
        device_token: impl Into<String>,
        local_identifier: impl Into<String>,
        credential: Credential,
    ) -> Self {
        Self {
            id: id.into(),
            user_id: user_id.into(),
            device_token: device_token.into(),
            local_identifier: local_identifier.into(),
            credential,
        }
    }

    /// Enrollment identifier assigned by the server
    pub fn id(&self) -> &str {
        &self.id
    }

    /// User the device is enrolled for
    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    /// Token authorizing device-account updates
    pub fn device_token(&self) -> &str {
        &self.device_token
    }

    /// Device-side identifier, used as the challenge response issuer
    pub fn local_identifier(&self) -> &str {
        &self.local_identifier
    }

    /// Proof material
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    /// Signing key, if this is a key enrollment
    pub fn signing_key(&self) -> Option<&Arc<dyn SigningKey>> {
        match &self.credential {
            Credential::Key(key) => Some(key),
            Credential::Otp(_) => None,
        }
    }
}
