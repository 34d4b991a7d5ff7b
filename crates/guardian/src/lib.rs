//! # Guardian
//!
//! Approve or deny Guardian push authentication requests from an enrolled device.
//!
//! A notification names a transaction and a challenge. The [`Authenticator`]
//! answers it with the enrollment's credential:
//!
//! - **OTP enrollments** send the current TOTP code to `api/verify-otp` or
//!   `api/reject-login`
//! - **Key enrollments** sign a short-lived challenge response (RS256) and send it to
//!   `api/resolve-transaction`
//!
//! Consent records for a transaction are fetched with a DPoP proof made by the
//! enrollment key.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use guardian::prelude::*;
//!
//! # async fn example(payload: serde_json::Value) -> GuardianResult<()> {
//! let key = Arc::new(RsaSigningKey::generate()?);
//! let enrollment = Enrollment::new(
//!     "dev_1",
//!     "auth0|user",
//!     "device-token",
//!     "local-device-id",
//!     Credential::Key(key),
//! );
//!
//! let config = GuardianConfig::with_shared_network("https://tenant.guardian.auth0.com")?;
//! let authenticator = Authenticator::new(config);
//!
//! if let Some(notification) = Notification::from_push_payload(&payload) {
//!     authenticator.allow(&notification, &enrollment).await?;
//! }
//! # Ok(())
//! # }
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub,
    clippy::all
)]
#![deny(unsafe_code)]

pub mod api;
pub mod authenticator;
pub mod challenge;
pub mod config;
pub mod consent;
pub mod enrollment;
pub mod error;
pub mod notification;

pub use api::{GuardianApi, map_remote_error};
pub use authenticator::{AuthenticationState, Authenticator, StateObserver};
pub use challenge::{CHALLENGE_RESPONSE_LIFETIME, ChallengeClaims};
pub use config::GuardianConfig;
pub use consent::{RequestedDetails, RichConsent};
pub use enrollment::{Credential, Enrollment};
pub use error::{GuardianError, GuardianResult};
pub use notification::{
    ACCEPT_ACTION, AUTHENTICATION_CATEGORY, Location, Notification, REJECT_ACTION, Source,
    SourceDetail,
};

pub use guardian_crypto as crypto;
pub use guardian_transport as transport;

/// Current crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Commonly used items
pub mod prelude {
    pub use crate::{
        ACCEPT_ACTION, AuthenticationState, Authenticator, Credential, Enrollment,
        GuardianConfig, GuardianError, GuardianResult, Notification, REJECT_ACTION, RichConsent,
    };
    pub use guardian_crypto::{OtpAlgorithm, OtpParameters, RsaSigningKey, SigningKey};
    pub use guardian_transport::{NetworkConfig, NetworkError};
}
