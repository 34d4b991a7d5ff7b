//! # Guardian Crypto
//!
//! Cryptographic primitives a Guardian device uses to answer authentication challenges:
//!
//! - **One-time passwords** - RFC 4226 HOTP and RFC 6238 TOTP over SHA-1/256/512
//! - **Base32** - RFC 4648 decoding of enrollment secrets
//! - **RSA public keys** - DER `RSAPublicKey` decoding and JWK rendering
//! - **Signed tokens** - RS256 compact JWTs signed through an external keystore
//! - **DPoP** - RFC 9449 proof-of-possession tokens with an embedded JWK
//!
//! Everything here is synchronous and operates only on its inputs. The only
//! primitive that may block is [`SigningKey::sign_digest`], which belongs to the
//! keystore.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use guardian_crypto::{DpopProofBuilder, OtpParameters, RsaSigningKey, Totp};
//!
//! # fn example() -> guardian_crypto::Result<()> {
//! let totp = Totp::from_parameters(&OtpParameters::with_defaults("GEZDGNBVGY3TQOJQ"))?;
//! println!("current code: {}", totp.now()?);
//!
//! let key = RsaSigningKey::generate()?;
//! let proof = DpopProofBuilder::new().build_proof_for_key(
//!     "https://tenant.guardian.auth0.com/rich-consents/cns_123",
//!     "GET",
//!     "notification-token",
//!     &key,
//! )?;
//! println!("MFA-DPoP: {proof}");
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

pub use asn1::RsaPublicKeyComponents;
pub use dpop::{access_token_hash, DpopClaims, DpopProof, DpopProofBuilder, DpopProofExt};
pub use errors::*;
pub use jwk::Jwk;
pub use jwt::{Jwt, JwtAlgorithm, JwtHeader, JWT_TYPE};
pub use keys::*;
pub use otp::{Hotp, OtpAlgorithm, OtpParameters, Totp};

pub mod asn1;
pub mod base32;
pub mod dpop;
pub mod errors;
pub mod jwk;
pub mod jwt;
pub mod keys;
pub mod otp;

/// Crypto result type
pub type Result<T> = std::result::Result<T, CryptoError>;

/// Current crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// DPoP JWT header type as defined in RFC 9449
pub const DPOP_JWT_TYPE: &str = "dpop+jwt";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(DPOP_JWT_TYPE, "dpop+jwt");
        assert_eq!(JWT_TYPE, "JWT");
        assert_eq!(otp::DEFAULT_PERIOD, 30);
    }
}
