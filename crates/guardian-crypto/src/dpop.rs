//! DPoP proof construction (RFC 9449)
//!
//! A proof binds one HTTP request (method and URI) and one access token to the key
//! the device holds. The verifying key travels inside the proof header, so the
//! server needs no prior registration of it. Proofs are single use: every call
//! draws a fresh `jti` and carries the current `iat`, and there is no `exp`.

use std::time::{SystemTime, UNIX_EPOCH};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{
    errors::CryptoError,
    jwk::Jwk,
    jwt::{Jwt, JwtHeader},
    keys::{RsaVerificationKey, SigningKey},
    Result, DPOP_JWT_TYPE,
};

/// DPoP claim set
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DpopClaims {
    /// HTTP URI the proof is bound to
    pub htu: String,

    /// HTTP method the proof is bound to
    pub htm: String,

    /// base64url(SHA-256(access token))
    pub ath: String,

    /// Unique proof identifier
    pub jti: String,

    /// Issued-at, seconds since the Unix epoch
    pub iat: i64,
}

/// A signed DPoP proof
pub type DpopProof = Jwt<DpopClaims>;

/// Builds DPoP proofs with a device signing key
#[derive(Debug, Clone, Copy, Default)]
pub struct DpopProofBuilder;

impl DpopProofBuilder {
    /// Create a new proof builder
    pub fn new() -> Self {
        Self
    }

    /// Build a proof for `method url`, bound to `access_token`
    ///
    /// `public_jwk` is embedded in the header and must be the public half of `signer`.
    pub fn build_proof(
        &self,
        url: &str,
        method: &str,
        access_token: &str,
        signer: &dyn SigningKey,
        public_jwk: Jwk,
    ) -> Result<DpopProof> {
        validate_inputs(method, url)?;

        let claims = DpopClaims {
            htu: url.to_string(),
            htm: method.to_uppercase(),
            ath: access_token_hash(access_token),
            jti: Uuid::new_v4().to_string(),
            iat: unix_now()?,
        };
        let jti = claims.jti.clone();

        let header = JwtHeader::with_embedded_key(DPOP_JWT_TYPE, public_jwk);
        let proof = Jwt::sign(header, claims, signer)?;

        tracing::debug!(method = %method, uri = %url, jti = %jti, "Generated DPoP proof");

        Ok(proof)
    }

    /// Build a proof, deriving the embedded JWK from the signer's exported public key
    ///
    /// A public key that cannot be decoded fails here, before anything is signed.
    pub fn build_proof_for_key(
        &self,
        url: &str,
        method: &str,
        access_token: &str,
        signer: &dyn SigningKey,
    ) -> Result<DpopProof> {
        let jwk = signer.public_jwk()?;
        self.build_proof(url, method, access_token, signer, jwk)
    }
}

/// Checks a received proof against the request it accompanies
pub trait DpopProofExt {
    /// Verify the signature with the key embedded in the header
    fn verify_embedded_key(&self) -> bool;

    /// Check the method, URI and access-token binding
    fn is_bound_to(&self, method: &str, url: &str, access_token: &str) -> bool;
}

impl DpopProofExt for DpopProof {
    fn verify_embedded_key(&self) -> bool {
        if self.header().typ != DPOP_JWT_TYPE {
            return false;
        }
        match self.header().jwk.as_ref().map(RsaVerificationKey::from_jwk) {
            Some(Ok(key)) => self.verify(&key),
            _ => false,
        }
    }

    fn is_bound_to(&self, method: &str, url: &str, access_token: &str) -> bool {
        let claims = self.claims();
        claims.htm.eq_ignore_ascii_case(method)
            && claims.htu == url
            && claims.ath == access_token_hash(access_token)
    }
}

/// base64url(SHA-256(token)) as carried in the `ath` claim
pub fn access_token_hash(access_token: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(access_token.as_bytes()))
}

fn validate_inputs(method: &str, uri: &str) -> Result<()> {
    if !is_valid_http_method(method) {
        return Err(CryptoError::MalformedToken {
            reason: format!("Invalid HTTP method: {method}"),
        });
    }

    if !(uri.starts_with("https://") || uri.starts_with("http://")) {
        return Err(CryptoError::MalformedToken {
            reason: format!("Invalid HTTP URI: {uri}"),
        });
    }

    Ok(())
}

fn is_valid_http_method(method: &str) -> bool {
    matches!(
        method.to_uppercase().as_str(),
        "GET" | "POST" | "PUT" | "DELETE" | "PATCH" | "HEAD" | "OPTIONS"
    )
}

fn unix_now() -> Result<i64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .map_err(|_| CryptoError::SignFailed {
            reason: "System clock before Unix epoch".to_string(),
        })
}
