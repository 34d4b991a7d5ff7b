//! Compact signed tokens (JWS compact serialization, RFC 7515)
//!
//! [`Jwt`] is generic over its claim set. Signing goes through a [`SigningKey`], so
//! the private key can live in an external keystore. The signature always covers
//! exactly `base64url(header) "." base64url(claims)` as UTF-8 bytes; a parsed token
//! keeps those raw segments so verification never depends on re-serialization.

use std::fmt;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{
    errors::CryptoError,
    jwk::Jwk,
    keys::{SigningKey, VerificationKey},
    Result,
};

/// Header `typ` of a plain signed token
pub const JWT_TYPE: &str = "JWT";

/// Signature algorithms understood by the token engine
///
/// Only RS256 is implemented. The algorithm travels in every header so new
/// variants can be added without changing the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JwtAlgorithm {
    /// RSASSA-PKCS1-v1_5 with SHA-256 (RFC 7518)
    #[serde(rename = "RS256")]
    RS256,
}

impl JwtAlgorithm {
    /// Algorithm name as specified in RFC 7518
    pub fn as_str(self) -> &'static str {
        match self {
            Self::RS256 => "RS256",
        }
    }

    /// Digest of the signing input under this algorithm's hash
    pub fn digest(self, signing_input: &[u8]) -> Vec<u8> {
        match self {
            Self::RS256 => Sha256::digest(signing_input).to_vec(),
        }
    }
}

impl fmt::Display for JwtAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// JOSE header
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwtHeader {
    /// Signature algorithm
    pub alg: JwtAlgorithm,

    /// Token type
    pub typ: String,

    /// Embedded verification key (proof-of-possession tokens only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jwk: Option<Jwk>,
}

impl JwtHeader {
    /// Header of a plain RS256 token
    pub fn rs256() -> Self {
        Self {
            alg: JwtAlgorithm::RS256,
            typ: JWT_TYPE.to_string(),
            jwk: None,
        }
    }

    /// Header carrying its own verification key
    pub fn with_embedded_key(typ: impl Into<String>, jwk: Jwk) -> Self {
        Self {
            alg: jwk.alg,
            typ: typ.into(),
            jwk: Some(jwk),
        }
    }
}

/// Signed token with typed claims
#[derive(Debug, Clone)]
pub struct Jwt<C> {
    header: JwtHeader,
    claims: C,
    signature: Vec<u8>,
    signing_input: String,
    encoded_signature: String,
}

impl<C: Serialize> Jwt<C> {
    /// Serialize, encode and sign a token
    pub fn sign(header: JwtHeader, claims: C, signer: &dyn SigningKey) -> Result<Self> {
        if header.alg != signer.algorithm() {
            return Err(CryptoError::UnsupportedAlgorithm {
                name: format!(
                    "header declares {} but the key signs with {}",
                    header.alg,
                    signer.algorithm()
                ),
            });
        }

        let header_json =
            serde_json::to_vec(&header).map_err(|e| CryptoError::SerializationError {
                reason: format!("Failed to serialize header: {e}"),
            })?;
        let claims_json =
            serde_json::to_vec(&claims).map_err(|e| CryptoError::SerializationError {
                reason: format!("Failed to serialize claims: {e}"),
            })?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );

        let digest = header.alg.digest(signing_input.as_bytes());
        let signature = signer.sign_digest(&digest)?;
        let encoded_signature = URL_SAFE_NO_PAD.encode(&signature);

        tracing::debug!(alg = %header.alg, typ = %header.typ, "Signed token");

        Ok(Self {
            header,
            claims,
            signature,
            signing_input,
            encoded_signature,
        })
    }
}

impl<C: DeserializeOwned> Jwt<C> {
    /// Parse a compact token without verifying it
    ///
    /// Requires exactly three non-empty base64url segments whose header and claims
    /// decode into the expected shapes.
    pub fn parse(token: &str) -> Result<Self> {
        let segments: Vec<&str> = token.split('.').collect();
        let [header_segment, claims_segment, signature_segment] = segments.as_slice() else {
            return Err(malformed(format!(
                "expected 3 segments, found {}",
                segments.len()
            )));
        };

        if [header_segment, claims_segment, signature_segment]
            .iter()
            .any(|segment| segment.is_empty())
        {
            return Err(malformed("empty segment".to_string()));
        }

        let header_bytes = decode_segment(header_segment, "header")?;
        let claims_bytes = decode_segment(claims_segment, "claims")?;
        let signature = decode_segment(signature_segment, "signature")?;

        let header: JwtHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| malformed(format!("invalid header: {e}")))?;
        let claims: C = serde_json::from_slice(&claims_bytes)
            .map_err(|e| malformed(format!("invalid claims: {e}")))?;

        Ok(Self {
            header,
            claims,
            signature,
            signing_input: format!("{header_segment}.{claims_segment}"),
            encoded_signature: (*signature_segment).to_string(),
        })
    }
}

impl<C> Jwt<C> {
    /// Check the signature against `key`
    ///
    /// Wrong keys and tampered segments yield `false`; this never errors.
    pub fn verify(&self, key: &dyn VerificationKey) -> bool {
        let digest = self.header.alg.digest(self.signing_input.as_bytes());
        key.verify_digest(&digest, &self.signature)
    }

    /// Token header
    pub fn header(&self) -> &JwtHeader {
        &self.header
    }

    /// Token claims
    pub fn claims(&self) -> &C {
        &self.claims
    }

    /// Consume the token, returning its claims
    pub fn into_claims(self) -> C {
        self.claims
    }

    /// Raw signature bytes
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The `header.claims` string the signature covers
    pub fn signing_input(&self) -> &str {
        &self.signing_input
    }

    /// Compact `header.claims.signature` serialization
    pub fn compact(&self) -> String {
        format!("{}.{}", self.signing_input, self.encoded_signature)
    }
}

impl<C> fmt::Display for Jwt<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.signing_input, self.encoded_signature)
    }
}

fn decode_segment(segment: &str, name: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| malformed(format!("invalid {name} encoding: {e}")))
}

fn malformed(reason: String) -> CryptoError {
    CryptoError::MalformedToken { reason }
}
