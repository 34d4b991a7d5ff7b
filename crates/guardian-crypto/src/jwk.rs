//! JSON Web Key representation of RSA public keys

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::{asn1::RsaPublicKeyComponents, errors::CryptoError, jwt::JwtAlgorithm, Result};

/// RSA public key in JWK form (RFC 7517)
///
/// Field order matches the serialized form embedded in DPoP headers:
/// `kty`, `use`, `alg`, `n`, `e`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key type, always `RSA`
    pub kty: String,

    /// Key usage, always `sig`
    #[serde(rename = "use")]
    pub use_: String,

    /// Intended signing algorithm
    pub alg: JwtAlgorithm,

    /// RSA modulus (base64url, unpadded)
    pub n: String,

    /// RSA public exponent (base64url, unpadded)
    pub e: String,
}

impl Jwk {
    /// Build an RS256 signing JWK from raw big-endian modulus and exponent
    pub fn rsa_signing_key(modulus: &[u8], exponent: &[u8]) -> Self {
        Self {
            kty: "RSA".to_string(),
            use_: "sig".to_string(),
            alg: JwtAlgorithm::RS256,
            n: URL_SAFE_NO_PAD.encode(modulus),
            e: URL_SAFE_NO_PAD.encode(exponent),
        }
    }

    /// Build a JWK from a DER `RSAPublicKey`
    pub fn from_rsa_public_key_der(der: &[u8]) -> Result<Self> {
        Ok(RsaPublicKeyComponents::from_der(der)?.to_jwk())
    }

    /// Decode the modulus and exponent back into raw bytes
    pub fn components(&self) -> Result<RsaPublicKeyComponents> {
        if self.kty != "RSA" {
            return Err(CryptoError::InvalidKey {
                reason: format!("Unsupported key type: {}", self.kty),
            });
        }

        let modulus = URL_SAFE_NO_PAD
            .decode(&self.n)
            .map_err(|e| CryptoError::InvalidKey {
                reason: format!("Invalid RSA modulus encoding: {e}"),
            })?;
        let exponent = URL_SAFE_NO_PAD
            .decode(&self.e)
            .map_err(|e| CryptoError::InvalidKey {
                reason: format!("Invalid RSA exponent encoding: {e}"),
            })?;

        Ok(RsaPublicKeyComponents { modulus, exponent })
    }

    /// JWK thumbprint as defined in RFC 7638
    pub fn thumbprint(&self) -> Result<String> {
        // Required members only, in lexicographic order
        let canonical = serde_json::json!({
            "e": self.e,
            "kty": self.kty,
            "n": self.n,
        });
        let canonical_json = serde_json::to_string(&canonical)?;

        Ok(URL_SAFE_NO_PAD.encode(Sha256::digest(canonical_json.as_bytes())))
    }
}
