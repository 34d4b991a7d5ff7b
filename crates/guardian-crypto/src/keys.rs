//! Keystore collaborator interfaces and software RSA keys
//!
//! Signing always goes through [`SigningKey`], so hardware-backed keystores can hold
//! the private key without the rest of the SDK ever seeing key bytes. Implementations
//! may block (for example while waiting for a secure element); callers on an async
//! runtime should invoke them from a blocking-capable context.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use rand::rngs::OsRng;
use rsa::pkcs1::{DecodeRsaPublicKey, EncodeRsaPublicKey};
use rsa::pkcs8::{DecodePrivateKey, EncodePrivateKey};
use rsa::{BigUint, Pkcs1v15Sign, RsaPrivateKey, RsaPublicKey};
use sha2::Sha256;
use zeroize::Zeroizing;

use crate::{errors::CryptoError, jwk::Jwk, jwt::JwtAlgorithm, Result};

/// Default modulus size for generated keys
pub const DEFAULT_RSA_BITS: usize = 2048;

/// Asymmetric signing primitive owned by a keystore
pub trait SigningKey: Send + Sync + fmt::Debug {
    /// Algorithm this key signs with
    fn algorithm(&self) -> JwtAlgorithm {
        JwtAlgorithm::RS256
    }

    /// Sign a SHA-256 digest with RSASSA-PKCS1-v1_5
    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>>;

    /// Export the public half as a DER `RSAPublicKey`
    fn public_key_der(&self) -> Result<Vec<u8>>;

    /// Public half as a signing JWK
    fn public_jwk(&self) -> Result<Jwk> {
        Jwk::from_rsa_public_key_der(&self.public_key_der()?)
    }
}

/// Asymmetric verification primitive
pub trait VerificationKey: Send + Sync + fmt::Debug {
    /// Check an RSASSA-PKCS1-v1_5 signature over a SHA-256 digest
    ///
    /// Any failure, including malformed signatures, is `false`.
    fn verify_digest(&self, digest: &[u8], signature: &[u8]) -> bool;
}

impl<T: SigningKey + ?Sized> SigningKey for Arc<T> {
    fn algorithm(&self) -> JwtAlgorithm {
        (**self).algorithm()
    }

    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>> {
        (**self).sign_digest(digest)
    }

    fn public_key_der(&self) -> Result<Vec<u8>> {
        (**self).public_key_der()
    }
}

/// Software RSA private key
#[derive(Clone)]
pub struct RsaSigningKey {
    key: RsaPrivateKey,
}

impl RsaSigningKey {
    /// Generate a fresh 2048-bit key
    pub fn generate() -> Result<Self> {
        Self::generate_with_bits(DEFAULT_RSA_BITS)
    }

    /// Generate a fresh key with the given modulus size
    pub fn generate_with_bits(bits: usize) -> Result<Self> {
        let key = RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| CryptoError::InvalidKey {
            reason: format!("Failed to generate RSA key: {e}"),
        })?;

        tracing::debug!(bits, "Generated RSA signing key");
        Ok(Self { key })
    }

    /// Load a key from PKCS#8 DER
    pub fn from_pkcs8_der(der: &[u8]) -> Result<Self> {
        let key = RsaPrivateKey::from_pkcs8_der(der).map_err(|e| CryptoError::InvalidKey {
            reason: format!("Invalid RSA private key: {e}"),
        })?;
        Ok(Self { key })
    }

    /// Export the private key as PKCS#8 DER
    pub fn to_pkcs8_der(&self) -> Result<Zeroizing<Vec<u8>>> {
        let document = self.key.to_pkcs8_der().map_err(|e| CryptoError::InvalidKey {
            reason: format!("Failed to encode RSA private key: {e}"),
        })?;
        Ok(Zeroizing::new(document.as_bytes().to_vec()))
    }

    /// Matching verification key
    pub fn verification_key(&self) -> RsaVerificationKey {
        RsaVerificationKey {
            key: self.key.to_public_key(),
        }
    }

    /// Persist the private key under `tag`
    pub fn store(&self, storage: &dyn KeyStorage, tag: &str) -> Result<()> {
        storage.set(tag, self.to_pkcs8_der()?)
    }

    /// Load a private key previously stored under `tag`
    pub fn load(storage: &dyn KeyStorage, tag: &str) -> Result<Option<Self>> {
        storage
            .get(tag)?
            .map(|der| Self::from_pkcs8_der(&der))
            .transpose()
    }
}

impl SigningKey for RsaSigningKey {
    fn sign_digest(&self, digest: &[u8]) -> Result<Vec<u8>> {
        self.key
            .sign(Pkcs1v15Sign::new::<Sha256>(), digest)
            .map_err(|e| CryptoError::SignFailed {
                reason: format!("RSA signing failed: {e}"),
            })
    }

    fn public_key_der(&self) -> Result<Vec<u8>> {
        let document =
            self.key
                .to_public_key()
                .to_pkcs1_der()
                .map_err(|e| CryptoError::InvalidKey {
                    reason: format!("Failed to export RSA public key: {e}"),
                })?;
        Ok(document.as_bytes().to_vec())
    }
}

impl fmt::Debug for RsaSigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RsaSigningKey")
            .field("key", &"<redacted>")
            .finish()
    }
}

/// Software RSA public key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaVerificationKey {
    key: RsaPublicKey,
}

impl RsaVerificationKey {
    /// Load from a DER `RSAPublicKey`
    pub fn from_pkcs1_der(der: &[u8]) -> Result<Self> {
        let key = RsaPublicKey::from_pkcs1_der(der).map_err(|e| CryptoError::InvalidKey {
            reason: format!("Invalid RSA public key: {e}"),
        })?;
        Ok(Self { key })
    }

    /// Rebuild from a JWK's modulus and exponent
    pub fn from_jwk(jwk: &Jwk) -> Result<Self> {
        let components = jwk.components()?;
        let key = RsaPublicKey::new(
            BigUint::from_bytes_be(&components.modulus),
            BigUint::from_bytes_be(&components.exponent),
        )
        .map_err(|e| CryptoError::InvalidKey {
            reason: format!("Invalid RSA public key: {e}"),
        })?;
        Ok(Self { key })
    }
}

impl VerificationKey for RsaVerificationKey {
    fn verify_digest(&self, digest: &[u8], signature: &[u8]) -> bool {
        self.key
            .verify(Pkcs1v15Sign::new::<Sha256>(), digest, signature)
            .is_ok()
    }
}

/// Credential storage addressed by tag, the keychain-equivalent collaborator
pub trait KeyStorage: Send + Sync + fmt::Debug {
    /// Read the item stored under `tag`
    fn get(&self, tag: &str) -> Result<Option<Zeroizing<Vec<u8>>>>;

    /// Store `value` under `tag`, replacing any previous item
    fn set(&self, tag: &str, value: Zeroizing<Vec<u8>>) -> Result<()>;

    /// Remove the item stored under `tag`; returns whether one existed
    fn delete(&self, tag: &str) -> Result<bool>;
}

/// In-memory key storage for development and testing
#[derive(Default)]
pub struct MemoryKeyStorage {
    items: RwLock<HashMap<String, Zeroizing<Vec<u8>>>>,
}

impl MemoryKeyStorage {
    /// Create an empty storage
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored items
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Whether nothing is stored
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl KeyStorage for MemoryKeyStorage {
    fn get(&self, tag: &str) -> Result<Option<Zeroizing<Vec<u8>>>> {
        Ok(self.items.read().get(tag).cloned())
    }

    fn set(&self, tag: &str, value: Zeroizing<Vec<u8>>) -> Result<()> {
        self.items.write().insert(tag.to_string(), value);
        Ok(())
    }

    fn delete(&self, tag: &str) -> Result<bool> {
        Ok(self.items.write().remove(tag).is_some())
    }
}

impl fmt::Debug for MemoryKeyStorage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryKeyStorage")
            .field("items", &self.len())
            .finish()
    }
}
