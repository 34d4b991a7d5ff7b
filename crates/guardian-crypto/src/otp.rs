//! HOTP (RFC 4226) and TOTP (RFC 6238) code generation
//!
//! Codes are computed with `ring`'s HMAC implementation. The secret is decoded from
//! Base32 once, when the generator is built, so a malformed secret is reported before
//! any HMAC work happens.

use std::fmt;
use std::str::FromStr;
use std::time::{SystemTime, UNIX_EPOCH};

use ring::hmac;
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

use crate::{base32, errors::CryptoError, Result};

/// Default number of digits in a Guardian code
pub const DEFAULT_DIGITS: u8 = 6;

/// Default TOTP period in seconds
pub const DEFAULT_PERIOD: u32 = 30;

/// Largest supported code width; 10^10 still fits the truncated 31-bit value range
pub const MAX_DIGITS: u8 = 10;

/// HMAC algorithm backing an OTP generator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OtpAlgorithm {
    /// HMAC-SHA1, the RFC 4226 default
    #[default]
    Sha1,
    /// HMAC-SHA256
    Sha256,
    /// HMAC-SHA512
    Sha512,
}

impl OtpAlgorithm {
    /// Algorithm name as it appears in enrollment payloads
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sha1 => "sha1",
            Self::Sha256 => "sha256",
            Self::Sha512 => "sha512",
        }
    }

    fn hmac_algorithm(self) -> hmac::Algorithm {
        match self {
            Self::Sha1 => hmac::HMAC_SHA1_FOR_LEGACY_USE_ONLY,
            Self::Sha256 => hmac::HMAC_SHA256,
            Self::Sha512 => hmac::HMAC_SHA512,
        }
    }
}

impl fmt::Display for OtpAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OtpAlgorithm {
    type Err = CryptoError;

    fn from_str(name: &str) -> Result<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sha1" => Ok(Self::Sha1),
            "sha256" => Ok(Self::Sha256),
            "sha512" => Ok(Self::Sha512),
            _ => Err(CryptoError::UnsupportedAlgorithm {
                name: name.to_string(),
            }),
        }
    }
}

/// OTP parameters of an enrollment
///
/// Immutable once built; [`OtpParameters::new`] rejects digit counts outside
/// `1..=10` and a zero period.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpParameters {
    base32_secret: String,
    algorithm: OtpAlgorithm,
    digits: u8,
    period: u32,
}

impl OtpParameters {
    /// Create validated OTP parameters
    pub fn new(
        base32_secret: impl Into<String>,
        algorithm: OtpAlgorithm,
        digits: u8,
        period: u32,
    ) -> Result<Self> {
        validate_digits(digits)?;
        if period == 0 {
            return Err(CryptoError::InvalidSecret {
                reason: "TOTP period must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            base32_secret: base32_secret.into(),
            algorithm,
            digits,
            period,
        })
    }

    /// Parameters with the Guardian defaults: SHA-1, 6 digits, 30 seconds
    pub fn with_defaults(base32_secret: impl Into<String>) -> Self {
        Self {
            base32_secret: base32_secret.into(),
            algorithm: OtpAlgorithm::Sha1,
            digits: DEFAULT_DIGITS,
            period: DEFAULT_PERIOD,
        }
    }

    /// Base32-encoded shared secret
    pub fn base32_secret(&self) -> &str {
        &self.base32_secret
    }

    /// HMAC algorithm
    pub fn algorithm(&self) -> OtpAlgorithm {
        self.algorithm
    }

    /// Code width
    pub fn digits(&self) -> u8 {
        self.digits
    }

    /// TOTP step in seconds
    pub fn period(&self) -> u32 {
        self.period
    }
}

impl fmt::Debug for OtpParameters {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpParameters")
            .field("base32_secret", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("digits", &self.digits)
            .field("period", &self.period)
            .finish()
    }
}

/// Counter-based one-time password generator
pub struct Hotp {
    key: hmac::Key,
    algorithm: OtpAlgorithm,
    digits: u8,
}

impl Hotp {
    /// Create a generator over a raw secret
    pub fn new(secret: &[u8], algorithm: OtpAlgorithm, digits: u8) -> Result<Self> {
        validate_digits(digits)?;
        if secret.is_empty() {
            return Err(CryptoError::InvalidSecret {
                reason: "OTP secret is empty".to_string(),
            });
        }

        Ok(Self {
            key: hmac::Key::new(algorithm.hmac_algorithm(), secret),
            algorithm,
            digits,
        })
    }

    /// Create a generator over a Base32-encoded secret
    pub fn from_base32(secret: &str, algorithm: OtpAlgorithm, digits: u8) -> Result<Self> {
        let raw = Zeroizing::new(base32::decode(secret)?);
        Self::new(&raw, algorithm, digits)
    }

    /// Generate the code for `counter`
    pub fn generate(&self, counter: u64) -> String {
        let tag = hmac::sign(&self.key, &counter.to_be_bytes());
        let digest = tag.as_ref();

        let offset = (digest[digest.len() - 1] & 0x0f) as usize;
        let truncated = u32::from_be_bytes([
            digest[offset],
            digest[offset + 1],
            digest[offset + 2],
            digest[offset + 3],
        ]) & 0x7fff_ffff;

        let code = u64::from(truncated) % 10u64.pow(u32::from(self.digits));
        format!("{:0width$}", code, width = usize::from(self.digits))
    }

    /// Code width
    pub fn digits(&self) -> u8 {
        self.digits
    }

    /// HMAC algorithm
    pub fn algorithm(&self) -> OtpAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for Hotp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hotp")
            .field("key", &"<redacted>")
            .field("algorithm", &self.algorithm)
            .field("digits", &self.digits)
            .finish()
    }
}

/// Time-based one-time password generator
#[derive(Debug)]
pub struct Totp {
    hotp: Hotp,
    period: u32,
}

impl Totp {
    /// Create a generator over a raw secret
    pub fn new(secret: &[u8], algorithm: OtpAlgorithm, digits: u8, period: u32) -> Result<Self> {
        if period == 0 {
            return Err(CryptoError::InvalidSecret {
                reason: "TOTP period must be greater than zero".to_string(),
            });
        }

        Ok(Self {
            hotp: Hotp::new(secret, algorithm, digits)?,
            period,
        })
    }

    /// Create a generator from enrollment parameters
    pub fn from_parameters(parameters: &OtpParameters) -> Result<Self> {
        let raw = Zeroizing::new(base32::decode(parameters.base32_secret())?);
        Self::new(
            &raw,
            parameters.algorithm(),
            parameters.digits(),
            parameters.period(),
        )
    }

    /// Code for the step containing `unix_seconds`
    pub fn code_at(&self, unix_seconds: u64) -> String {
        self.hotp.generate(self.counter_at(unix_seconds))
    }

    /// Code for the current wall-clock time
    pub fn now(&self) -> Result<String> {
        Ok(self.code_at(unix_now()?))
    }

    /// Step counter for `unix_seconds`
    pub fn counter_at(&self, unix_seconds: u64) -> u64 {
        unix_seconds / u64::from(self.period)
    }

    /// Seconds until the code produced at `unix_seconds` rolls over
    pub fn seconds_remaining(&self, unix_seconds: u64) -> u32 {
        let period = u64::from(self.period);
        (period - unix_seconds % period) as u32
    }

    /// TOTP step in seconds
    pub fn period(&self) -> u32 {
        self.period
    }
}

/// Current Unix time in whole seconds
pub(crate) fn unix_now() -> Result<u64> {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs())
        .map_err(|_| CryptoError::InvalidSecret {
            reason: "System clock before Unix epoch".to_string(),
        })
}

fn validate_digits(digits: u8) -> Result<()> {
    if digits == 0 || digits > MAX_DIGITS {
        return Err(CryptoError::InvalidSecret {
            reason: format!("OTP digits must be between 1 and {MAX_DIGITS}, got {digits}"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const RFC4226_SECRET: &[u8] = b"12345678901234567890";

    #[test]
    fn test_rfc4226_vectors() {
        let expected = [
            "755224", "287082", "359152", "969429", "338314", "254676", "287922", "162583",
            "399871", "520489",
        ];
        let hotp = Hotp::new(RFC4226_SECRET, OtpAlgorithm::Sha1, 6).unwrap();

        for (counter, code) in expected.iter().enumerate() {
            assert_eq!(hotp.generate(counter as u64), *code, "counter {counter}");
        }
    }

    #[test]
    fn test_totp_from_base32_parameters() {
        let parameters = OtpParameters::new(
            "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ",
            OtpAlgorithm::Sha1,
            8,
            30,
        )
        .unwrap();
        let totp = Totp::from_parameters(&parameters).unwrap();
        assert_eq!(totp.code_at(59), "94287082");
    }

    #[test]
    fn test_left_padding() {
        let totp = Totp::new(RFC4226_SECRET, OtpAlgorithm::Sha1, 8, 30).unwrap();
        assert_eq!(totp.code_at(1_111_111_109), "07081804");

        let hotp = Hotp::new(RFC4226_SECRET, OtpAlgorithm::Sha1, 10).unwrap();
        for counter in 0..20 {
            assert_eq!(hotp.generate(counter).len(), 10);
        }
    }

    #[test]
    fn test_malformed_secret_rejected() {
        let parameters = OtpParameters::with_defaults("NOT-BASE32!");
        assert!(matches!(
            Totp::from_parameters(&parameters),
            Err(CryptoError::InvalidSecret { .. })
        ));
    }

    #[test]
    fn test_parameter_validation() {
        assert!(OtpParameters::new("GEZDGNBV", OtpAlgorithm::Sha1, 0, 30).is_err());
        assert!(OtpParameters::new("GEZDGNBV", OtpAlgorithm::Sha1, 11, 30).is_err());
        assert!(OtpParameters::new("GEZDGNBV", OtpAlgorithm::Sha1, 6, 0).is_err());
        assert!(OtpParameters::new("GEZDGNBV", OtpAlgorithm::Sha512, 10, 60).is_ok());
    }

    #[test]
    fn test_algorithm_names() {
        assert_eq!("SHA256".parse::<OtpAlgorithm>().unwrap(), OtpAlgorithm::Sha256);
        assert_eq!("sha512".parse::<OtpAlgorithm>().unwrap(), OtpAlgorithm::Sha512);
        assert!(matches!(
            "md5".parse::<OtpAlgorithm>(),
            Err(CryptoError::UnsupportedAlgorithm { .. })
        ));
        assert_eq!(
            serde_json::to_string(&OtpAlgorithm::Sha1).unwrap(),
            "\"sha1\""
        );
    }

    #[test]
    fn test_seconds_remaining() {
        let totp = Totp::new(RFC4226_SECRET, OtpAlgorithm::Sha1, 6, 30).unwrap();
        assert_eq!(totp.seconds_remaining(0), 30);
        assert_eq!(totp.seconds_remaining(59), 1);
        assert_eq!(totp.counter_at(59), 1);
    }
}
