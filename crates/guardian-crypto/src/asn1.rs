//! DER decoding of PKCS#1 `RSAPublicKey` structures
//!
//! ```text
//! RSAPublicKey ::= SEQUENCE {
//!     modulus           INTEGER,  -- n
//!     publicExponent    INTEGER   -- e
//! }
//! ```
//!
//! This is the bare PKCS#1 form a keystore exports, not a SubjectPublicKeyInfo
//! wrapper. Only the subset of DER needed for it is understood.

use crate::{errors::CryptoError, jwk::Jwk, Result};

const TAG_SEQUENCE: u8 = 0x30;
const TAG_INTEGER: u8 = 0x02;

/// Long-form lengths wider than this are not plausible for RSA keys
const MAX_LENGTH_OCTETS: usize = 4;

/// Modulus and public exponent of an RSA public key, big-endian and unsigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKeyComponents {
    /// RSA modulus (n)
    pub modulus: Vec<u8>,
    /// RSA public exponent (e)
    pub exponent: Vec<u8>,
}

impl RsaPublicKeyComponents {
    /// Decode a DER `RSAPublicKey`
    pub fn from_der(der: &[u8]) -> Result<Self> {
        let mut reader = DerReader::new(der);

        let sequence_len = reader.expect_header(TAG_SEQUENCE, "SEQUENCE")?;
        if reader.remaining() != sequence_len {
            return Err(corrupt(format!(
                "SEQUENCE declares {sequence_len} bytes but {} follow",
                reader.remaining()
            )));
        }

        let modulus = reader.read_integer("modulus")?;
        let exponent = reader.read_integer("exponent")?;

        if reader.remaining() != 0 {
            return Err(corrupt(format!(
                "{} unexpected bytes after publicExponent",
                reader.remaining()
            )));
        }

        Ok(Self {
            modulus: modulus.to_vec(),
            exponent: exponent.to_vec(),
        })
    }

    /// Render as a signing JWK (`kty=RSA`, `use=sig`, `alg=RS256`)
    pub fn to_jwk(&self) -> Jwk {
        Jwk::rsa_signing_key(&self.modulus, &self.exponent)
    }
}

/// Cursor over DER input
struct DerReader<'a> {
    input: &'a [u8],
    position: usize,
}

impl<'a> DerReader<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, position: 0 }
    }

    fn remaining(&self) -> usize {
        self.input.len() - self.position
    }

    fn read_byte(&mut self) -> Result<u8> {
        let byte = *self
            .input
            .get(self.position)
            .ok_or_else(|| corrupt("unexpected end of input".to_string()))?;
        self.position += 1;
        Ok(byte)
    }

    fn read_slice(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.remaining() {
            return Err(corrupt(format!(
                "value of {len} bytes exceeds the {} remaining",
                self.remaining()
            )));
        }
        let slice = &self.input[self.position..self.position + len];
        self.position += len;
        Ok(slice)
    }

    /// Read a tag and length; returns the content length
    fn expect_header(&mut self, tag: u8, name: &str) -> Result<usize> {
        let found = self.read_byte()?;
        if found != tag {
            return Err(corrupt(format!(
                "expected {name} tag 0x{tag:02x}, found 0x{found:02x}"
            )));
        }
        self.read_length()
    }

    fn read_length(&mut self) -> Result<usize> {
        let first = self.read_byte()?;
        if first < 0x80 {
            return Ok(usize::from(first));
        }

        let octets = usize::from(first & 0x7f);
        if octets == 0 || octets > MAX_LENGTH_OCTETS {
            return Err(corrupt(format!("unsupported length encoding 0x{first:02x}")));
        }

        let mut length = 0usize;
        for _ in 0..octets {
            length = (length << 8) | usize::from(self.read_byte()?);
        }
        Ok(length)
    }

    /// Read an INTEGER, dropping a single leading sign byte
    fn read_integer(&mut self, name: &str) -> Result<&'a [u8]> {
        let len = self.expect_header(TAG_INTEGER, name)?;
        let value = self.read_slice(len)?;

        match value {
            [] => Err(corrupt(format!("{name} INTEGER is empty"))),
            [0x00, rest @ ..] if !rest.is_empty() => Ok(rest),
            _ => Ok(value),
        }
    }
}

fn corrupt(reason: String) -> CryptoError {
    CryptoError::InvalidKey {
        reason: format!("corrupt RSAPublicKey DER: {reason}"),
    }
}
