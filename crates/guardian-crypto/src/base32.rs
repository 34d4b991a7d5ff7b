//! RFC 4648 Base32 decoding
//!
//! Guardian OTP secrets are delivered as Base32 text. Only decoding is needed on the
//! device side. Trailing `=` padding is optional; any character outside the RFC 4648
//! alphabet (including lowercase letters and whitespace) is rejected.

use thiserror::Error;

use crate::errors::CryptoError;

/// Quintets per full group; a full group decodes to five bytes
const GROUP_QUINTETS: usize = 8;

/// Base32 decoding failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Base32Error {
    /// Character outside the RFC 4648 alphabet
    #[error("invalid Base32 character {character:?} at position {position}")]
    InvalidCharacter {
        /// The offending character
        character: char,
        /// Character index in the input
        position: usize,
    },

    /// Final group has a quintet count no byte sequence can produce
    #[error("invalid Base32 length: final group has {quintets} quintets")]
    InvalidLength {
        /// Number of quintets in the final partial group
        quintets: usize,
    },
}

impl From<Base32Error> for CryptoError {
    fn from(err: Base32Error) -> Self {
        Self::InvalidSecret {
            reason: err.to_string(),
        }
    }
}

/// Decode RFC 4648 Base32 text into raw bytes
///
/// The empty string decodes to an empty vector. A trailing partial group must hold
/// 2, 4, 5 or 7 quintets (yielding 1, 2, 3 or 4 bytes).
pub fn decode(input: &str) -> Result<Vec<u8>, Base32Error> {
    let trimmed = input.trim_end_matches('=');

    let partial = trimmed.len() % GROUP_QUINTETS;
    if matches!(partial, 1 | 3 | 6) {
        return Err(Base32Error::InvalidLength { quintets: partial });
    }

    let mut output = Vec::with_capacity(trimmed.len() * 5 / 8);
    let mut buffer: u64 = 0;
    let mut bits: u32 = 0;

    for (position, character) in trimmed.chars().enumerate() {
        let value = quintet(character).ok_or(Base32Error::InvalidCharacter {
            character,
            position,
        })?;

        buffer = (buffer << 5) | u64::from(value);
        bits += 5;

        if bits >= 8 {
            bits -= 8;
            output.push((buffer >> bits) as u8);
            buffer &= (1 << bits) - 1;
        }
    }

    Ok(output)
}

/// Map one alphabet character to its 5-bit value
fn quintet(character: char) -> Option<u8> {
    match character {
        'A'..='Z' => Some(character as u8 - b'A'),
        '2'..='7' => Some(character as u8 - b'2' + 26),
        _ => None,
    }
}
