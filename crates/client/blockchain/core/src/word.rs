//! Ledger field elements.
//!
//! Every value the contract reads or emits travels as a 252-bit field element
//! ("felt"). [`Word`] stores it as 32 big-endian bytes and offers the handful of
//! interpretations the client needs: small unsigned integers, signed integers in
//! either of the two encodings seen on the wire, and Cairo short strings.

use std::fmt;
use std::str::FromStr;

use game_core::Address;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// The field prime `2^251 + 17 * 2^192 + 1`.
pub const FIELD_PRIME: Word = Word([
    0x08, 0, 0, 0, 0, 0, 0, 0x11, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0x01,
]);

/// Longest ASCII string that fits in one field element.
pub const SHORT_STRING_MAX_LEN: usize = 31;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WordError {
    #[error("empty hex string")]
    Empty,

    #[error("hex value has {0} digits, at most 64 allowed")]
    TooLong(usize),

    #[error("invalid hex: {0}")]
    InvalidHex(String),

    #[error("short string longer than {SHORT_STRING_MAX_LEN} bytes: {0}")]
    ShortStringTooLong(usize),

    #[error("short string contains non-ASCII characters")]
    NonAscii,
}

/// A field element in big-endian byte order.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Word([u8; 32]);

impl Word {
    pub const ZERO: Word = Word([0u8; 32]);
    pub const ONE: Word = Word::from_u64(1);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn to_bytes(self) -> [u8; 32] {
        self.0
    }

    pub const fn from_u64(value: u64) -> Self {
        Self::from_u128(value as u128)
    }

    pub const fn from_u128(value: u128) -> Self {
        let low = value.to_be_bytes();
        let mut bytes = [0u8; 32];
        let mut i = 0;
        while i < 16 {
            bytes[16 + i] = low[i];
            i += 1;
        }
        Self(bytes)
    }

    pub fn from_bool(value: bool) -> Self {
        Self::from_u64(u64::from(value))
    }

    /// Encodes a signed value the way the ledger stores negative integers:
    /// `PRIME - |value|` for negatives.
    pub fn from_i64(value: i64) -> Self {
        if value >= 0 {
            Self::from_u64(value.unsigned_abs())
        } else {
            FIELD_PRIME.wrapping_sub(Self::from_u64(value.unsigned_abs()))
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    pub fn to_u128(self) -> Option<u128> {
        let (high, low) = self.0.split_at(16);
        if high.iter().any(|b| *b != 0) {
            return None;
        }
        let mut buf = [0u8; 16];
        buf.copy_from_slice(low);
        Some(u128::from_be_bytes(buf))
    }

    pub fn to_u64(self) -> Option<u64> {
        self.to_u128().and_then(|v| u64::try_from(v).ok())
    }

    pub fn to_u32(self) -> Option<u32> {
        self.to_u128().and_then(|v| u32::try_from(v).ok())
    }

    pub fn to_u8(self) -> Option<u8> {
        self.to_u128().and_then(|v| u8::try_from(v).ok())
    }

    /// `0` is false, `1` is true; anything else is not a boolean.
    pub fn to_bool(self) -> Option<bool> {
        match self.to_u128()? {
            0 => Some(false),
            1 => Some(true),
            _ => None,
        }
    }

    /// Interprets the word as a signed integer of `bits` width (1..=64).
    ///
    /// Two encodings show up in practice and both are accepted:
    /// * field-negative: `PRIME - |v|` (what the contract stores for `i32`)
    /// * two's complement over the declared width: `2^bits - |v|`
    ///
    /// Returns `None` when the value fits neither encoding.
    pub fn to_signed(self, bits: u32) -> Option<i64> {
        if bits == 0 || bits > 64 {
            return None;
        }
        let half = 1u128 << (bits - 1);
        let full = 1u128 << bits;

        if let Some(raw) = self.to_u128() {
            return if raw < half {
                i64::try_from(raw).ok()
            } else if raw < full {
                i64::try_from(raw as i128 - full as i128).ok()
            } else {
                None
            };
        }

        if self >= FIELD_PRIME {
            return None;
        }
        let magnitude = FIELD_PRIME.wrapping_sub(self).to_u128()?;
        if magnitude <= half {
            i64::try_from(-(magnitude as i128)).ok()
        } else {
            None
        }
    }

    /// Packs up to 31 ASCII bytes big-endian into one word.
    pub fn from_short_string(text: &str) -> Result<Self, WordError> {
        if !text.is_ascii() {
            return Err(WordError::NonAscii);
        }
        let bytes = text.as_bytes();
        if bytes.len() > SHORT_STRING_MAX_LEN {
            return Err(WordError::ShortStringTooLong(bytes.len()));
        }
        let mut out = [0u8; 32];
        out[32 - bytes.len()..].copy_from_slice(bytes);
        Ok(Self(out))
    }

    /// Unpacks a short string. Leading zero bytes are padding.
    pub fn to_short_string(self) -> Option<String> {
        let start = self.0.iter().position(|b| *b != 0).unwrap_or(32);
        let bytes = &self.0[start..];
        if bytes.iter().all(|b| b.is_ascii() && !b.is_ascii_control()) {
            String::from_utf8(bytes.to_vec()).ok()
        } else {
            None
        }
    }

    pub fn from_hex(input: &str) -> Result<Self, WordError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        if digits.is_empty() {
            return Err(WordError::Empty);
        }
        if digits.len() > 64 {
            return Err(WordError::TooLong(digits.len()));
        }
        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| WordError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Shortest `0x` form, as JSON-RPC nodes expect it.
    pub fn to_hex(&self) -> String {
        let full = hex::encode(self.0);
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{trimmed}")
        }
    }

    /// Big-endian subtraction modulo `2^256`.
    fn wrapping_sub(self, rhs: Word) -> Word {
        let mut out = [0u8; 32];
        let mut borrow = 0i16;
        for i in (0..32).rev() {
            let mut diff = i16::from(self.0[i]) - i16::from(rhs.0[i]) - borrow;
            if diff < 0 {
                diff += 256;
                borrow = 1;
            } else {
                borrow = 0;
            }
            out[i] = diff as u8;
        }
        Word(out)
    }
}

impl From<Address> for Word {
    fn from(address: Address) -> Self {
        Word(*address.as_bytes())
    }
}

impl From<Word> for Address {
    fn from(word: Word) -> Self {
        Address::from_bytes(word.0)
    }
}

impl From<u64> for Word {
    fn from(value: u64) -> Self {
        Word::from_u64(value)
    }
}

impl From<u32> for Word {
    fn from(value: u32) -> Self {
        Word::from_u64(u64::from(value))
    }
}

impl From<u8> for Word {
    fn from(value: u8) -> Self {
        Word::from_u64(u64::from(value))
    }
}

impl FromStr for Word {
    type Err = WordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Word::from_hex(s)
    }
}

impl fmt::Display for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Word {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Word({})", self.to_hex())
    }
}

impl Serialize for Word {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Word {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Word::from_hex(&raw).map_err(serde::de::Error::custom)
    }
}
