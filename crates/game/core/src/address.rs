//! Account addresses as ledger field elements.
//!
//! Wallets hand out addresses with or without leading zeros and in mixed case.
//! [`Address`] stores the 32-byte big-endian value so two spellings of the same
//! account compare equal.

use core::fmt;
use core::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("address is empty")]
    Empty,

    #[error("address has {0} hex digits, at most 64 allowed")]
    TooLong(usize),

    #[error("invalid hex in address: {0}")]
    InvalidHex(String),
}

/// A normalized 252-bit account or contract address.
#[derive(Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Address([u8; 32]);

impl Address {
    pub const ZERO: Self = Self([0u8; 32]);

    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Parses `0x`-prefixed or bare hex. Leading zeros and case are ignored.
    pub fn parse(input: &str) -> Result<Self, AddressError> {
        let trimmed = input.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(AddressError::Empty);
        }
        if digits.len() > 64 {
            return Err(AddressError::TooLong(digits.len()));
        }

        let padded = format!("{digits:0>64}");
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(&padded, &mut bytes)
            .map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Canonical `0x` + 64 lowercase hex digits form.
    pub fn to_padded_hex(&self) -> String {
        format!("0x{}", hex::encode(self.0))
    }

    /// Shortest `0x` form without leading zeros.
    pub fn to_short_hex(&self) -> String {
        let full = hex::encode(self.0);
        let trimmed = full.trim_start_matches('0');
        if trimmed.is_empty() {
            "0x0".to_string()
        } else {
            format!("0x{trimmed}")
        }
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_padded_hex())
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.to_short_hex())
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Address {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_padded_hex())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Address {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        Address::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spellings_of_one_address_compare_equal() {
        let short = Address::parse("0x49d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7")
            .unwrap();
        let padded =
            Address::parse("0x049D36570D4E46F48E99674BD3FCC84644DDD6B96F7C741B1562B82F9E004DC7")
                .unwrap();
        let bare =
            Address::parse("049d36570d4e46f48e99674bd3fcc84644ddd6b96f7c741b1562b82f9e004dc7")
                .unwrap();
        assert_eq!(short, padded);
        assert_eq!(short, bare);
    }

    #[test]
    fn hex_forms() {
        let addr = Address::parse("0x00abc").unwrap();
        assert_eq!(addr.to_short_hex(), "0xabc");
        assert_eq!(addr.to_padded_hex().len(), 66);
        assert!(addr.to_padded_hex().ends_with("0abc"));
        assert_eq!(Address::ZERO.to_short_hex(), "0x0");
    }

    #[test]
    fn rejects_garbage() {
        assert_eq!(Address::parse("0x"), Err(AddressError::Empty));
        assert!(matches!(Address::parse("0xzz"), Err(AddressError::InvalidHex(_))));
        let long = format!("0x{}", "1".repeat(65));
        assert_eq!(Address::parse(&long), Err(AddressError::TooLong(65)));
    }
}
