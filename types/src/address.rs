//! Account address type with `0x` prefix.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TypesError;

/// The identity of a caller: `0x` followed by 40 hex digits.
///
/// Addresses are normalised to lowercase on construction so that two
/// spellings of the same account always compare equal.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The standard prefix for all addresses.
    pub const PREFIX: &'static str = "0x";

    /// Number of hex digits after the prefix.
    pub const HEX_LEN: usize = 40;

    /// The all-zero address, used for readers without an identity.
    pub fn zero() -> Self {
        Self(format!("{}{}", Self::PREFIX, "0".repeat(Self::HEX_LEN)))
    }

    /// Parse and normalise an address.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix(Self::PREFIX)
            .or_else(|| trimmed.strip_prefix("0X"))
            .ok_or_else(|| TypesError::InvalidAddress(raw.to_string()))?;
        if digits.len() != Self::HEX_LEN || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(TypesError::InvalidAddress(raw.to_string()));
        }
        Ok(Self(format!("{}{}", Self::PREFIX, digits.to_ascii_lowercase())))
    }

    /// Build a deterministic address from a small integer (accounts\[n\] in tests and fixtures).
    pub fn from_index(index: u64) -> Self {
        Self(format!("{}{:040x}", Self::PREFIX, index))
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is the anonymous all-zero address.
    pub fn is_zero(&self) -> bool {
        self.0[Self::PREFIX.len()..].bytes().all(|b| b == b'0')
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Address {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_normalises_case() {
        let upper = Address::parse("0xABCDEF0123456789ABCDEF0123456789ABCDEF01").unwrap();
        let lower = Address::parse("0xabcdef0123456789abcdef0123456789abcdef01").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "0xabcdef0123456789abcdef0123456789abcdef01");
    }

    #[test]
    fn parse_rejects_malformed() {
        assert!(Address::parse("abcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0xzzcdef0123456789abcdef0123456789abcdef01").is_err());
        assert!(Address::parse("").is_err());
    }

    #[test]
    fn zero_address() {
        assert!(Address::zero().is_zero());
        assert!(Address::from_index(0).is_zero());
        assert!(!Address::from_index(1).is_zero());
    }

    #[test]
    fn serde_rejects_invalid() {
        let ok: Result<Address, _> =
            serde_json::from_str("\"0x00000000000000000000000000000000000000aa\"");
        assert!(ok.is_ok());
        let bad: Result<Address, _> = serde_json::from_str("\"brst_alice\"");
        assert!(bad.is_err());
    }
}
