//! Strongly-typed identifiers used across the domain.

use core::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::error::DomainError;

const MAX_BARCODE_LEN: usize = 50;

/// Product barcode (primary key of the catalog).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Barcode(String);

/// Tax identifier of a supplier or customer (10 or 12 ASCII digits).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TaxId(String);

impl Barcode {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TaxId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Barcode {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(DomainError::invalid_id("Barcode: must not be empty"));
        }
        if s.chars().count() > MAX_BARCODE_LEN {
            return Err(DomainError::invalid_id(format!(
                "Barcode: longer than {MAX_BARCODE_LEN} characters"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

impl FromStr for TaxId {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if !matches!(s.len(), 10 | 12) || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DomainError::invalid_id(format!(
                "TaxId: expected 10 or 12 digits, got '{s}'"
            )));
        }
        Ok(Self(s.to_string()))
    }
}

macro_rules! impl_string_newtype {
    ($t:ty) => {
        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl TryFrom<String> for $t {
            type Error = DomainError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                value.parse()
            }
        }

        impl From<$t> for String {
            fn from(value: $t) -> Self {
                value.0
            }
        }
    };
}

impl_string_newtype!(Barcode);
impl_string_newtype!(TaxId);

/// Identifier of a delivery (inbound stock header).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeliveryId(i32);

/// Identifier of an order (outbound stock header).
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OrderId(i32);

/// Identifier of a user account.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i32);

macro_rules! impl_serial_newtype {
    ($t:ty, $name:literal) => {
        impl $t {
            /// Wrap a storage-generated serial value.
            pub fn new(value: i32) -> Self {
                Self(value)
            }

            pub fn get(&self) -> i32 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i32> for $t {
            fn from(value: i32) -> Self {
                Self(value)
            }
        }

        impl From<$t> for i32 {
            fn from(value: $t) -> Self {
                value.0
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let value = s
                    .trim()
                    .parse::<i32>()
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))?;
                Ok(Self(value))
            }
        }
    };
}

impl_serial_newtype!(DeliveryId, "DeliveryId");
impl_serial_newtype!(OrderId, "OrderId");
impl_serial_newtype!(UserId, "UserId");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_is_trimmed_and_bounded() {
        let b: Barcode = "  4600000000141 ".parse().unwrap();
        assert_eq!(b.as_str(), "4600000000141");

        assert!("".parse::<Barcode>().is_err());
        assert!("x".repeat(51).parse::<Barcode>().is_err());
    }

    #[test]
    fn tax_id_requires_ten_or_twelve_digits() {
        assert!("7701234567".parse::<TaxId>().is_ok());
        assert!("770123456789".parse::<TaxId>().is_ok());
        assert!("77012345678".parse::<TaxId>().is_err());
        assert!("77O1234567".parse::<TaxId>().is_err());
    }

    #[test]
    fn serial_ids_parse_from_path_segments() {
        let id: DeliveryId = "7".parse().unwrap();
        assert_eq!(id.get(), 7);
        assert!(matches!("seven".parse::<OrderId>(), Err(DomainError::InvalidId(_))));
    }

    #[test]
    fn barcode_deserialization_validates() {
        let ok: Barcode = serde_json::from_str("\"111\"").unwrap();
        assert_eq!(ok.to_string(), "111");
        assert!(serde_json::from_str::<Barcode>("\"   \"").is_err());
    }
}
