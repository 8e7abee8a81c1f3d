//! Numeric Wire Codec
//!
//! MEV-Share moves integers as strings. Quantities are `0x`-prefixed hex or plain
//! decimal, block numbers are hex. Everything decodes into exact integers
//! (`U256` for values, `u64` for block numbers) and encodes back to canonical
//! lowercase hex without leading zeros. No floating point anywhere on this path.

use crate::error::{MalformedNumber, NumeralForm, Result};
use alloy_primitives::{hex, U256};
use serde::{Deserialize, Serialize, Serializer};

fn strip_hex_prefix(wire: &str) -> Option<&str> {
    wire.strip_prefix("0x").or_else(|| wire.strip_prefix("0X"))
}

fn all_digits(digits: &str, radix: u32) -> bool {
    !digits.is_empty() && digits.chars().all(|c| c.is_digit(radix))
}

/// Decode a quantity: `0x` selects hex, anything else is read as decimal
pub fn decode_quantity(wire: &str) -> Result<U256, MalformedNumber> {
    let (digits, radix) = match strip_hex_prefix(wire) {
        Some(digits) => (digits, 16),
        None => (wire, 10),
    };

    if !all_digits(digits, radix) {
        return Err(MalformedNumber::new(wire, NumeralForm::Quantity));
    }

    // from_str_radix also fails on values wider than 256 bits
    U256::from_str_radix(digits, radix as u64)
        .map_err(|_| MalformedNumber::new(wire, NumeralForm::Quantity))
}

/// Decode a hex numeral (prefix optional) that must fit in 64 bits
pub fn decode_hex_u64(wire: &str) -> Result<u64, MalformedNumber> {
    let digits = strip_hex_prefix(wire).unwrap_or(wire);
    if !all_digits(digits, 16) {
        return Err(MalformedNumber::new(wire, NumeralForm::Hex));
    }
    u64::from_str_radix(digits, 16).map_err(|_| MalformedNumber::new(wire, NumeralForm::Hex))
}

/// Decode a quantity that must fit in 64 bits (block numbers, timestamps)
pub fn decode_quantity_u64(wire: &str) -> Result<u64, MalformedNumber> {
    let value = decode_quantity(wire)?;
    u64::try_from(value).map_err(|_| MalformedNumber::new(wire, NumeralForm::Quantity))
}

/// Encode a 256-bit value as canonical `0x` hex
pub fn encode_quantity(value: U256) -> String {
    let digits = hex::encode(value.to_be_bytes::<32>());
    let trimmed = digits.trim_start_matches('0');
    if trimmed.is_empty() {
        "0x0".to_string()
    } else {
        format!("0x{trimmed}")
    }
}

/// Encode a 64-bit value as canonical `0x` hex
pub fn encode_u64(value: u64) -> String {
    format!("0x{value:x}")
}

/// Canonical form of a hex numeral: `0x` prefix, lowercase, no leading zeros
pub fn normalize_hex(wire: &str) -> Result<String, MalformedNumber> {
    let digits = strip_hex_prefix(wire).unwrap_or(wire);
    if !all_digits(digits, 16) {
        return Err(MalformedNumber::new(wire, NumeralForm::Hex));
    }
    let trimmed = digits.trim_start_matches('0').to_ascii_lowercase();
    if trimmed.is_empty() {
        Ok("0x0".to_string())
    } else {
        Ok(format!("0x{trimmed}"))
    }
}

/// A numeric field as it may appear on the wire: a numeral string or a JSON integer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireNumber {
    Text(String),
    Integer(u64),
}

impl WireNumber {
    /// Decode as a quantity, reporting failures against `field`
    pub fn quantity(&self, field: &str) -> crate::Result<U256> {
        match self {
            WireNumber::Text(text) => decode_quantity(text).map_err(|e| e.in_field(field)),
            WireNumber::Integer(value) => Ok(U256::from(*value)),
        }
    }

    /// Decode as a hex numeral that fits in 64 bits
    pub fn hex_u64(&self, field: &str) -> crate::Result<u64> {
        match self {
            WireNumber::Text(text) => decode_hex_u64(text).map_err(|e| e.in_field(field)),
            WireNumber::Integer(value) => Ok(*value),
        }
    }

    /// Decode as a quantity that fits in 64 bits
    pub fn quantity_u64(&self, field: &str) -> crate::Result<u64> {
        match self {
            WireNumber::Text(text) => decode_quantity_u64(text).map_err(|e| e.in_field(field)),
            WireNumber::Integer(value) => Ok(*value),
        }
    }
}

// ============ serde helpers for outbound payloads ============

pub(crate) fn serialize_u64<S: Serializer>(value: &u64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&encode_u64(*value))
}

pub(crate) fn serialize_opt_u64<S: Serializer>(
    value: &Option<u64>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_str(&encode_u64(*value)),
        None => serializer.serialize_none(),
    }
}

pub(crate) fn serialize_opt_u256<S: Serializer>(
    value: &Option<U256>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_str(&encode_quantity(*value)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_hex_and_decimal_quantities() {
        assert_eq!(decode_quantity("0x64").unwrap(), U256::from(100));
        assert_eq!(decode_quantity("0X64").unwrap(), U256::from(100));
        assert_eq!(decode_quantity("1000").unwrap(), U256::from(1000));
        assert_eq!(decode_quantity("0").unwrap(), U256::ZERO);
        assert_eq!(decode_quantity("0x0").unwrap(), U256::ZERO);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        for wire in ["", "0x", "0xzz", "12a", "-1", "+5", " 1", "1_000", "1.5", "0x-1"] {
            let err = decode_quantity(wire).unwrap_err();
            assert_eq!(err.value, wire);
        }
    }

    #[test]
    fn test_full_width_values_keep_precision() {
        let max = format!("0x{}", "f".repeat(64));
        assert_eq!(decode_quantity(&max).unwrap(), U256::MAX);
        assert_eq!(encode_quantity(U256::MAX), max);

        // 2^256 does not fit
        let overflow = format!("0x1{}", "0".repeat(64));
        assert!(decode_quantity(&overflow).is_err());

        let decimal_max = U256::MAX.to_string();
        assert_eq!(decode_quantity(&decimal_max).unwrap(), U256::MAX);
    }

    #[test]
    fn test_round_trip_matches_normalized_form() {
        let numerals = [
            "0x0",
            "0x00",
            "0x1",
            "0x000abc",
            "0xDEADbeef",
            "0x10",
            "0xffffffffffffffffff",
        ];
        for wire in numerals {
            let decoded = decode_quantity(wire).unwrap();
            assert_eq!(encode_quantity(decoded), normalize_hex(wire).unwrap());
        }
    }

    #[test]
    fn test_hex_u64() {
        assert_eq!(decode_hex_u64("0x10").unwrap(), 16);
        assert_eq!(decode_hex_u64("10").unwrap(), 16);
        assert!(decode_hex_u64("0x10000000000000000").is_err());
        assert!(decode_hex_u64("0xg").is_err());
        assert_eq!(encode_u64(0), "0x0");
        assert_eq!(encode_u64(255), "0xff");
    }

    #[test]
    fn test_wire_number_accepts_json_integers() {
        let number: WireNumber = serde_json::from_str("21000").unwrap();
        assert_eq!(number.quantity("gasUsed").unwrap(), U256::from(21000));

        let text: WireNumber = serde_json::from_str("\"0xzz\"").unwrap();
        let err = text.quantity("gasUsed").unwrap_err();
        assert_eq!(err.path(), Some("gasUsed"));
    }
}
