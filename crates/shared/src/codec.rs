//! Serde helpers for the numeric encodings used on the contract wire.
//!
//! Contract integers are `uint256` and arrive as decimal strings; some
//! gateways emit `0x`-prefixed hex or plain JSON numbers for small values.

use primitive_types::{H160, U256};
use serde::{de, Deserialize, Deserializer, Serializer};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("'{0}' is not a valid decimal or 0x-hex integer")]
    InvalidInteger(String),
    #[error("address '{0}' must be 20 bytes of hex")]
    InvalidAddress(String),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumericRepr {
    Number(u64),
    Text(String),
}

pub fn parse_u256(raw: &str) -> Result<U256, CodecError> {
    let raw = raw.trim();
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => U256::from_str_radix(hex, 16).ok(),
        None => U256::from_dec_str(raw).ok(),
    };
    parsed.ok_or_else(|| CodecError::InvalidInteger(raw.to_string()))
}

/// Parse a `0x`-prefixed (or bare) 40-digit hex account address.
pub fn parse_address(raw: &str) -> Result<H160, CodecError> {
    let trimmed = raw.trim();
    let hex = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
        .unwrap_or(trimmed);
    if hex.len() != 40 || !hex.is_ascii() {
        return Err(CodecError::InvalidAddress(raw.to_string()));
    }

    let mut bytes = [0u8; 20];
    for (index, byte) in bytes.iter_mut().enumerate() {
        let pair = &hex[index * 2..index * 2 + 2];
        *byte = u8::from_str_radix(pair, 16)
            .map_err(|_| CodecError::InvalidAddress(raw.to_string()))?;
    }
    Ok(H160::from(bytes))
}

/// `U256` as a decimal string.
pub mod decimal_u256 {
    use super::*;

    pub fn serialize<S>(value: &U256, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<U256, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumericRepr::deserialize(deserializer)? {
            NumericRepr::Number(value) => Ok(U256::from(value)),
            NumericRepr::Text(raw) => parse_u256(&raw).map_err(de::Error::custom),
        }
    }
}

/// `u64` that also accepts its decimal string form.
pub mod lenient_u64 {
    use super::*;

    pub fn serialize<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(*value)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<u64, D::Error>
    where
        D: Deserializer<'de>,
    {
        match NumericRepr::deserialize(deserializer)? {
            NumericRepr::Number(value) => Ok(value),
            NumericRepr::Text(raw) => {
                let wide = parse_u256(&raw).map_err(de::Error::custom)?;
                if wide > U256::from(u64::MAX) {
                    return Err(de::Error::custom(format!("integer '{raw}' exceeds u64")));
                }
                Ok(wide.low_u64())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Sample {
        #[serde(with = "decimal_u256")]
        rate: U256,
        #[serde(with = "lenient_u64")]
        id: u64,
    }

    #[test]
    fn accepts_decimal_hex_and_numeric_forms() {
        let from_text: Sample =
            serde_json::from_str(r#"{"rate":"10000000000000000","id":"7"}"#).expect("decode");
        assert_eq!(from_text.rate, U256::exp10(16));
        assert_eq!(from_text.id, 7);

        let from_hex: Sample = serde_json::from_str(r#"{"rate":"0x10","id":3}"#).expect("decode");
        assert_eq!(from_hex.rate, U256::from(16));
        assert_eq!(from_hex.id, 3);
    }

    #[test]
    fn serializes_rate_as_decimal_string() {
        let encoded = serde_json::to_string(&Sample {
            rate: U256::exp10(18),
            id: 1,
        })
        .expect("encode");
        assert_eq!(encoded, r#"{"rate":"1000000000000000000","id":1}"#);
    }

    #[test]
    fn parses_addresses_with_and_without_prefix() {
        let expected = H160::repeat_byte(0xab);
        let hex = "abababababababababababababababababababab";
        assert_eq!(parse_address(&format!("0x{hex}")).expect("prefixed"), expected);
        assert_eq!(parse_address(hex).expect("bare"), expected);
        assert_eq!(
            parse_address("0x1234"),
            Err(CodecError::InvalidAddress("0x1234".into()))
        );
        assert!(matches!(
            parse_address(&format!("0x{}", "zz".repeat(20))),
            Err(CodecError::InvalidAddress(_))
        ));
    }

    #[test]
    fn integer_errors_name_the_input() {
        assert_eq!(parse_u256(" 0x1f ").expect("hex"), U256::from(31));
        let err = parse_u256("12abc").expect_err("garbage");
        assert_eq!(err, CodecError::InvalidInteger("12abc".into()));
        assert!(err.to_string().contains("'12abc'"));
    }

    #[test]
    fn rejects_ids_wider_than_u64() {
        let err = serde_json::from_str::<Sample>(r#"{"rate":"1","id":"18446744073709551616"}"#)
            .expect_err("overflow");
        assert!(err.to_string().contains("exceeds u64"));
    }
}
