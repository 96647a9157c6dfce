//! Serde helpers for big integers
//!
//! JSON consumers lose precision on numbers above 2^53, so `U256` and `I256`
//! fields are written as decimal strings and parsed back exactly.

use serde::{Deserialize, Deserializer, Serializer};
use std::{fmt::Display, str::FromStr};

/// Serialize any `Display + FromStr` integer as a decimal string
pub mod decimal {
    use super::*;
    use serde::de::Error as _;

    pub fn serialize<T, S>(value: &T, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<T, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_decimal(&raw).map_err(D::Error::custom)
    }
}

/// Same as [`decimal`] for optional fields
pub mod decimal_opt {
    use super::*;
    use serde::de::Error as _;

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Display,
        S: Serializer,
    {
        match value {
            Some(value) => serializer.collect_str(value),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: FromStr,
        T::Err: Display,
        D: Deserializer<'de>,
    {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| super::parse_decimal(&raw).map_err(D::Error::custom))
            .transpose()
    }
}

// Hex input is rejected so a stringified value has exactly one spelling.
fn parse_decimal<T>(raw: &str) -> Result<T, String>
where
    T: FromStr,
    T::Err: Display,
{
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(format!("expected a decimal integer string, got {raw:?}"));
    }
    raw.parse::<T>().map_err(|e| format!("invalid integer {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use alloy::primitives::{I256, U256};
    use serde::{Deserialize, Serialize};

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Amounts {
        #[serde(with = "super::decimal")]
        balance: U256,
        #[serde(with = "super::decimal")]
        delta: I256,
        #[serde(with = "super::decimal_opt")]
        id: Option<U256>,
    }

    #[test]
    fn test_values_above_u64_survive() {
        let amounts = Amounts {
            balance: U256::MAX,
            delta: I256::MIN,
            id: None,
        };
        let json = serde_json::to_string(&amounts).unwrap();
        assert!(json.contains(&format!("\"{}\"", U256::MAX)));
        assert!(json.contains("\"id\":null"));
        assert_eq!(serde_json::from_str::<Amounts>(&json).unwrap(), amounts);
    }

    #[test]
    fn test_rejects_hex_and_garbage() {
        let hex = r#"{"balance":"0x10","delta":"1","id":null}"#;
        assert!(serde_json::from_str::<Amounts>(hex).is_err());

        let empty = r#"{"balance":"","delta":"1","id":null}"#;
        assert!(serde_json::from_str::<Amounts>(empty).is_err());

        let negative_unsigned = r#"{"balance":"-1","delta":"1","id":null}"#;
        assert!(serde_json::from_str::<Amounts>(negative_unsigned).is_err());
    }
}
