// Serde helpers for the ballot submission payload.
//
// A `with`-module pairing `serialize`/`deserialize` around a `BigInt`,
// encoding it as a decimal string rather than raw bytes so the JSON
// payload's integers avoid platform numeric limits on the receiving end.

use std::str::FromStr;

use num_bigint_dig::BigInt;
use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

/// `#[serde(with = "crate::serde_support::bigint_decimal")]` — serializes a
/// `BigInt` as its base-10 string and parses it back the same way.
pub mod bigint_decimal {
    use super::*;

    pub fn serialize<S: Serializer>(value: &BigInt, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigInt, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigInt::from_str(&s).map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Wrapper {
        #[serde(with = "bigint_decimal")]
        value: BigInt,
    }

    #[test]
    fn test_roundtrip_through_json() {
        let original = Wrapper {
            value: BigInt::from(123456789u64) * BigInt::from(987654321u64),
        };
        let json = serde_json::to_string(&original).unwrap();
        assert!(json.contains("\"value\":\""));
        let parsed: Wrapper = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.value, original.value);
    }

    #[test]
    fn test_negative_and_zero() {
        for v in [BigInt::from(0), BigInt::from(-42)] {
            let wrapper = Wrapper { value: v.clone() };
            let json = serde_json::to_string(&wrapper).unwrap();
            let parsed: Wrapper = serde_json::from_str(&json).unwrap();
            assert_eq!(parsed.value, v);
        }
    }
}
