//! Hex string (de)serialization for byte fields of persisted records.

use serde::{Deserialize, Deserializer, Serializer};

/// Decodes hex into exactly `N` bytes.
pub(crate) fn hex_decode_fixed<const N: usize>(
    hex_str: &str,
    field: &str,
) -> Result<[u8; N], String> {
    let bytes = hex::decode(hex_str).map_err(|e| format!("invalid {field} hex: {e}"))?;
    bytes
        .try_into()
        .map_err(|v: Vec<u8>| format!("{field} must be {N} bytes, got {}", v.len()))
}

/// `Vec<u8>` as a hex string. Length is checked by the owner.
pub(crate) mod bytes {
    use super::*;

    pub fn serialize<S: Serializer>(value: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

/// `[u8; N]` as a hex string of exactly `2N` digits.
pub(crate) mod array {
    use super::*;

    pub fn serialize<S: Serializer, const N: usize>(
        value: &[u8; N],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>, const N: usize>(
        deserializer: D,
    ) -> Result<[u8; N], D::Error> {
        let s = String::deserialize(deserializer)?;
        hex_decode_fixed::<N>(&s, "field").map_err(serde::de::Error::custom)
    }
}
