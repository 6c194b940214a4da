//! Serde helpers that encode fixed-size byte arrays as lowercase hex strings.
//!
//! Used via `#[serde(with = "eots_core::serde_hex")]` on `[u8; N]` fields so
//! that public keys, randomness values and digests travel as hex over JSON.

use serde::{Deserialize as _, Deserializer, Serializer};

/// Serializes a byte array as a lowercase hex string.
pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&hex::encode(bytes))
}

/// Deserializes a lowercase or uppercase hex string into a byte array,
/// rejecting inputs of the wrong length.
pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let decoded = hex::decode(&s).map_err(serde::de::Error::custom)?;
    decoded
        .try_into()
        .map_err(|v: Vec<u8>| serde::de::Error::custom(format!("expected {N} bytes, got {}", v.len())))
}
