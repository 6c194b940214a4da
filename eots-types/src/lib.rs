#![deny(missing_docs)]
//! Core type definitions shared by the EOTS custodian service and its caller.
//!
//! This crate groups the strongly-typed values and message structures that
//! cross the service boundary:
//!
//! * Thin wrappers around primitive values such as chain identifiers, with
//!   consistent serialization and display implementations.
//! * Versioned request/response payloads for the HTTP API (see [`api`]).
//! * The numeric error codes the service attaches to failure responses.
//!
//! Cryptographic values (public keys, public randomness, signatures) are the
//! [`eots_core`] types, re-exported here so callers need only this crate to
//! talk to the service.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

pub mod api;

pub use eots_core::eots::{EotsSignature, PublicRand};
pub use eots_core::keys::EotsPublicKey;
pub use eots_core::schnorr::SchnorrSignature;

/// An opaque chain identifier, an arbitrary byte string chosen by the
/// consumer chain. Serialized as hex.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChainId(Vec<u8>);

impl ChainId {
    /// Wraps raw chain id bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    /// Returns the raw bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Consumes the id, returning the raw bytes.
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }
}

impl From<&[u8]> for ChainId {
    fn from(value: &[u8]) -> Self {
        Self(value.to_vec())
    }
}

impl From<&str> for ChainId {
    fn from(value: &str) -> Self {
        Self(value.as_bytes().to_vec())
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(&self.0))
    }
}

impl Serialize for ChainId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(&self.0))
    }
}

impl<'de> Deserialize<'de> for ChainId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(&s).map(ChainId).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_id_serde_is_hex() {
        let id = ChainId::from("chain-test-01");
        let json = serde_json::to_string(&id).expect("serializes");
        assert_eq!(json, format!("\"{}\"", hex::encode(id.as_bytes())));
        let back: ChainId = serde_json::from_str(&json).expect("deserializes");
        assert_eq!(id, back);
    }
}
