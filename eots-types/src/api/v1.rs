//! Version 1 of the custodian HTTP API payloads.
//!
//! Request types deliberately do not implement `Debug`: they carry
//! passphrases, and a stray `{:?}` in a log line must not print them.

use serde::{Deserialize, Serialize};

use crate::{ChainId, EotsPublicKey, EotsSignature, PublicRand, SchnorrSignature};

/// `POST /v1/keys` — create a new named key pair.
#[derive(Clone, Serialize, Deserialize)]
pub struct CreateKeyRequest {
    /// Unique human-chosen key name.
    pub name: String,
    /// Passphrase the private key is encrypted under.
    pub passphrase: String,
    /// Optional derivation path; empty means fresh entropy.
    #[serde(default)]
    pub derivation_path: String,
}

/// Response to [`CreateKeyRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateKeyResponse {
    /// X-only public key of the new pair, the identifier for all further
    /// operations.
    pub public_key: EotsPublicKey,
}

/// `POST /v1/keys/record` — fetch key metadata, authorized by passphrase.
#[derive(Clone, Serialize, Deserialize)]
pub struct KeyRecordRequest {
    /// The key to look up.
    pub public_key: EotsPublicKey,
    /// Passphrase proving the caller may read the record.
    pub passphrase: String,
}

/// Response to [`KeyRecordRequest`]. Never contains private material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecordResponse {
    /// The key's name.
    pub name: String,
    /// The key's x-only public key.
    pub public_key: EotsPublicKey,
}

/// `POST /v1/randomness` — commit one-time randomness for a height range.
#[derive(Clone, Serialize, Deserialize)]
pub struct CreateRandomnessRequest {
    /// The signing key the randomness belongs to.
    pub public_key: EotsPublicKey,
    /// The consumer chain the heights index into.
    pub chain_id: ChainId,
    /// First height of the batch.
    pub start_height: u64,
    /// Number of consecutive heights, at least 1.
    pub count: u32,
    /// Passphrase unlocking the key for derivation.
    pub passphrase: String,
}

/// Response to [`CreateRandomnessRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateRandomnessResponse {
    /// Public randomness per height, ordered from `start_height`, exactly
    /// `count` entries.
    pub public_randomness: Vec<PublicRand>,
}

/// `POST /v1/sign/schnorr` — plain Schnorr signature over a digest.
#[derive(Clone, Serialize, Deserialize)]
pub struct SignSchnorrRequest {
    /// The signing key.
    pub public_key: EotsPublicKey,
    /// The 32-byte message digest.
    #[serde(with = "eots_core::serde_hex")]
    pub digest: [u8; 32],
    /// Passphrase unlocking the key.
    pub passphrase: String,
}

/// Response to [`SignSchnorrRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignSchnorrResponse {
    /// The signature.
    pub signature: SchnorrSignature,
}

/// `POST /v1/sign/eots` — EOTS signature over a digest at a committed height.
#[derive(Clone, Serialize, Deserialize)]
pub struct SignEotsRequest {
    /// The signing key.
    pub public_key: EotsPublicKey,
    /// The consumer chain.
    pub chain_id: ChainId,
    /// The 32-byte message digest.
    #[serde(with = "eots_core::serde_hex")]
    pub digest: [u8; 32],
    /// The height whose committed randomness must be used.
    pub height: u64,
    /// Passphrase unlocking the key.
    pub passphrase: String,
}

/// Response to [`SignEotsRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignEotsResponse {
    /// The signature; its `pub_rand` equals the commitment published for the
    /// height.
    pub signature: EotsSignature,
}
