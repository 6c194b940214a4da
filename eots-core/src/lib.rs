#![deny(missing_docs)]
//! Schnorr and extractable one-time signatures (EOTS) over secp256k1.
//!
//! This crate implements the pure cryptography of the EOTS custodian: key
//! handling, BIP-340 style Schnorr signatures over 32-byte digests, and the
//! extractable one-time signature scheme used by finality providers to attest
//! to block heights. It is deliberately free of I/O and async code; the
//! service crate layers persistence and the request boundary on top.
//!
//! The defining property of EOTS is also its hazard: signing two *different*
//! digests with the same one-time randomness allows anyone holding both
//! signatures to compute the long-term secret key (see
//! [`eots::extract_secret_key`]). Everything in the custodian above this crate
//! exists to make that event structurally impossible; this crate only provides
//! the math and therefore has no memory of past calls.
//!
//! All signing here is deterministic: Schnorr nonces are derived from the
//! secret key and digest via a tagged hash, and one-time randomness is derived
//! from the secret key, chain id and height via a keyed PRF (see
//! [`eots::SecretRand::derive`]). Calling any sign function twice with
//! identical inputs yields identical bytes.

pub mod eots;
pub mod keys;
pub mod schnorr;
pub mod serde_hex;

mod hashing;

/// Errors returned by signature creation, verification and key extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SignatureError {
    /// An x-only value does not lift to a curve point.
    #[error("value is not the x coordinate of a curve point")]
    InvalidPoint,
    /// A scalar encoding is zero or not below the group order.
    #[error("scalar is out of range")]
    InvalidScalar,
    /// The signature equation does not hold.
    #[error("signature verification failed")]
    VerificationFailed,
    /// Both extraction inputs sign the same digest, so the two signatures are
    /// identical and the randomness cancels; there is nothing to extract.
    #[error("challenges are equal, cannot extract")]
    EqualChallenges,
}
