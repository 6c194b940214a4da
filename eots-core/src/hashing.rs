//! Tagged hashes and x-only point lifting shared by the Schnorr and EOTS
//! signing routines.

use k256::elliptic_curve::ops::Reduce;
use k256::elliptic_curve::Field as _;
use k256::{ProjectivePoint, Scalar, U256};
use sha2::{Digest as _, Sha256};

use crate::SignatureError;

/// BIP-340 challenge tag. EOTS reuses the same challenge so an EOTS signature
/// verifies like a Schnorr signature with a fixed nonce point.
const CHALLENGE_TAG: &str = "BIP0340/challenge";
const NONCE_TAG: &str = "BIP0340/nonce";

fn tagged_hasher(tag: &str) -> Sha256 {
    let tag_hash = Sha256::digest(tag.as_bytes());
    let mut hasher = Sha256::new();
    hasher.update(tag_hash);
    hasher.update(tag_hash);
    hasher
}

/// Reduces 32 big-endian bytes into a scalar modulo the group order.
pub(crate) fn reduce_to_scalar(bytes: [u8; 32]) -> Scalar {
    <Scalar as Reduce<U256>>::reduce_bytes(&bytes.into())
}

/// The signature challenge `e = H_tag(R_x || P_x || m)` reduced to a scalar.
pub(crate) fn challenge(r_x: &[u8; 32], p_x: &[u8; 32], digest: &[u8; 32]) -> Scalar {
    let mut hasher = tagged_hasher(CHALLENGE_TAG);
    hasher.update(r_x);
    hasher.update(p_x);
    hasher.update(digest);
    reduce_to_scalar(hasher.finalize().into())
}

/// Deterministic Schnorr nonce `H_tag(d || P_x || m || ctr)` reduced to a
/// nonzero scalar. The counter only advances in the astronomically unlikely
/// case the reduction hits zero.
pub(crate) fn nonce(d: &[u8; 32], p_x: &[u8; 32], digest: &[u8; 32]) -> Scalar {
    let mut counter: u8 = 0;
    loop {
        let mut hasher = tagged_hasher(NONCE_TAG);
        hasher.update(d);
        hasher.update(p_x);
        hasher.update(digest);
        hasher.update(&[counter]);
        let candidate = reduce_to_scalar(hasher.finalize().into());
        if !bool::from(candidate.is_zero()) {
            return candidate;
        }
        counter = counter.wrapping_add(1);
    }
}

/// Lifts an x coordinate to the curve point with even y, per the x-only
/// convention. Fails if `x` is not on the curve.
pub(crate) fn lift_x(x: &[u8; 32]) -> Result<ProjectivePoint, SignatureError> {
    let mut sec1 = [0u8; 33];
    sec1[0] = 0x02;
    sec1[1..].copy_from_slice(x);
    let point = k256::PublicKey::from_sec1_bytes(&sec1).map_err(|_| SignatureError::InvalidPoint)?;
    Ok(point.to_projective())
}
