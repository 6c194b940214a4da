//! Long-term key material: the secret scalar and its x-only public key.
//!
//! Secret keys follow the x-only convention of BIP-340: the public key is the
//! 32-byte x coordinate of `x·G`, and signing negates the secret scalar when
//! the full point has an odd y coordinate. [`SecretKey`] zeroizes its bytes on
//! drop and never implements `Debug`, `Serialize` or `Display`.

use std::fmt;

use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::{Field as _, PrimeField};
use k256::{ProjectivePoint, Scalar};
use rand::{CryptoRng, Rng};
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::hashing;
use crate::SignatureError;

const KEY_DERIVATION_LABEL: &[u8] = b"eots-custodian/v1/key-derivation";

/// A secp256k1 secret key, held as 32 big-endian scalar bytes.
///
/// Not `Debug`, not serializable; the only way out is [`SecretKey::to_bytes`],
/// which callers must themselves zeroize.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecretKey([u8; 32]);

impl SecretKey {
    /// Samples a fresh random secret key.
    pub fn random<R: Rng + CryptoRng>(rng: &mut R) -> Self {
        loop {
            let mut bytes = [0u8; 32];
            rng.fill_bytes(&mut bytes);
            if let Ok(sk) = Self::from_bytes(bytes) {
                return sk;
            }
            bytes.zeroize();
        }
    }

    /// Derives a secret key deterministically from a seed and a derivation
    /// path via the keyed BLAKE3 PRF. The same (seed, path) pair always yields
    /// the same key; without the seed the result is indistinguishable from
    /// random.
    pub fn derive_from_path(seed: &[u8; 32], path: &str) -> Self {
        let mut counter: u8 = 0;
        loop {
            let mut hasher = blake3::Hasher::new_keyed(seed);
            hasher.update(KEY_DERIVATION_LABEL);
            hasher.update(path.as_bytes());
            hasher.update(&[counter]);
            let candidate: [u8; 32] = hasher.finalize().into();
            if let Ok(sk) = Self::from_bytes(candidate) {
                return sk;
            }
            counter = counter.wrapping_add(1);
        }
    }

    /// Wraps 32 big-endian bytes, rejecting zero and values at or above the
    /// group order.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        let scalar = Option::<Scalar>::from(Scalar::from_repr(bytes.into()))
            .ok_or(SignatureError::InvalidScalar)?;
        if bool::from(scalar.is_zero()) {
            return Err(SignatureError::InvalidScalar);
        }
        Ok(Self(bytes))
    }

    /// Returns the raw scalar bytes. The caller owns the copy and is
    /// responsible for zeroizing it.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    /// The x-only public key of this secret key.
    pub fn public_key(&self) -> EotsPublicKey {
        let point = (ProjectivePoint::GENERATOR * self.scalar()).to_affine();
        EotsPublicKey(point.x().into())
    }

    pub(crate) fn scalar(&self) -> Scalar {
        Option::<Scalar>::from(Scalar::from_repr(self.0.into()))
            .expect("scalar was validated at construction")
    }

    /// The parity-adjusted signing scalar and the x-only public key bytes:
    /// the scalar is negated when the full public point has odd y.
    pub(crate) fn signing_scalar(&self) -> (Scalar, [u8; 32]) {
        let x = self.scalar();
        let point = (ProjectivePoint::GENERATOR * x).to_affine();
        let p_x: [u8; 32] = point.x().into();
        let d = if bool::from(point.y_is_odd()) { -x } else { x };
        (d, p_x)
    }
}

/// An x-only secp256k1 public key (32 bytes, big-endian x coordinate).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EotsPublicKey(#[serde(with = "crate::serde_hex")] [u8; 32]);

impl EotsPublicKey {
    /// Wraps 32 x-coordinate bytes, checking that they lift to a curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        hashing::lift_x(&bytes)?;
        Ok(Self(bytes))
    }

    /// Returns the x coordinate bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }

    pub(crate) fn to_point(self) -> Result<ProjectivePoint, SignatureError> {
        hashing::lift_x(&self.0)
    }
}

impl fmt::Display for EotsPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}
