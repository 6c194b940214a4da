//! Single-round Schnorr signatures over a 32-byte digest.
//!
//! The nonce is derived deterministically from the secret key and the digest,
//! so plain Schnorr signing needs no ledger state: distinct digests get
//! distinct nonces and repeating a digest reproduces the identical signature.

use k256::elliptic_curve::group::Group as _;
use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::PrimeField;
use k256::{ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use zeroize::Zeroize as _;

use crate::hashing;
use crate::keys::{EotsPublicKey, SecretKey};
use crate::SignatureError;

/// A Schnorr signature: the x coordinate of the nonce point and the response
/// scalar, 32 bytes each.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchnorrSignature {
    /// X coordinate of the nonce point `R` (even-y convention).
    #[serde(with = "crate::serde_hex")]
    pub r: [u8; 32],
    /// Response scalar `s`, big-endian.
    #[serde(with = "crate::serde_hex")]
    pub s: [u8; 32],
}

impl SchnorrSignature {
    /// Returns the 64-byte wire encoding `R_x || s`.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.r);
        out[32..].copy_from_slice(&self.s);
        out
    }

    /// Splits a 64-byte encoding into its components. Range checks happen at
    /// verification time.
    pub fn from_bytes(bytes: [u8; 64]) -> Self {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Self { r, s }
    }
}

/// Signs a 32-byte digest, producing `(R_x, s)` with
/// `s = k + H(R_x || P_x || m)·d` where `k` and `d` are the parity-adjusted
/// nonce and secret scalars.
pub fn sign(sk: &SecretKey, digest: &[u8; 32]) -> SchnorrSignature {
    let (d, p_x) = sk.signing_scalar();
    let mut d_bytes: [u8; 32] = d.to_bytes().into();
    let k0 = hashing::nonce(&d_bytes, &p_x, digest);
    d_bytes.zeroize();

    let r_point = (ProjectivePoint::GENERATOR * k0).to_affine();
    let k = if bool::from(r_point.y_is_odd()) { -k0 } else { k0 };
    let r_x: [u8; 32] = r_point.x().into();

    let e = hashing::challenge(&r_x, &p_x, digest);
    let s = k + e * d;
    SchnorrSignature {
        r: r_x,
        s: s.to_bytes().into(),
    }
}

/// Verifies `s·G == R + e·P` with `R` lifted to even y.
pub fn verify(
    pk: &EotsPublicKey,
    digest: &[u8; 32],
    sig: &SchnorrSignature,
) -> Result<(), SignatureError> {
    let p = pk.to_point()?;
    let s = Option::<Scalar>::from(Scalar::from_repr(sig.s.into()))
        .ok_or(SignatureError::InvalidScalar)?;
    let e = hashing::challenge(&sig.r, &pk.to_bytes(), digest);

    let r_point = ProjectivePoint::GENERATOR * s - p * e;
    if bool::from(r_point.is_identity()) {
        return Err(SignatureError::VerificationFailed);
    }
    let r_affine = r_point.to_affine();
    let r_x: [u8; 32] = r_affine.x().into();
    if bool::from(r_affine.y_is_odd()) || r_x != sig.r {
        return Err(SignatureError::VerificationFailed);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng as _;
    use rand_chacha::ChaCha12Rng;

    use super::*;

    fn test_key(seed: u64) -> SecretKey {
        let mut rng = ChaCha12Rng::seed_from_u64(seed);
        SecretKey::random(&mut rng)
    }

    #[test]
    fn sign_and_verify() {
        let sk = test_key(3);
        let digest = [0x42u8; 32];
        let sig = sign(&sk, &digest);
        verify(&sk.public_key(), &digest, &sig).expect("valid signature");
    }

    #[test]
    fn signing_is_deterministic() {
        let sk = test_key(4);
        let digest = [9u8; 32];
        assert_eq!(sign(&sk, &digest), sign(&sk, &digest));
    }

    #[test]
    fn distinct_digests_get_distinct_nonces() {
        let sk = test_key(5);
        let sig_a = sign(&sk, &[1u8; 32]);
        let sig_b = sign(&sk, &[2u8; 32]);
        assert_ne!(sig_a.r, sig_b.r);
    }

    #[test]
    fn rejects_wrong_digest_and_wrong_key() {
        let sk = test_key(6);
        let digest = [7u8; 32];
        let sig = sign(&sk, &digest);
        assert_eq!(
            verify(&sk.public_key(), &[8u8; 32], &sig),
            Err(SignatureError::VerificationFailed)
        );
        let other = test_key(7);
        assert_eq!(
            verify(&other.public_key(), &digest, &sig),
            Err(SignatureError::VerificationFailed)
        );
    }

    #[test]
    fn round_trips_wire_encoding() {
        let sk = test_key(8);
        let sig = sign(&sk, &[3u8; 32]);
        assert_eq!(SchnorrSignature::from_bytes(sig.to_bytes()), sig);
    }
}
