//! The extractable one-time signature scheme.
//!
//! An EOTS signature is a Schnorr signature whose nonce is not derived from
//! the digest but committed ahead of time: the signer publishes `R = r·G` for
//! a (chain, height) slot before knowing what it will sign there, and the
//! signature over digest `m` is `s = r + H(R_x || P_x || m)·x`. Because `r`
//! is fixed per slot, two signatures over *different* digests at the same slot
//! form a linear system in `(r, x)` and anyone can solve it — see
//! [`extract_secret_key`]. That is the slashing mechanism the custodian's
//! ledger exists to protect honest signers from triggering.

use k256::elliptic_curve::group::Group as _;
use k256::elliptic_curve::point::AffineCoordinates;
use k256::elliptic_curve::{Field as _, PrimeField};
use k256::{ProjectivePoint, Scalar};
use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize as _, ZeroizeOnDrop};

use crate::hashing;
use crate::keys::{EotsPublicKey, SecretKey};
use crate::SignatureError;

const RAND_DERIVATION_LABEL: &[u8] = b"eots-custodian/v1/rand-derivation";

/// One-time secret randomness for a single (key, chain, height) slot.
///
/// Zeroized on drop, not serializable. Obtained either from
/// [`SecretRand::derive`] or by unsealing a persisted ledger row.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SecretRand([u8; 32]);

impl SecretRand {
    /// Derives the one-time randomness for `(sk, chain_id, height)` and its
    /// public commitment.
    ///
    /// The derivation is a keyed BLAKE3 PRF keyed with the secret key, so the
    /// same slot always yields the same value while third parties cannot
    /// distinguish it from fresh entropy. Length-prefixing the chain id keeps
    /// (chain_id, height) encodings unambiguous.
    pub fn derive(sk: &SecretKey, chain_id: &[u8], height: u64) -> (SecretRand, PublicRand) {
        let mut key = sk.to_bytes();
        let mut counter: u8 = 0;
        let secret = loop {
            let mut hasher = blake3::Hasher::new_keyed(&key);
            hasher.update(RAND_DERIVATION_LABEL);
            hasher.update(&(chain_id.len() as u64).to_be_bytes());
            hasher.update(chain_id);
            hasher.update(&height.to_be_bytes());
            hasher.update(&[counter]);
            let candidate: [u8; 32] = hasher.finalize().into();
            if let Ok(secret) = Self::from_bytes(candidate) {
                break secret;
            }
            counter = counter.wrapping_add(1);
        };
        key.zeroize();
        let public = secret.public();
        (secret, public)
    }

    /// Wraps 32 big-endian scalar bytes, rejecting zero and out-of-range
    /// values.
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

    /// The public commitment `R = r·G` as an x-only point.
    pub fn public(&self) -> PublicRand {
        let point = (ProjectivePoint::GENERATOR * self.scalar()).to_affine();
        PublicRand(point.x().into())
    }

    fn scalar(&self) -> Scalar {
        Option::<Scalar>::from(Scalar::from_repr(self.0.into()))
            .expect("scalar was validated at construction")
    }
}

/// The public half of a one-time randomness commitment: the x coordinate of
/// `r·G`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicRand(#[serde(with = "crate::serde_hex")] [u8; 32]);

impl PublicRand {
    /// Wraps 32 x-coordinate bytes, checking that they lift to a curve point.
    pub fn from_bytes(bytes: [u8; 32]) -> Result<Self, SignatureError> {
        hashing::lift_x(&bytes)?;
        Ok(Self(bytes))
    }

    /// Returns the x coordinate bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0
    }
}

impl fmt::Display for PublicRand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// An EOTS signature: the committed public randomness and the response
/// scalar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EotsSignature {
    /// The public randomness the signature was produced under. Callers must
    /// check it against the commitment published for the signed height.
    pub pub_rand: PublicRand,
    /// Response scalar `s`, big-endian.
    #[serde(with = "crate::serde_hex")]
    pub s: [u8; 32],
}

impl EotsSignature {
    /// Returns the 64-byte wire encoding `R_x || s`.
    pub fn to_bytes(&self) -> [u8; 64] {
        let mut out = [0u8; 64];
        out[..32].copy_from_slice(&self.pub_rand.0);
        out[32..].copy_from_slice(&self.s);
        out
    }

    /// Splits a 64-byte encoding, checking the randomness half lifts to a
    /// curve point.
    pub fn from_bytes(bytes: [u8; 64]) -> Result<Self, SignatureError> {
        let mut r = [0u8; 32];
        let mut s = [0u8; 32];
        r.copy_from_slice(&bytes[..32]);
        s.copy_from_slice(&bytes[32..]);
        Ok(Self {
            pub_rand: PublicRand::from_bytes(r)?,
            s,
        })
    }
}

/// Signs a digest under the given one-time randomness:
/// `s = k + H(R_x || P_x || m)·d` with parity-adjusted `k` and `d`.
///
/// This function has no memory of previous calls and cannot detect randomness
/// reuse; the ledger above it is the sole defense.
pub fn sign(sk: &SecretKey, secret_rand: &SecretRand, digest: &[u8; 32]) -> EotsSignature {
    let (d, p_x) = sk.signing_scalar();
    let r0 = secret_rand.scalar();
    let r_point = (ProjectivePoint::GENERATOR * r0).to_affine();
    let k = if bool::from(r_point.y_is_odd()) { -r0 } else { r0 };
    let r_x: [u8; 32] = r_point.x().into();

    let e = hashing::challenge(&r_x, &p_x, digest);
    let s = k + e * d;
    EotsSignature {
        pub_rand: PublicRand(r_x),
        s: s.to_bytes().into(),
    }
}

/// Verifies `s·G == R + e·P` where `R` is the signature's public randomness
/// lifted to even y.
pub fn verify(
    pk: &EotsPublicKey,
    digest: &[u8; 32],
    sig: &EotsSignature,
) -> Result<(), SignatureError> {
    let p = pk.to_point()?;
    let r = hashing::lift_x(&sig.pub_rand.0)?;
    let s = Option::<Scalar>::from(Scalar::from_repr(sig.s.into()))
        .ok_or(SignatureError::InvalidScalar)?;
    let e = hashing::challenge(&sig.pub_rand.0, &pk.to_bytes(), digest);

    let lhs = ProjectivePoint::GENERATOR * s;
    let rhs = r + p * e;
    if bool::from(lhs.is_identity()) || lhs != rhs {
        return Err(SignatureError::VerificationFailed);
    }
    Ok(())
}

/// Recovers the secret key from two signatures over *different* digests that
/// share the same one-time randomness.
///
/// Returns the parity-adjusted secret (the one with an even-y public point);
/// its x-only public key equals the original signer's.
pub fn extract_secret_key(
    pk: &EotsPublicKey,
    digest_a: &[u8; 32],
    sig_a: &EotsSignature,
    digest_b: &[u8; 32],
    sig_b: &EotsSignature,
) -> Result<SecretKey, SignatureError> {
    if sig_a.pub_rand != sig_b.pub_rand {
        return Err(SignatureError::VerificationFailed);
    }
    let s_a = Option::<Scalar>::from(Scalar::from_repr(sig_a.s.into()))
        .ok_or(SignatureError::InvalidScalar)?;
    let s_b = Option::<Scalar>::from(Scalar::from_repr(sig_b.s.into()))
        .ok_or(SignatureError::InvalidScalar)?;

    let e_a = hashing::challenge(&sig_a.pub_rand.0, &pk.to_bytes(), digest_a);
    let e_b = hashing::challenge(&sig_b.pub_rand.0, &pk.to_bytes(), digest_b);
    let denom = e_a - e_b;
    let denom_inv =
        Option::<Scalar>::from(denom.invert()).ok_or(SignatureError::EqualChallenges)?;

    let recovered = (s_a - s_b) * denom_inv;
    let secret = SecretKey::from_bytes(recovered.to_bytes().into())?;
    if secret.public_key() != *pk {
        return Err(SignatureError::VerificationFailed);
    }
    Ok(secret)
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
    fn derivation_is_deterministic_per_slot() {
        let sk = test_key(1);
        let (a, pub_a) = SecretRand::derive(&sk, b"chain-a", 100);
        let (b, pub_b) = SecretRand::derive(&sk, b"chain-a", 100);
        assert_eq!(a.to_bytes(), b.to_bytes());
        assert_eq!(pub_a, pub_b);
    }

    #[test]
    fn derivation_separates_heights_and_chains() {
        let sk = test_key(2);
        let (_, h100) = SecretRand::derive(&sk, b"chain-a", 100);
        let (_, h101) = SecretRand::derive(&sk, b"chain-a", 101);
        let (_, other_chain) = SecretRand::derive(&sk, b"chain-b", 100);
        assert_ne!(h100, h101);
        assert_ne!(h100, other_chain);
    }

    #[test]
    fn sign_and_verify_against_commitment() {
        let sk = test_key(3);
        let (secret_rand, pub_rand) = SecretRand::derive(&sk, b"chain-a", 7);
        let digest = [0x11u8; 32];
        let sig = sign(&sk, &secret_rand, &digest);
        assert_eq!(sig.pub_rand, pub_rand);
        verify(&sk.public_key(), &digest, &sig).expect("valid signature");
    }

    #[test]
    fn signing_is_deterministic() {
        let sk = test_key(4);
        let (secret_rand, _) = SecretRand::derive(&sk, b"chain-a", 9);
        let digest = [0x22u8; 32];
        assert_eq!(sign(&sk, &secret_rand, &digest), sign(&sk, &secret_rand, &digest));
    }

    #[test]
    fn verify_rejects_tampered_response() {
        let sk = test_key(5);
        let (secret_rand, _) = SecretRand::derive(&sk, b"chain-a", 11);
        let digest = [0x33u8; 32];
        let mut sig = sign(&sk, &secret_rand, &digest);
        sig.s[31] ^= 1;
        assert!(verify(&sk.public_key(), &digest, &sig).is_err());
    }

    #[test]
    fn randomness_reuse_extracts_the_secret_key() {
        let sk = test_key(6);
        let pk = sk.public_key();
        let (secret_rand, _) = SecretRand::derive(&sk, b"chain-a", 500);

        let digest_a = [0xaau8; 32];
        let digest_b = [0xbbu8; 32];
        let sig_a = sign(&sk, &secret_rand, &digest_a);
        let sig_b = sign(&sk, &secret_rand, &digest_b);

        let extracted = extract_secret_key(&pk, &digest_a, &sig_a, &digest_b, &sig_b)
            .expect("two distinct digests under one nonce leak the key");
        assert_eq!(extracted.public_key(), pk);
    }

    #[test]
    fn extraction_needs_distinct_digests() {
        let sk = test_key(7);
        let (secret_rand, _) = SecretRand::derive(&sk, b"chain-a", 501);
        let digest = [0xccu8; 32];
        let sig = sign(&sk, &secret_rand, &digest);
        let err = extract_secret_key(&sk.public_key(), &digest, &sig, &digest, &sig)
            .err()
            .expect("identical digests must not extract");
        assert_eq!(err, SignatureError::EqualChallenges);
    }
}
