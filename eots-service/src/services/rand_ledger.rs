//! Committed randomness and signing records.
//!
//! The ledger stores one randomness commitment per `(public_key, chain_id,
//! height)` slot. The public half is stored in the clear, the private half is
//! sealed with ChaCha20-Poly1305 under a key derived from the signing key, so
//! a database dump alone never reveals usable nonces. Signing records remember
//! which digest was signed at a slot and guard against signing twice.

use blake3::Hasher;
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit as _, Nonce, aead::Aead as _};
use eots_core::eots::{EotsSignature, PublicRand, SecretRand};
use eots_core::keys::{EotsPublicKey, SecretKey};
use eots_types::ChainId;
use sqlx::SqlitePool;
use tracing::instrument;
use zeroize::Zeroize as _;

use crate::services::manager::ManagerError;

const LEDGER_SEAL_LABEL: &[u8] = b"eots-custodian/v1/ledger-seal";

/// Ledger of randomness commitments and signing records on top of a
/// `SqlitePool`.
#[derive(Clone)]
pub(crate) struct RandLedger {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct CommitmentRow {
    pub_rand: Vec<u8>,
    sealed_rand: Vec<u8>,
}

#[derive(sqlx::FromRow)]
struct SigningRecordRow {
    digest: Vec<u8>,
    signature: Vec<u8>,
}

impl RandLedger {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Derive and commit randomness for `count` consecutive heights starting
    /// at `start_height`. The whole batch is written in one transaction; if
    /// any height in the range is already committed, nothing is written and
    /// the first conflicting height is reported.
    #[instrument(level = "info", skip_all, fields(start_height = start_height, count = count))]
    pub(crate) async fn generate_commitments(
        &self,
        secret: &SecretKey,
        public_key: &EotsPublicKey,
        chain_id: &ChainId,
        start_height: u64,
        count: u32,
    ) -> Result<Vec<PublicRand>, ManagerError> {
        let end_height = start_height
            .checked_add(u64::from(count))
            .and_then(|end| i64::try_from(end).ok())
            .ok_or_else(|| {
                ManagerError::InvalidRequest("height range overflows".to_string())
            })?;
        let start = i64::try_from(start_height)
            .map_err(|_| ManagerError::InvalidRequest("height range overflows".to_string()))?;

        let mut tx = self.pool.begin().await?;
        let conflict: Option<(i64,)> = sqlx::query_as(
            "SELECT MIN(height) FROM rand_commitments
                WHERE public_key = $1 AND chain_id = $2 AND height >= $3 AND height < $4
                HAVING MIN(height) IS NOT NULL",
        )
        .bind(public_key.to_bytes().to_vec())
        .bind(chain_id.as_bytes().to_vec())
        .bind(start)
        .bind(end_height)
        .fetch_optional(&mut *tx)
        .await?;
        if let Some((height,)) = conflict {
            return Err(ManagerError::RandomnessAlreadyCommitted {
                height: height as u64,
            });
        }

        let mut public = Vec::with_capacity(count as usize);
        for offset in 0..u64::from(count) {
            let height = start_height + offset;
            let (secret_rand, pub_rand) = SecretRand::derive(secret, chain_id.as_bytes(), height);
            let sealed = seal_rand(secret, chain_id, height, &secret_rand)?;
            let result = sqlx::query(
                "INSERT INTO rand_commitments (public_key, chain_id, height, pub_rand, sealed_rand)
                    VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(public_key.to_bytes().to_vec())
            .bind(chain_id.as_bytes().to_vec())
            .bind(height as i64)
            .bind(pub_rand.to_bytes().to_vec())
            .bind(sealed)
            .execute(&mut *tx)
            .await;
            match result {
                Ok(_) => public.push(pub_rand),
                Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                    return Err(ManagerError::RandomnessAlreadyCommitted { height });
                }
                Err(err) => return Err(err.into()),
            }
        }
        tx.commit().await?;
        Ok(public)
    }

    /// Load and unseal the committed randomness for a slot.
    #[instrument(level = "debug", skip_all, fields(height = height))]
    pub(crate) async fn lookup(
        &self,
        secret: &SecretKey,
        public_key: &EotsPublicKey,
        chain_id: &ChainId,
        height: u64,
    ) -> Result<SecretRand, ManagerError> {
        let row: Option<CommitmentRow> = sqlx::query_as(
            "SELECT pub_rand, sealed_rand FROM rand_commitments
                WHERE public_key = $1 AND chain_id = $2 AND height = $3",
        )
        .bind(public_key.to_bytes().to_vec())
        .bind(chain_id.as_bytes().to_vec())
        .bind(height as i64)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Err(ManagerError::RandomnessNotFound { height });
        };
        let secret_rand = open_rand(secret, chain_id, height, &row.sealed_rand)?;
        // The unsealed randomness must match the public half we committed to.
        if secret_rand.public().to_bytes().as_slice() != row.pub_rand.as_slice() {
            return Err(ManagerError::Internal(eyre::eyre!(
                "ledger entry does not match its public randomness"
            )));
        }
        Ok(secret_rand)
    }

    /// Load the signing record for a slot, if one exists.
    pub(crate) async fn signing_record(
        &self,
        public_key: &EotsPublicKey,
        chain_id: &ChainId,
        height: u64,
    ) -> Result<Option<([u8; 32], EotsSignature)>, ManagerError> {
        let row: Option<SigningRecordRow> = sqlx::query_as(
            "SELECT digest, signature FROM signing_records
                WHERE public_key = $1 AND chain_id = $2 AND height = $3",
        )
        .bind(public_key.to_bytes().to_vec())
        .bind(chain_id.as_bytes().to_vec())
        .bind(height as i64)
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Ok(None);
        };
        let digest: [u8; 32] = row
            .digest
            .as_slice()
            .try_into()
            .map_err(|_| eyre::eyre!("signing record digest has unexpected length"))?;
        let signature: [u8; 64] = row
            .signature
            .as_slice()
            .try_into()
            .map_err(|_| eyre::eyre!("signing record signature has unexpected length"))?;
        let signature = EotsSignature::from_bytes(signature)
            .map_err(|err| eyre::eyre!("signing record signature is invalid: {err}"))?;
        Ok(Some((digest, signature)))
    }

    /// Record the digest and signature produced for a slot.
    pub(crate) async fn insert_signing_record(
        &self,
        public_key: &EotsPublicKey,
        chain_id: &ChainId,
        height: u64,
        digest: &[u8; 32],
        signature: &EotsSignature,
    ) -> Result<(), ManagerError> {
        sqlx::query(
            "INSERT INTO signing_records (public_key, chain_id, height, digest, signature)
                VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(public_key.to_bytes().to_vec())
        .bind(chain_id.as_bytes().to_vec())
        .bind(height as i64)
        .bind(digest.to_vec())
        .bind(signature.to_bytes().to_vec())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Derive the sealing key for ledger entries of a signing key.
fn seal_key(secret: &SecretKey) -> [u8; 32] {
    let mut sk_bytes = secret.to_bytes();
    let mut hasher = Hasher::new_keyed(&sk_bytes);
    hasher.update(LEDGER_SEAL_LABEL);
    sk_bytes.zeroize();
    hasher.finalize().into()
}

/// Derive the AEAD nonce for a ledger slot. Each sealing key encrypts a slot
/// at most once, so a deterministic nonce cannot repeat with a new plaintext.
fn slot_nonce(chain_id: &ChainId, height: u64) -> [u8; 12] {
    let mut hasher = Hasher::new();
    hasher.update(&(chain_id.as_bytes().len() as u64).to_be_bytes());
    hasher.update(chain_id.as_bytes());
    hasher.update(&height.to_be_bytes());
    let digest = hasher.finalize();
    let mut nonce = [0u8; 12];
    nonce.copy_from_slice(&digest.as_bytes()[..12]);
    nonce
}

fn seal_rand(
    secret: &SecretKey,
    chain_id: &ChainId,
    height: u64,
    secret_rand: &SecretRand,
) -> Result<Vec<u8>, ManagerError> {
    let mut key = seal_key(secret);
    let aead = ChaCha20Poly1305::new(Key::from_slice(&key));
    let mut plain = secret_rand.to_bytes();
    let sealed = aead
        .encrypt(
            Nonce::from_slice(&slot_nonce(chain_id, height)),
            plain.as_slice(),
        )
        .map_err(|_| eyre::eyre!("while sealing randomness"))?;
    plain.zeroize();
    key.zeroize();
    Ok(sealed)
}

fn open_rand(
    secret: &SecretKey,
    chain_id: &ChainId,
    height: u64,
    sealed: &[u8],
) -> Result<SecretRand, ManagerError> {
    let mut key = seal_key(secret);
    let aead = ChaCha20Poly1305::new(Key::from_slice(&key));
    let mut plain = aead
        .decrypt(Nonce::from_slice(&slot_nonce(chain_id, height)), sealed)
        .map_err(|_| eyre::eyre!("while unsealing randomness"))?;
    key.zeroize();
    let bytes: Result<[u8; 32], _> = plain.as_slice().try_into();
    let secret_rand = match bytes {
        Ok(mut bytes) => {
            let secret_rand = SecretRand::from_bytes(bytes).map_err(|err| {
                ManagerError::Internal(eyre::eyre!("sealed randomness is invalid: {err}"))
            });
            bytes.zeroize();
            secret_rand
        }
        Err(_) => Err(ManagerError::Internal(eyre::eyre!(
            "sealed randomness has unexpected length"
        ))),
    };
    plain.zeroize();
    secret_rand
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_and_open_round_trip() {
        let secret = SecretKey::derive_from_path(&[3u8; 32], "ledger-test");
        let chain_id = ChainId::from("test-chain");
        let (secret_rand, pub_rand) = SecretRand::derive(&secret, chain_id.as_bytes(), 42);
        let sealed = seal_rand(&secret, &chain_id, 42, &secret_rand).unwrap();
        let opened = open_rand(&secret, &chain_id, 42, &sealed).unwrap();
        assert_eq!(opened.public(), pub_rand);
    }

    #[test]
    fn slot_nonces_are_distinct() {
        let a = slot_nonce(&ChainId::from("chain-a"), 1);
        let b = slot_nonce(&ChainId::from("chain-a"), 2);
        let c = slot_nonce(&ChainId::from("chain-b"), 1);
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
