//! The custodian manager.
//!
//! [`EotsManager`] is the single entry point for all key operations. It owns
//! the [`Keystore`](super::keystore::Keystore), the
//! [`RandLedger`](super::rand_ledger::RandLedger) and the per-key lock table,
//! and enforces the one rule everything else exists for: one-time randomness
//! is used for exactly one digest.

use eots_core::eots::{self, EotsSignature, PublicRand};
use eots_core::keys::EotsPublicKey;
use eots_core::schnorr::{self, SchnorrSignature};
use eots_types::ChainId;
use serde::Serialize;
use sqlx::SqlitePool;
use tracing::instrument;

use crate::metrics::{
    METRICS_ID_CUSTODIAN_DOUBLE_SIGN_REJECTED, METRICS_ID_CUSTODIAN_KEYS_CREATED,
    METRICS_ID_CUSTODIAN_RANDOMNESS_COMMITTED, METRICS_ID_CUSTODIAN_SIGN_EOTS,
    METRICS_ID_CUSTODIAN_SIGN_EOTS_REPLAYS, METRICS_ID_CUSTODIAN_SIGN_SCHNORR,
};
use crate::services::key_locks::KeyLocks;
use crate::services::keystore::Keystore;
use crate::services::rand_ledger::RandLedger;

/// Errors reported by the [`EotsManager`].
#[derive(Debug, thiserror::Error)]
pub enum ManagerError {
    /// A key with the requested name already exists.
    #[error("a key named \"{0}\" already exists")]
    KeyAlreadyExists(String),
    /// No key is stored under the requested public key.
    #[error("unknown key")]
    KeyNotFound,
    /// The passphrase does not open the sealed key.
    #[error("invalid passphrase")]
    InvalidPassphrase,
    /// A height in the requested range already carries a commitment.
    #[error("randomness for height {height} is already committed")]
    RandomnessAlreadyCommitted {
        /// First conflicting height in the requested range.
        height: u64,
    },
    /// No randomness commitment exists for the requested height.
    #[error("no randomness committed for height {height}")]
    RandomnessNotFound {
        /// The requested height.
        height: u64,
    },
    /// The height was already signed for a different digest.
    #[error("height {height} was already signed for a different digest")]
    DoubleSign {
        /// The already-signed height.
        height: u64,
    },
    /// The request is malformed.
    #[error("{0}")]
    InvalidRequest(String),
    /// Database failure.
    #[error(transparent)]
    Storage(#[from] sqlx::Error),
    /// Any other internal failure.
    #[error(transparent)]
    Internal(#[from] eyre::Report),
}

/// Public record of a stored key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRecord {
    /// Human-readable key name.
    pub name: String,
    /// x-only public key.
    pub public_key: EotsPublicKey,
}

/// The custodian manager. Cheap to clone; all clones share the same pool and
/// lock table.
#[derive(Clone)]
pub struct EotsManager {
    keystore: Keystore,
    ledger: RandLedger,
    key_locks: KeyLocks,
}

impl EotsManager {
    /// Creates a manager on top of an initialized database pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            keystore: Keystore::new(pool.clone()),
            ledger: RandLedger::new(pool),
            key_locks: KeyLocks::new(),
        }
    }

    /// Generates a new key, seals it with the passphrase and stores it under
    /// `name`. With a derivation path the key is derived from fresh seed
    /// entropy and the path instead of raw entropy.
    #[instrument(level = "info", skip_all, fields(name = name))]
    pub async fn create_key(
        &self,
        name: &str,
        passphrase: &str,
        derivation_path: Option<&str>,
    ) -> Result<EotsPublicKey, ManagerError> {
        let public_key = self
            .keystore
            .create_key(name, passphrase, derivation_path)
            .await?;
        tracing::info!("created key \"{name}\" with public key {public_key}");
        metrics::counter!(METRICS_ID_CUSTODIAN_KEYS_CREATED).increment(1);
        Ok(public_key)
    }

    /// Loads the record of the key identified by its public key.
    #[instrument(level = "debug", skip_all)]
    pub async fn key_record(
        &self,
        public_key: &EotsPublicKey,
        passphrase: &str,
    ) -> Result<KeyRecord, ManagerError> {
        self.keystore.key_record(public_key, passphrase).await
    }

    /// Derives and commits public randomness for `count` consecutive heights
    /// starting at `start_height`, returning the public commitments in height
    /// order. The batch is all-or-nothing.
    #[instrument(level = "info", skip_all, fields(start_height = start_height, count = count))]
    pub async fn create_randomness_pair_list(
        &self,
        public_key: &EotsPublicKey,
        chain_id: &ChainId,
        start_height: u64,
        count: u32,
        passphrase: &str,
    ) -> Result<Vec<PublicRand>, ManagerError> {
        if count == 0 {
            return Err(ManagerError::InvalidRequest(
                "count must be positive".to_string(),
            ));
        }
        let unlocked = self.keystore.unlock(public_key, passphrase).await?;
        let _guard = self.key_locks.lock(public_key).await;
        let public = self
            .ledger
            .generate_commitments(&unlocked.secret, public_key, chain_id, start_height, count)
            .await?;
        tracing::info!(
            "committed randomness for {count} heights starting at {start_height} on chain {chain_id}"
        );
        metrics::counter!(METRICS_ID_CUSTODIAN_RANDOMNESS_COMMITTED).increment(u64::from(count));
        Ok(public)
    }

    /// Produces a plain BIP-340 Schnorr signature over the digest. The nonce
    /// is derived from key and digest, so this never touches the ledger.
    #[instrument(level = "debug", skip_all)]
    pub async fn sign_schnorr(
        &self,
        public_key: &EotsPublicKey,
        digest: &[u8; 32],
        passphrase: &str,
    ) -> Result<SchnorrSignature, ManagerError> {
        let unlocked = self.keystore.unlock(public_key, passphrase).await?;
        let signature = schnorr::sign(&unlocked.secret, digest);
        metrics::counter!(METRICS_ID_CUSTODIAN_SIGN_SCHNORR).increment(1);
        Ok(signature)
    }

    /// Produces an EOTS signature over the digest at `(chain_id, height)`
    /// using the randomness committed for that slot.
    ///
    /// Repeating a request for an already-signed slot with the *same* digest
    /// returns the recorded signature. A different digest for a signed slot is
    /// refused, no matter what: signing it would hand out the key.
    #[instrument(level = "info", skip_all, fields(height = height))]
    pub async fn sign_eots(
        &self,
        public_key: &EotsPublicKey,
        chain_id: &ChainId,
        digest: &[u8; 32],
        height: u64,
        passphrase: &str,
    ) -> Result<EotsSignature, ManagerError> {
        let unlocked = self.keystore.unlock(public_key, passphrase).await?;
        let _guard = self.key_locks.lock(public_key).await;

        if let Some((recorded_digest, recorded_signature)) = self
            .ledger
            .signing_record(public_key, chain_id, height)
            .await?
        {
            if recorded_digest == *digest {
                tracing::debug!("replaying recorded signature for height {height}");
                metrics::counter!(METRICS_ID_CUSTODIAN_SIGN_EOTS_REPLAYS).increment(1);
                return Ok(recorded_signature);
            }
            tracing::warn!(
                "refusing to sign a second digest for height {height} on chain {chain_id}"
            );
            metrics::counter!(METRICS_ID_CUSTODIAN_DOUBLE_SIGN_REJECTED).increment(1);
            return Err(ManagerError::DoubleSign { height });
        }

        let secret_rand = self
            .ledger
            .lookup(&unlocked.secret, public_key, chain_id, height)
            .await?;
        let signature = eots::sign(&unlocked.secret, &secret_rand, digest);
        self.ledger
            .insert_signing_record(public_key, chain_id, height, digest, &signature)
            .await?;
        metrics::counter!(METRICS_ID_CUSTODIAN_SIGN_EOTS).increment(1);
        Ok(signature)
    }
}
