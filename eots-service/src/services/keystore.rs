//! Passphrase-sealed key storage.
//!
//! Secret keys never touch the database in the clear. Each key is sealed with
//! ChaCha20-Poly1305 under a key-encryption key derived from the passphrase
//! with Argon2id and a per-key random salt. The keystore never stores or
//! verifies the passphrase itself; an AEAD open failure is the only signal
//! that the passphrase is wrong.

use argon2::{Algorithm, Argon2, Params, Version};
use chacha20poly1305::{ChaCha20Poly1305, Key, KeyInit as _, Nonce, aead::Aead as _};
use eots_core::keys::{EotsPublicKey, SecretKey};
use rand::{RngCore as _, rngs::OsRng};
use sqlx::SqlitePool;
use tracing::instrument;
use zeroize::Zeroize as _;

use crate::services::manager::{KeyRecord, ManagerError};

const ARGON2_MEMORY_KIB: u32 = 19456;
const ARGON2_ITERATIONS: u32 = 2;
const ARGON2_PARALLELISM: u32 = 1;

const SALT_LEN: usize = 16;
const NONCE_LEN: usize = 12;

/// Passphrase-sealed key storage on top of a `SqlitePool`.
#[derive(Clone)]
pub(crate) struct Keystore {
    pool: SqlitePool,
}

/// A key freshly unsealed with its passphrase. Lives on the stack of a single
/// operation and is zeroized on drop through [`SecretKey`].
pub(crate) struct UnlockedKey {
    pub(crate) name: String,
    pub(crate) public_key: EotsPublicKey,
    pub(crate) secret: SecretKey,
}

#[derive(sqlx::FromRow)]
struct SealedKeyRow {
    name: String,
    public_key: Vec<u8>,
    salt: Vec<u8>,
    nonce: Vec<u8>,
    cipher: Vec<u8>,
}

impl Keystore {
    pub(crate) fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Generate a new key, seal it with the passphrase and store it under the
    /// given name. Fails if the name or the resulting public key is taken.
    #[instrument(level = "info", skip_all, fields(name = name))]
    pub(crate) async fn create_key(
        &self,
        name: &str,
        passphrase: &str,
        derivation_path: Option<&str>,
    ) -> Result<EotsPublicKey, ManagerError> {
        if name.is_empty() {
            return Err(ManagerError::InvalidRequest(
                "key name must not be empty".to_string(),
            ));
        }
        let existing: Option<(String,)> = sqlx::query_as("SELECT name FROM keys WHERE name = $1")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(ManagerError::KeyAlreadyExists(name.to_string()));
        }

        let secret = match derivation_path {
            Some(path) => {
                let mut seed = [0u8; 32];
                OsRng.fill_bytes(&mut seed);
                let secret = SecretKey::derive_from_path(&seed, path);
                seed.zeroize();
                secret
            }
            None => SecretKey::random(&mut OsRng),
        };
        let public_key = secret.public_key();

        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let mut nonce = [0u8; NONCE_LEN];
        OsRng.fill_bytes(&mut nonce);
        let cipher = seal_secret(&secret, passphrase, &salt, &nonce)?;

        let result = sqlx::query(
            "INSERT INTO keys (name, public_key, salt, nonce, cipher) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(name)
        .bind(public_key.to_bytes().to_vec())
        .bind(salt.to_vec())
        .bind(nonce.to_vec())
        .bind(cipher)
        .execute(&self.pool)
        .await;
        match result {
            Ok(_) => Ok(public_key),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => {
                Err(ManagerError::KeyAlreadyExists(name.to_string()))
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Load the record (name and public key) of the key identified by its
    /// public key. The passphrase must open the sealed secret, otherwise the
    /// caller does not get to learn anything about the record.
    #[instrument(level = "debug", skip_all)]
    pub(crate) async fn key_record(
        &self,
        public_key: &EotsPublicKey,
        passphrase: &str,
    ) -> Result<KeyRecord, ManagerError> {
        let unlocked = self.unlock(public_key, passphrase).await?;
        Ok(KeyRecord {
            name: unlocked.name,
            public_key: unlocked.public_key,
        })
    }

    /// Unseal the key identified by its public key with the passphrase.
    #[instrument(level = "debug", skip_all)]
    pub(crate) async fn unlock(
        &self,
        public_key: &EotsPublicKey,
        passphrase: &str,
    ) -> Result<UnlockedKey, ManagerError> {
        let row: Option<SealedKeyRow> = sqlx::query_as(
            "SELECT name, public_key, salt, nonce, cipher FROM keys WHERE public_key = $1",
        )
        .bind(public_key.to_bytes().to_vec())
        .fetch_optional(&self.pool)
        .await?;
        let Some(row) = row else {
            return Err(ManagerError::KeyNotFound);
        };
        let secret = open_secret(&row, passphrase)?;
        // The sealed secret must reproduce the public key it is stored under.
        if secret.public_key() != *public_key {
            return Err(ManagerError::Internal(eyre::eyre!(
                "stored key does not match its public key"
            )));
        }
        Ok(UnlockedKey {
            name: row.name,
            public_key: *public_key,
            secret,
        })
    }
}

/// Derive the key-encryption key from the passphrase and salt with Argon2id.
fn derive_kek(passphrase: &str, salt: &[u8]) -> eyre::Result<[u8; 32]> {
    let params = Params::new(
        ARGON2_MEMORY_KIB,
        ARGON2_ITERATIONS,
        ARGON2_PARALLELISM,
        Some(32),
    )
    .map_err(|err| eyre::eyre!("invalid Argon2 params: {err}"))?;
    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);
    let mut kek = [0u8; 32];
    argon2
        .hash_password_into(passphrase.as_bytes(), salt, &mut kek)
        .map_err(|err| eyre::eyre!("while deriving key-encryption key: {err}"))?;
    Ok(kek)
}

fn seal_secret(
    secret: &SecretKey,
    passphrase: &str,
    salt: &[u8],
    nonce: &[u8],
) -> Result<Vec<u8>, ManagerError> {
    let mut kek = derive_kek(passphrase, salt)?;
    let aead = ChaCha20Poly1305::new(Key::from_slice(&kek));
    let mut plain = secret.to_bytes();
    let cipher = aead
        .encrypt(Nonce::from_slice(nonce), plain.as_slice())
        .map_err(|_| eyre::eyre!("while sealing secret key"))?;
    plain.zeroize();
    kek.zeroize();
    Ok(cipher)
}

fn open_secret(row: &SealedKeyRow, passphrase: &str) -> Result<SecretKey, ManagerError> {
    let mut kek = derive_kek(passphrase, &row.salt)?;
    let aead = ChaCha20Poly1305::new(Key::from_slice(&kek));
    let mut plain = aead
        .decrypt(Nonce::from_slice(&row.nonce), row.cipher.as_slice())
        .map_err(|_| ManagerError::InvalidPassphrase)?;
    kek.zeroize();
    let bytes: Result<[u8; 32], _> = plain.as_slice().try_into();
    let secret = match bytes {
        Ok(mut bytes) => {
            let secret = SecretKey::from_bytes(bytes).map_err(|err| {
                ManagerError::Internal(eyre::eyre!("stored secret is invalid: {err}"))
            });
            bytes.zeroize();
            secret
        }
        Err(_) => Err(ManagerError::Internal(eyre::eyre!(
            "sealed secret has unexpected length"
        ))),
    };
    plain.zeroize();
    secret
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kek_derivation_is_deterministic_per_salt() {
        let a = derive_kek("hunter2", b"0123456789abcdef").unwrap();
        let b = derive_kek("hunter2", b"0123456789abcdef").unwrap();
        let c = derive_kek("hunter2", b"fedcba9876543210").unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn seal_and_open_round_trip() {
        let secret = SecretKey::derive_from_path(&[7u8; 32], "test");
        let salt = [1u8; SALT_LEN];
        let nonce = [2u8; NONCE_LEN];
        let cipher = seal_secret(&secret, "correct horse", &salt, &nonce).unwrap();
        let row = SealedKeyRow {
            name: "test".to_string(),
            public_key: secret.public_key().to_bytes().to_vec(),
            salt: salt.to_vec(),
            nonce: nonce.to_vec(),
            cipher,
        };
        let opened = open_secret(&row, "correct horse").unwrap();
        assert_eq!(opened.public_key(), secret.public_key());
        assert!(matches!(
            open_secret(&row, "battery staple"),
            Err(ManagerError::InvalidPassphrase)
        ));
    }
}
