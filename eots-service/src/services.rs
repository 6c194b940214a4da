//! Service layer of the custodian.
//!
//! The service layer is composed of the [`Keystore`](keystore::Keystore)
//! (passphrase-sealed key storage), the [`RandLedger`](rand_ledger::RandLedger)
//! (committed randomness and signing records) and the
//! [`EotsManager`](manager::EotsManager), which ties both together with a
//! per-key lock table and exposes the operations the API layer calls.

use eyre::Context as _;
use sqlx::SqlitePool;

pub(crate) mod key_locks;
pub(crate) mod keystore;
pub mod manager;
pub(crate) mod rand_ledger;

/// Create the custodian tables if they do not exist yet.
///
/// The `rand_commitments` and `signing_records` tables share the
/// `(public_key, chain_id, height)` primary key. It is the storage-level
/// backstop for the one-commitment-per-slot and one-record-per-slot rules.
pub(crate) async fn init_schema(pool: &SqlitePool) -> eyre::Result<()> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS keys (
            name TEXT PRIMARY KEY,
            public_key BLOB NOT NULL UNIQUE,
            salt BLOB NOT NULL,
            nonce BLOB NOT NULL,
            cipher BLOB NOT NULL
        )",
    )
    .execute(pool)
    .await
    .context("while creating keys table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS rand_commitments (
            public_key BLOB NOT NULL,
            chain_id BLOB NOT NULL,
            height INTEGER NOT NULL,
            pub_rand BLOB NOT NULL,
            sealed_rand BLOB NOT NULL,
            PRIMARY KEY (public_key, chain_id, height)
        )",
    )
    .execute(pool)
    .await
    .context("while creating rand_commitments table")?;

    sqlx::query(
        "CREATE TABLE IF NOT EXISTS signing_records (
            public_key BLOB NOT NULL,
            chain_id BLOB NOT NULL,
            height INTEGER NOT NULL,
            digest BLOB NOT NULL,
            signature BLOB NOT NULL,
            PRIMARY KEY (public_key, chain_id, height)
        )",
    )
    .execute(pool)
    .await
    .context("while creating signing_records table")?;

    Ok(())
}
