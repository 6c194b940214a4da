//! Per-key serialization of ledger-touching operations.

use std::collections::HashMap;
use std::sync::Arc;

use eots_core::keys::EotsPublicKey;
use tokio::sync::{Mutex, OwnedMutexGuard};

/// A table of per-key async locks.
///
/// Randomness commitment and EOTS signing for one key must not interleave,
/// otherwise two concurrent requests could both pass the signing-record check
/// before either writes its record. The table hands out one `tokio` mutex per
/// public key; the outer `parking_lot` mutex only guards the map itself and is
/// never held across an await point.
#[derive(Clone, Default)]
pub(crate) struct KeyLocks(Arc<parking_lot::Mutex<HashMap<EotsPublicKey, Arc<Mutex<()>>>>>);

impl KeyLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for the given key, waiting if another operation on
    /// the same key is in flight.
    pub(crate) async fn lock(&self, public_key: &EotsPublicKey) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = self.0.lock();
            Arc::clone(map.entry(*public_key).or_default())
        };
        lock.lock_owned().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use eots_core::keys::SecretKey;

    #[tokio::test]
    async fn locks_are_per_key() {
        let locks = KeyLocks::new();
        let pk_a = SecretKey::derive_from_path(&[1u8; 32], "a").public_key();
        let pk_b = SecretKey::derive_from_path(&[1u8; 32], "b").public_key();
        let guard_a = locks.lock(&pk_a).await;
        // A different key must not block.
        let _guard_b = locks.lock(&pk_b).await;
        // The same key must block until the guard drops.
        assert!(
            tokio::time::timeout(std::time::Duration::from_millis(50), locks.lock(&pk_a))
                .await
                .is_err()
        );
        drop(guard_a);
        let _ = locks.lock(&pk_a).await;
    }
}
