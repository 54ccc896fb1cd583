//! Per-entity locks with bounded acquisition.
//!
//! Movement and count workflows read an entity, decide, then write it back.
//! The lock map serializes those read-modify-write sections per entity id so
//! two callers cannot interleave on the same movement or count. Waiting is
//! bounded: a caller that cannot take the lock inside the timeout gets
//! `Busy` and is expected to retry instead of queueing indefinitely.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;

use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use stockyard_core::{LedgerError, LedgerResult};

/// Default bound on lock waits, shared with the balance stores.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(5);

/// One async mutex per entity id, created on first use.
///
/// Entries live for the lifetime of the map; the population is bounded by
/// the number of distinct entities ever locked.
#[derive(Debug)]
pub struct LockMap {
    locks: StdMutex<HashMap<Uuid, Arc<Mutex<()>>>>,
    timeout: Duration,
}

impl LockMap {
    pub fn new(timeout: Duration) -> Self {
        Self {
            locks: StdMutex::new(HashMap::new()),
            timeout,
        }
    }

    /// Takes the lock for `id`, waiting at most the configured timeout.
    ///
    /// The returned guard releases the lock on drop.
    pub async fn acquire(&self, id: impl Into<Uuid>) -> LedgerResult<OwnedMutexGuard<()>> {
        let id = id.into();
        let entry = {
            let mut locks = self
                .locks
                .lock()
                .map_err(|_| LedgerError::storage("lock map poisoned"))?;
            Arc::clone(locks.entry(id).or_default())
        };

        tokio::time::timeout(self.timeout, entry.lock_owned())
            .await
            .map_err(|_| LedgerError::busy(format!("entity {id} is locked by another request")))
    }
}

impl Default for LockMap {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}
