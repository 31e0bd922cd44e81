//! Per-connection locks serializing schema read-modify-write sequences.
//!
//! Several resources (schema settings, table config, column config) may
//! address the same connection in one apply. Each of them reads the
//! connection's schema config, computes a patch and writes it back; the
//! registry makes that sequence exclusive per connection ID.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

/// Registry of named async mutexes keyed by connection ID.
#[derive(Debug, Clone, Default)]
pub struct SchemaLocks {
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl SchemaLocks {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to the schema of `connection_id`.
    ///
    /// The lock is held until the returned guard is dropped.
    pub async fn lock(&self, connection_id: &str) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(connection_id.to_string()).or_default())
        };

        debug!(connection_id = %connection_id, "Waiting for schema lock");
        mutex.lock_owned().await
    }

    /// Number of connections that have been locked at least once.
    pub fn len(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether no connection has been locked yet.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
