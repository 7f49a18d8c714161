//! In-memory token storage.

use crate::error::StorageError;
use crate::ledger::TokenRecord;
use crate::providers::TokenStorage;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// In-memory token storage.
///
/// Process-local and non-persistent. Clones share the same map, so one
/// instance can back several strategies. Nothing survives a restart, and
/// nothing is shared between processes: use
/// [`RedisTokenStorage`](crate::stores::RedisTokenStorage) for that.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStorage {
    records: Arc<Mutex<HashMap<String, TokenRecord>>>,
}

impl MemoryTokenStorage {
    /// Create empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of users with a stored record.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether no records are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }

    /// Drop all records.
    pub fn clear(&self) {
        self.records().clear();
    }

    // A panic while holding the lock cannot leave a record half-written:
    // every operation is a single map call.
    fn records(&self) -> MutexGuard<'_, HashMap<String, TokenRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TokenStorage for MemoryTokenStorage {
    async fn get(&self, user_key: &str) -> Result<Option<TokenRecord>, StorageError> {
        Ok(self.records().get(user_key).cloned())
    }

    async fn set(&self, user_key: &str, record: TokenRecord) -> Result<(), StorageError> {
        self.records().insert(user_key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, user_key: &str) -> Result<bool, StorageError> {
        Ok(self.records().remove(user_key).is_some())
    }
}
