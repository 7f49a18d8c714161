//! Redis-based token storage implementation.
//!
//! Used-token ledgers are stored in Redis so that replay protection holds
//! across every process serving the same users.
//!
//! # Architecture
//!
//! - **Key**: `auth:used_tokens:{user_key}` → JSON-serialized [`TokenRecord`]
//! - **TTL**: the latest expiration in the record, so a ledger whose tokens
//!   have all expired is evicted by Redis on its own
//! - **Empty record**: deletes the key instead of storing `{}`
//!
//! # Concurrency
//!
//! The strategy performs `GET` then `SET`. Two acceptances racing for the
//! same user can both pass the replay check. Deployments that need a strict
//! single-use guarantee should wrap this store with their own locking.
//!
//! # Example
//!
//! ```no_run
//! use magic_link_auth::stores::RedisTokenStorage;
//! use magic_link_auth::providers::TokenStorage;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let storage = RedisTokenStorage::new("redis://127.0.0.1:6379").await?;
//!
//! let record = storage.get("user@example.com").await?;
//! println!("{} tokens on record", record.map_or(0, |r| r.len()));
//! # Ok(())
//! # }
//! ```

use crate::error::StorageError;
use crate::ledger::TokenRecord;
use crate::providers::TokenStorage;
use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};

/// `Redis`-based used-token storage.
///
/// # Thread Safety
///
/// This type is `Clone` and can be safely shared across threads.
/// Each clone shares the same `ConnectionManager`.
#[derive(Clone)]
pub struct RedisTokenStorage {
    /// Connection manager for connection reuse.
    conn_manager: ConnectionManager,
}

impl RedisTokenStorage {
    /// Create a new `Redis` token storage.
    ///
    /// # Arguments
    ///
    /// * `redis_url` - `Redis` connection URL (e.g., "<redis://127.0.0.1:6379>")
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - `Redis` URL is malformed
    /// - Connection to `Redis` server fails
    pub async fn new(redis_url: &str) -> Result<Self, StorageError> {
        let client = Client::open(redis_url).map_err(|e| {
            StorageError::Backend(format!("Failed to create Redis client: {e}"))
        })?;

        let conn_manager = ConnectionManager::new(client).await.map_err(|e| {
            StorageError::Backend(format!("Failed to create Redis connection manager: {e}"))
        })?;

        tracing::info!("RedisTokenStorage initialized successfully");

        Ok(Self { conn_manager })
    }

    /// Get the `Redis` key for a user's ledger.
    ///
    /// # Key Format
    ///
    /// `auth:used_tokens:{user_key}`
    fn ledger_key(user_key: &str) -> String {
        format!("auth:used_tokens:{user_key}")
    }
}

/// Seconds until the last entry of `record` expires, at least one.
fn record_ttl_seconds(record: &TokenRecord, now_ms: i64) -> u64 {
    let latest = record.values().copied().max().unwrap_or(now_ms);
    let remaining_ms = latest.saturating_sub(now_ms).max(0);

    #[allow(clippy::cast_sign_loss)]
    let seconds = (remaining_ms as u64).div_ceil(1000);
    seconds.max(1)
}

impl std::fmt::Debug for RedisTokenStorage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisTokenStorage").finish_non_exhaustive()
    }
}

impl TokenStorage for RedisTokenStorage {
    async fn get(&self, user_key: &str) -> Result<Option<TokenRecord>, StorageError> {
        let mut conn = self.conn_manager.clone();
        let key = Self::ledger_key(user_key);

        let raw: Option<String> = conn
            .get(&key)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to load ledger: {e}")))?;

        raw.map(|json| serde_json::from_str(&json))
            .transpose()
            .map_err(StorageError::from)
    }

    async fn set(&self, user_key: &str, record: TokenRecord) -> Result<(), StorageError> {
        let mut conn = self.conn_manager.clone();
        let key = Self::ledger_key(user_key);

        if record.is_empty() {
            let _: i64 = conn
                .del(&key)
                .await
                .map_err(|e| StorageError::Backend(format!("Failed to clear ledger: {e}")))?;
            return Ok(());
        }

        let json = serde_json::to_string(&record)?;
        let ttl_seconds = record_ttl_seconds(&record, Utc::now().timestamp_millis());

        // SETEX is atomic: SET + EXPIRE in one command
        let _: () = conn
            .set_ex(&key, json, ttl_seconds)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to store ledger: {e}")))?;

        tracing::debug!(
            entries = record.len(),
            ttl_seconds = ttl_seconds,
            "Stored used-token ledger in Redis"
        );

        Ok(())
    }

    async fn delete(&self, user_key: &str) -> Result<bool, StorageError> {
        let mut conn = self.conn_manager.clone();
        let key = Self::ledger_key(user_key);

        let deleted: i64 = conn
            .del(&key)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to delete ledger: {e}")))?;

        Ok(deleted > 0)
    }
}
