//! Token storage trait.
//!
//! This module defines the trait for persisting per-user used-token ledgers
//! ([`TokenRecord`]), which back the replay check of the acceptance phase.

use crate::error::StorageError;
use crate::ledger::TokenRecord;
use std::future::Future;
use std::sync::Arc;

/// Used-token ledger storage.
///
/// Records are keyed by the value of the subject's primary key (e.g. the
/// user's email), one record per user.
///
/// # Implementation Notes
///
/// - `get` and `delete` must succeed for keys that were never written
/// - The strategy performs a read-modify-write (`get` then `set`) per
///   acceptance. Two concurrent acceptances for the same user may both read
///   the old record; implementations that need a strict guarantee must make
///   this atomic themselves.
/// - Records are small (one entry per unexpired redeemed token).
pub trait TokenStorage: Send + Sync {
    /// Load the ledger record for `user_key`.
    ///
    /// # Returns
    ///
    /// - `Ok(Some(record))`: a record exists
    /// - `Ok(None)`: nothing stored for this key
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails or the record cannot be decoded.
    fn get(
        &self,
        user_key: &str,
    ) -> impl Future<Output = Result<Option<TokenRecord>, StorageError>> + Send;

    /// Store `record` under `user_key`, replacing any previous record.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails or the record cannot be encoded.
    fn set(
        &self,
        user_key: &str,
        record: TokenRecord,
    ) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// Remove the record for `user_key`.
    ///
    /// # Returns
    ///
    /// `true` if a record was present.
    ///
    /// # Errors
    ///
    /// Returns error if the backend fails.
    fn delete(&self, user_key: &str) -> impl Future<Output = Result<bool, StorageError>> + Send;
}

impl<T: TokenStorage> TokenStorage for Arc<T> {
    fn get(
        &self,
        user_key: &str,
    ) -> impl Future<Output = Result<Option<TokenRecord>, StorageError>> + Send {
        (**self).get(user_key)
    }

    fn set(
        &self,
        user_key: &str,
        record: TokenRecord,
    ) -> impl Future<Output = Result<(), StorageError>> + Send {
        (**self).set(user_key, record)
    }

    fn delete(&self, user_key: &str) -> impl Future<Output = Result<bool, StorageError>> + Send {
        (**self).delete(user_key)
    }
}
