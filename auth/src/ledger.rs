//! Used-token ledger.
//!
//! A [`UsedTokens`] ledger records which tokens a single user has already
//! redeemed, together with the instant each token stops being valid. Once a
//! token has expired it can no longer pass signature verification, so its
//! ledger entry is dead weight and is pruned.
//!
//! The ledger is loaded from [`TokenStorage`](crate::providers::TokenStorage)
//! at the start of an acceptance check and written back at its end.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// Serialized ledger: token to expiration in unix milliseconds.
pub type TokenRecord = HashMap<String, i64>;

/// Per-user record of accepted tokens.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedTokens {
    tokens: HashMap<String, i64>,
}

impl UsedTokens {
    /// Create an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a ledger from its stored record.
    #[must_use]
    pub fn from_record(record: TokenRecord) -> Self {
        Self { tokens: record }
    }

    /// Snapshot the ledger for storage.
    #[must_use]
    pub fn to_record(&self) -> TokenRecord {
        self.tokens.clone()
    }

    /// Whether `token` has been recorded.
    #[must_use]
    pub fn has_been_used(&self, token: &str) -> bool {
        self.tokens.contains_key(token)
    }

    /// Record `token` as used until `expiration_secs` (unix seconds).
    ///
    /// Re-recording a token replaces its expiration.
    pub fn mark_as_used(&mut self, token: impl Into<String>, expiration_secs: i64) {
        self.tokens
            .insert(token.into(), expiration_secs.saturating_mul(1000));
    }

    /// Stored expiration of `token` in unix milliseconds.
    #[must_use]
    pub fn expiration_millis(&self, token: &str) -> Option<i64> {
        self.tokens.get(token).copied()
    }

    /// Drop every entry that has expired by now.
    ///
    /// Returns the number of entries removed.
    pub fn remove_expired_tokens(&mut self) -> usize {
        self.remove_expired_tokens_at(Utc::now())
    }

    /// Drop every entry whose expiration is at or before `now`.
    ///
    /// Returns the number of entries removed.
    pub fn remove_expired_tokens_at(&mut self, now: DateTime<Utc>) -> usize {
        let now_ms = now.timestamp_millis();
        let before = self.tokens.len();
        self.tokens.retain(|_, expires_ms| *expires_ms > now_ms);
        before - self.tokens.len()
    }

    /// Number of recorded tokens.
    #[must_use]
    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    /// Whether no tokens are recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl From<TokenRecord> for UsedTokens {
    fn from(record: TokenRecord) -> Self {
        Self::from_record(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use proptest::prelude::*;

    #[test]
    fn test_mark_and_check() {
        let mut ledger = UsedTokens::new();
        assert!(!ledger.has_been_used("t1"));

        ledger.mark_as_used("t1", 1_700_000_000);
        assert!(ledger.has_been_used("t1"));
        assert_eq!(ledger.expiration_millis("t1"), Some(1_700_000_000_000));
    }

    #[test]
    fn test_last_write_wins() {
        let mut ledger = UsedTokens::new();
        ledger.mark_as_used("t1", 10);
        ledger.mark_as_used("t1", 20);

        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.expiration_millis("t1"), Some(20_000));
    }

    #[test]
    fn test_remove_expired_tokens() {
        let now = Utc::now();
        let mut ledger = UsedTokens::new();
        ledger.mark_as_used("expired", (now - Duration::minutes(1)).timestamp());
        ledger.mark_as_used("live", (now + Duration::minutes(10)).timestamp());

        assert_eq!(ledger.remove_expired_tokens(), 1);
        assert!(!ledger.has_been_used("expired"));
        assert!(ledger.has_been_used("live"));
    }

    #[test]
    fn test_expiration_boundary_is_pruned() {
        let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
        let mut ledger = UsedTokens::new();
        ledger.mark_as_used("boundary", now.timestamp());
        ledger.mark_as_used("next", now.timestamp() + 1);

        assert_eq!(ledger.remove_expired_tokens_at(now), 1);
        assert!(ledger.has_been_used("next"));
    }

    #[test]
    fn test_record_round_trip() {
        let mut ledger = UsedTokens::new();
        ledger.mark_as_used("a", 100);
        ledger.mark_as_used("b", 200);

        let rebuilt = UsedTokens::from(ledger.to_record());
        assert_eq!(rebuilt, ledger);
    }

    proptest! {
        #[test]
        fn prop_record_round_trip(
            entries in prop::collection::hash_map(
                "[a-z0-9.]{1,24}",
                -1_000_000i64..4_000_000_000,
                0..32,
            ),
        ) {
            let mut ledger = UsedTokens::new();
            for (token, exp) in &entries {
                ledger.mark_as_used(token.clone(), *exp);
            }

            let rebuilt = UsedTokens::from_record(ledger.to_record());
            prop_assert_eq!(&rebuilt, &ledger);
            for (token, exp) in &entries {
                prop_assert!(rebuilt.has_been_used(token));
                prop_assert_eq!(rebuilt.expiration_millis(token), Some(exp * 1000));
            }
        }

        #[test]
        fn prop_pruning_is_idempotent(
            entries in prop::collection::hash_map(
                "[a-z]{1,12}",
                1_699_999_000_000i64..1_700_001_000_000,
                0..32,
            ),
        ) {
            let now = DateTime::from_timestamp(1_700_000_000, 0).unwrap_or_default();
            let mut ledger = UsedTokens::from_record(entries);

            ledger.remove_expired_tokens_at(now);
            let once = ledger.clone();
            let removed_again = ledger.remove_expired_tokens_at(now);

            prop_assert_eq!(removed_again, 0);
            prop_assert_eq!(ledger, once);
        }
    }
}
