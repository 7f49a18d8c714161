//! Error types for magic link authentication.
//!
//! Errors come in three families:
//!
//! - [`ConfigError`]: strategy setup is invalid (fatal, raised at construction)
//! - [`StorageError`]: a [`TokenStorage`](crate::providers::TokenStorage) backend failed
//! - [`AuthError`]: an unexpected fault while authenticating a request
//!
//! Expected authentication outcomes ("Token missing", "Invalid token", ...)
//! are *not* errors. They are reported as
//! [`AuthOutcome::Fail`](crate::strategy::AuthOutcome::Fail).

use thiserror::Error;

/// Result type alias for authentication operations.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Configuration and setup errors.
///
/// Raised synchronously while building a
/// [`MagicLinkStrategy`](crate::strategy::MagicLinkStrategy) or parsing
/// options supplied by the host runtime.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    // ═══════════════════════════════════════════════════════════
    // Validation
    // ═══════════════════════════════════════════════════════════

    /// Signing secret is empty or whitespace.
    #[error("Magic link strategy requires a secret")]
    MissingSecret,

    /// No user fields were configured.
    #[error("Magic link strategy requires an array of mandatory user fields")]
    MissingUserFields,

    /// A configured user field name is empty or whitespace.
    #[error("User field at position {index} must be a non-empty string")]
    InvalidUserField {
        /// Position of the offending entry in `user_fields`
        index: usize,
    },

    /// Token field name is empty or whitespace.
    #[error("Magic link strategy requires a token field")]
    MissingTokenField,

    /// Token lifetime outside of `[1, 86400]` seconds.
    #[error("Token TTL must be between 1 and 86400 seconds, got {0}")]
    TtlOutOfRange(u64),

    /// Signing algorithm is not an HMAC algorithm.
    #[error("Unsupported signing algorithm: {0}")]
    UnsupportedAlgorithm(String),

    // ═══════════════════════════════════════════════════════════
    // Host runtime input
    // ═══════════════════════════════════════════════════════════

    /// Action selector is neither `requestToken` nor `acceptToken`.
    #[error("Unknown action: {0}")]
    UnknownAction(String),

    // ═══════════════════════════════════════════════════════════
    // Environment loading
    // ═══════════════════════════════════════════════════════════

    /// Required environment variable is not set.
    #[error("Environment variable not set: {0}")]
    EnvVarNotSet(String),

    /// Environment variable is set but cannot be parsed.
    #[error("Invalid value for {var}: {value}")]
    InvalidEnvValue {
        /// Variable name
        var: String,
        /// Raw value that failed to parse
        value: String,
    },
}

/// Token storage backend errors.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend rejected or failed the operation.
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// A stored record could not be (de)serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Internal authentication error.
///
/// Every variant displays the same generic message so that nothing about
/// the underlying fault reaches the client. The cause stays available to
/// server-side diagnostics through [`std::error::Error::source`].
#[derive(Debug, Error)]
pub enum AuthError {
    /// An integrator callback (`send_token` or `verify_user`) failed.
    #[error("Authentication failed")]
    Callback(#[source] anyhow::Error),

    /// The token could not be signed.
    #[error("Authentication failed")]
    Signing(#[source] jsonwebtoken::errors::Error),

    /// The used-token ledger could not be loaded or persisted.
    #[error("Authentication failed")]
    Storage(#[from] StorageError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_internal_errors_do_not_leak_cause() {
        let err = AuthError::Callback(anyhow::anyhow!("smtp relay refused connection"));
        assert_eq!(err.to_string(), "Authentication failed");

        let source = err.source().map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("smtp relay refused connection"));
    }

    #[test]
    fn test_storage_error_converts_to_auth_error() {
        let err: AuthError = StorageError::Backend("connection reset".to_string()).into();
        assert!(matches!(err, AuthError::Storage(_)));
        assert_eq!(err.to_string(), "Authentication failed");
    }

    #[test]
    fn test_config_error_messages() {
        assert_eq!(
            ConfigError::TtlOutOfRange(0).to_string(),
            "Token TTL must be between 1 and 86400 seconds, got 0"
        );
        assert_eq!(
            ConfigError::InvalidUserField { index: 2 }.to_string(),
            "User field at position 2 must be a non-empty string"
        );
    }
}
