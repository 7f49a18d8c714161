//! Magic link authentication strategy.
//!
//! This strategy implements passwordless authentication via "magic links".
//!
//! # Flow
//!
//! 1. Client requests a token, supplying the configured user fields
//! 2. (optional) `verify_user` resolves the fields to a known user
//! 3. Sign a token embedding the user, valid for the configured TTL
//! 4. `send_token` delivers it out-of-band (email, SMS, ...)
//! 5. Client presents the token
//! 6. Verify signature and expiry
//! 7. (optional) `verify_user` resolves the decoded user, if deferred
//! 8. Reject the token if it is in the user's ledger, otherwise record it
//! 9. Authenticate the user
//!
//! # Outcomes
//!
//! [`authenticate`](MagicLinkStrategy::authenticate) distinguishes three
//! results:
//!
//! - `Ok(AuthOutcome::Success(user))` / `Ok(AuthOutcome::Pass { .. })`
//! - `Ok(AuthOutcome::Fail(failure))`: an expected, request-correctable
//!   condition with a challenge message
//! - `Err(AuthError)`: an unexpected fault (callback, signing or storage
//!   failure). The cause is logged, the client only sees
//!   "Authentication failed".
//!
//! # Example
//!
//! ```
//! use magic_link_auth::{
//!     AuthOptions, AuthOutcome, AuthRequest, Callbacks, MagicLinkConfig, MagicLinkStrategy,
//! };
//! use magic_link_auth::callbacks::UserData;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let strategy = MagicLinkStrategy::new(
//!     MagicLinkConfig::new("secret", ["email"], "token"),
//!     Callbacks::user_only(
//!         |user: UserData, token: String| async move {
//!             // email `token` to `user["email"]`
//!             Ok(())
//!         },
//!         |fields: UserData| async move { Ok(Some(fields)) },
//!     ),
//! )?;
//!
//! let request = AuthRequest::new().with_body(json!({ "email": "a@b.com" }));
//! let outcome = strategy.authenticate(&request, &AuthOptions::request_token()).await?;
//! assert!(matches!(outcome, AuthOutcome::Pass { .. }));
//! # Ok(())
//! # }
//! ```

use crate::callbacks::{Callbacks, UserData};
use crate::config::MagicLinkConfig;
use crate::constants::{STRATEGY_NAME, TOKEN_ALREADY_USED_STATUS, messages};
use crate::error::{AuthError, ConfigError, Result};
use crate::ledger::UsedTokens;
use crate::options::{Action, AuthOptions};
use crate::providers::TokenStorage;
use crate::request::{AuthRequest, FieldSource};
use crate::stores::MemoryTokenStorage;
use crate::token::TokenSigner;
use serde_json::Value;

/// Why an authentication attempt failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// A configured user field was absent on issuance.
    MissingUserFields,
    /// `verify_user` found no user.
    NoUserFound,
    /// No token was presented.
    MissingToken,
    /// Token was malformed, tampered with or expired.
    InvalidToken,
    /// Token is valid but its subject lacks the configured primary key, so
    /// the replay check cannot run.
    ///
    /// Reported to the client as "Invalid token".
    MissingPrimaryKey,
    /// Token was already redeemed by this user.
    TokenAlreadyUsed,
}

/// Authentication failure: a challenge for the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    /// Failure category.
    pub kind: FailureKind,
    /// Human-readable challenge.
    pub message: String,
    /// Suggested HTTP status, when it differs from the host's default.
    pub status: Option<u16>,
}

impl Failure {
    fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    const fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// Result of a completed authentication attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum AuthOutcome {
    /// Token accepted; the user is authenticated.
    Success(UserData),
    /// Token issued and delivered; no identity is established.
    Pass {
        /// Delivery confirmation.
        message: String,
    },
    /// Authentication failed with a challenge.
    Fail(Failure),
}

impl AuthOutcome {
    fn fail(kind: FailureKind, message: impl Into<String>) -> Self {
        Self::Fail(Failure::new(kind, message))
    }
}

/// Magic link authentication strategy.
///
/// Generic over the used-token storage; defaults to
/// [`MemoryTokenStorage`].
#[derive(Debug)]
pub struct MagicLinkStrategy<S = MemoryTokenStorage> {
    config: MagicLinkConfig,
    signer: TokenSigner,
    callbacks: Callbacks,
    storage: S,
}

impl MagicLinkStrategy<MemoryTokenStorage> {
    /// Create a strategy backed by fresh in-memory storage.
    ///
    /// # Errors
    ///
    /// Returns error if `config` is invalid.
    pub fn new(
        config: MagicLinkConfig,
        callbacks: Callbacks,
    ) -> std::result::Result<Self, ConfigError> {
        Self::with_storage(config, callbacks, MemoryTokenStorage::new())
    }
}

impl<S: TokenStorage> MagicLinkStrategy<S> {
    /// Create a strategy backed by `storage`.
    ///
    /// # Errors
    ///
    /// Returns error if `config` is invalid.
    pub fn with_storage(
        config: MagicLinkConfig,
        callbacks: Callbacks,
        storage: S,
    ) -> std::result::Result<Self, ConfigError> {
        config.validate()?;

        let signer = TokenSigner::new(&config.secret, config.algorithm);

        tracing::debug!(
            user_fields = ?config.user_fields,
            token_field = %config.token_field,
            algorithm = ?signer.algorithm(),
            ttl_seconds = config.ttl_seconds,
            verify_user_after_token = config.verify_user_after_token,
            passes_request = callbacks.passes_request(),
            "Magic link strategy configured"
        );

        Ok(Self {
            config,
            signer,
            callbacks,
            storage,
        })
    }

    /// Name under which the strategy registers with a host runtime.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        STRATEGY_NAME
    }

    /// Strategy configuration.
    #[must_use]
    pub const fn config(&self) -> &MagicLinkConfig {
        &self.config
    }

    /// Used-token storage.
    #[must_use]
    pub const fn storage(&self) -> &S {
        &self.storage
    }

    /// Token signer, for minting tokens outside of the issuance phase.
    #[must_use]
    pub const fn signer(&self) -> &TokenSigner {
        &self.signer
    }

    /// Run the phase selected by `options.action`.
    ///
    /// # Errors
    ///
    /// Returns error only for unexpected faults: a callback rejected, the
    /// token could not be signed, or storage failed.
    pub async fn authenticate(
        &self,
        request: &AuthRequest,
        options: &AuthOptions,
    ) -> Result<AuthOutcome> {
        match options.action {
            Action::RequestToken => self.request_token(request, options).await,
            Action::AcceptToken => self.accept_token(request, options).await,
        }
    }

    /// Issuance phase: extract, (verify), sign, deliver.
    async fn request_token(
        &self,
        request: &AuthRequest,
        options: &AuthOptions,
    ) -> Result<AuthOutcome> {
        let Some(fields) = self.extract_user_fields(request) else {
            tracing::warn!("Magic link requested without mandatory user fields");
            return Ok(AuthOutcome::fail(
                FailureKind::MissingUserFields,
                messages::MISSING_USER_FIELDS,
            ));
        };

        let subject = if self.config.verify_user_after_token {
            fields
        } else {
            match self.verify_user(request, fields).await? {
                Some(user) => user,
                None => return Ok(no_user_found(options)),
            }
        };

        #[allow(clippy::cast_possible_wrap)]
        let expires_in = self.config.ttl_seconds as i64;
        let token = self.signer.sign(subject.clone(), expires_in).map_err(|e| {
            tracing::error!(error = %e, "Failed to sign magic link token");
            AuthError::Signing(e)
        })?;

        self.callbacks
            .send_token(request, subject, token)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "send_token callback failed");
                AuthError::Callback(e)
            })?;

        tracing::info!(
            ttl_seconds = self.config.ttl_seconds,
            "Magic link token delivered"
        );

        Ok(AuthOutcome::Pass {
            message: messages::TOKEN_DELIVERED.to_string(),
        })
    }

    /// Acceptance phase: extract, verify, (verify user), replay check.
    async fn accept_token(
        &self,
        request: &AuthRequest,
        options: &AuthOptions,
    ) -> Result<AuthOutcome> {
        let Some(token) = self.extract_token(request) else {
            return Ok(AuthOutcome::fail(
                FailureKind::MissingToken,
                messages::TOKEN_MISSING,
            ));
        };

        let claims = match self.signer.verify(token) {
            Ok(claims) => claims,
            Err(e) => {
                tracing::debug!(error = %e, "Magic link token rejected");
                return Ok(AuthOutcome::fail(
                    FailureKind::InvalidToken,
                    messages::INVALID_TOKEN,
                ));
            }
        };
        let expires_at = claims.expires_at();

        let subject = if self.config.verify_user_after_token {
            match self.verify_user(request, claims.user).await? {
                Some(user) => user,
                None => return Ok(no_user_found(options)),
            }
        } else {
            claims.user
        };

        if !options.allow_reuse {
            let Some(user_key) = primary_key_value(&subject, &options.user_primary_key) else {
                tracing::warn!(
                    user_primary_key = %options.user_primary_key,
                    "Token subject has no primary key value"
                );
                return Ok(AuthOutcome::fail(
                    FailureKind::MissingPrimaryKey,
                    messages::INVALID_TOKEN,
                ));
            };

            if let Some(failure) = self
                .record_token_use(&user_key, token, claims.exp, options)
                .await?
            {
                return Ok(AuthOutcome::Fail(failure));
            }
        }

        tracing::info!(expires_at = ?expires_at, "Magic link token accepted");

        Ok(AuthOutcome::Success(subject))
    }

    /// Check `token` against the user's ledger and record it.
    ///
    /// Returns a failure if the token was already used.
    async fn record_token_use(
        &self,
        user_key: &str,
        token: &str,
        expires_at: i64,
        options: &AuthOptions,
    ) -> Result<Option<Failure>> {
        let record = self.storage.get(user_key).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to load used-token ledger");
            AuthError::Storage(e)
        })?;
        let mut ledger = record.map(UsedTokens::from_record).unwrap_or_default();

        if ledger.has_been_used(token) {
            tracing::warn!(user_key = %user_key, "Magic link token replay rejected");
            let message = options
                .token_already_used_message
                .clone()
                .unwrap_or_else(|| messages::TOKEN_ALREADY_USED.to_string());
            return Ok(Some(
                Failure::new(FailureKind::TokenAlreadyUsed, message)
                    .with_status(TOKEN_ALREADY_USED_STATUS),
            ));
        }

        let pruned = ledger.remove_expired_tokens();
        ledger.mark_as_used(token, expires_at);

        self.storage
            .set(user_key, ledger.to_record())
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Failed to persist used-token ledger");
                AuthError::Storage(e)
            })?;

        tracing::debug!(
            user_key = %user_key,
            pruned = pruned,
            entries = ledger.len(),
            "Recorded magic link token use"
        );

        Ok(None)
    }

    async fn verify_user(
        &self,
        request: &AuthRequest,
        user: UserData,
    ) -> Result<Option<UserData>> {
        self.callbacks
            .verify_user(request, user)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "verify_user callback failed");
                AuthError::Callback(e)
            })
    }

    fn user_field_sources(&self) -> &'static [FieldSource] {
        if self.config.allow_post {
            &[FieldSource::Body, FieldSource::Query]
        } else {
            &[FieldSource::Query]
        }
    }

    fn token_sources(&self) -> &'static [FieldSource] {
        if self.config.allow_post {
            &[FieldSource::Body, FieldSource::Query, FieldSource::Params]
        } else {
            &[FieldSource::Query, FieldSource::Params]
        }
    }

    /// All configured user fields, or `None` if any is absent.
    fn extract_user_fields(&self, request: &AuthRequest) -> Option<UserData> {
        let sources = self.user_field_sources();
        self.config
            .user_fields
            .iter()
            .map(|field| {
                request
                    .field(field, sources)
                    .map(|value| (field.clone(), value.clone()))
            })
            .collect()
    }

    fn extract_token<'r>(&self, request: &'r AuthRequest) -> Option<&'r str> {
        request.string_field(&self.config.token_field, self.token_sources())
    }
}

fn no_user_found(options: &AuthOptions) -> AuthOutcome {
    let message = options
        .auth_message
        .clone()
        .unwrap_or_else(|| messages::NO_USER_FOUND.to_string());
    AuthOutcome::fail(FailureKind::NoUserFound, message)
}

/// Ledger key for `subject`: strings verbatim, other scalars as JSON text.
fn primary_key_value(subject: &UserData, key: &str) -> Option<String> {
    match subject.get(key)? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use serde_json::json;

    fn callbacks() -> Callbacks {
        Callbacks::user_only(
            |_user: UserData, _token: String| async move { Ok(()) },
            |fields: UserData| async move { Ok(Some(fields)) },
        )
    }

    fn strategy(config: MagicLinkConfig) -> MagicLinkStrategy {
        MagicLinkStrategy::new(config, callbacks()).unwrap()
    }

    #[test]
    fn test_construction_validates_config() {
        let result = MagicLinkStrategy::new(
            MagicLinkConfig::new("s", ["email"], "token").with_ttl_seconds(0),
            callbacks(),
        );
        assert_eq!(result.err(), Some(ConfigError::TtlOutOfRange(0)));
    }

    #[test]
    fn test_strategy_and_futures_are_send() {
        fn assert_send_sync<T: Send + Sync>(_: &T) {}
        fn assert_send<T: Send>(_: &T) {}

        let strategy = strategy(MagicLinkConfig::new("s", ["email"], "token"));
        assert_send_sync(&strategy);

        let request = AuthRequest::new();
        let options = AuthOptions::accept_token();
        let future = strategy.authenticate(&request, &options);
        assert_send(&future);
    }

    #[test]
    fn test_signer_uses_configured_algorithm() {
        let strategy = strategy(
            MagicLinkConfig::new("s", ["email"], "token")
                .with_algorithm(jsonwebtoken::Algorithm::HS512),
        );
        assert_eq!(strategy.signer().algorithm(), jsonwebtoken::Algorithm::HS512);
    }

    #[test]
    fn test_name() {
        let strategy = strategy(MagicLinkConfig::new("s", ["email"], "token"));
        assert_eq!(strategy.name(), "magiclink");
    }

    #[test]
    fn test_extract_user_fields_requires_all() {
        let strategy = strategy(MagicLinkConfig::new("s", ["email", "name"], "token"));

        let partial = AuthRequest::new().with_body(json!({ "email": "a@b.com" }));
        assert!(strategy.extract_user_fields(&partial).is_none());

        let split = AuthRequest::new()
            .with_body(json!({ "email": "a@b.com" }))
            .with_query(json!({ "name": "Ada" }));
        let fields = strategy.extract_user_fields(&split).unwrap();
        assert_eq!(fields.get("email"), Some(&json!("a@b.com")));
        assert_eq!(fields.get("name"), Some(&json!("Ada")));

        let blank = AuthRequest::new().with_body(json!({ "email": "", "name": "Ada" }));
        assert!(strategy.extract_user_fields(&blank).is_none());
    }

    #[test]
    fn test_extract_user_fields_ignores_body_without_allow_post() {
        let strategy =
            strategy(MagicLinkConfig::new("s", ["email"], "token").with_allow_post(false));

        let body_only = AuthRequest::new().with_body(json!({ "email": "a@b.com" }));
        assert!(strategy.extract_user_fields(&body_only).is_none());
    }

    #[test]
    fn test_extract_nested_user_field_keeps_path_as_key() {
        let strategy = strategy(MagicLinkConfig::new("s", ["user.email"], "token"));

        let request = AuthRequest::new().with_body(json!({ "user": { "email": "a@b.com" } }));
        let fields = strategy.extract_user_fields(&request).unwrap();
        assert_eq!(fields.get("user.email"), Some(&json!("a@b.com")));
    }

    #[test]
    fn test_extract_token_priority_and_types() {
        let strategy = strategy(MagicLinkConfig::new("s", ["email"], "token"));

        let from_params = AuthRequest::new().with_params(json!({ "token": "p" }));
        assert_eq!(strategy.extract_token(&from_params), Some("p"));

        let from_query = AuthRequest::new()
            .with_query(json!({ "token": "q" }))
            .with_params(json!({ "token": "p" }));
        assert_eq!(strategy.extract_token(&from_query), Some("q"));

        let numeric = AuthRequest::new().with_query(json!({ "token": 42 }));
        assert_eq!(strategy.extract_token(&numeric), None);

        let empty = AuthRequest::new().with_query(json!({ "token": "" }));
        assert_eq!(strategy.extract_token(&empty), None);

        let blank_body = AuthRequest::new()
            .with_body(json!({ "token": "" }))
            .with_query(json!({ "token": "q" }));
        assert_eq!(strategy.extract_token(&blank_body), Some("q"));

        let numeric_body = AuthRequest::new()
            .with_body(json!({ "token": 42 }))
            .with_params(json!({ "token": "p" }));
        assert_eq!(strategy.extract_token(&numeric_body), Some("p"));
    }

    #[test]
    fn test_primary_key_value() {
        let subject = json!({ "email": "a@b.com", "id": 7, "gone": null })
            .as_object()
            .cloned()
            .unwrap();

        assert_eq!(primary_key_value(&subject, "email").as_deref(), Some("a@b.com"));
        assert_eq!(primary_key_value(&subject, "id").as_deref(), Some("7"));
        assert_eq!(primary_key_value(&subject, "gone"), None);
        assert_eq!(primary_key_value(&subject, "missing"), None);
    }

    #[test]
    fn test_no_user_found_message() {
        let default = no_user_found(&AuthOptions::request_token());
        assert_eq!(
            default,
            AuthOutcome::Fail(Failure::new(FailureKind::NoUserFound, "No user found"))
        );

        let custom = no_user_found(&AuthOptions::request_token().with_auth_message("Who?"));
        assert_eq!(
            custom,
            AuthOutcome::Fail(Failure::new(FailureKind::NoUserFound, "Who?"))
        );
    }
}
