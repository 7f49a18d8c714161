//! # Magic Link Authentication
//!
//! Passwordless authentication via "magic links": a signed, short-lived token
//! is delivered to the user out-of-band, and presenting it back proves
//! control of the delivery channel.
//!
//! ## Features
//!
//! - **Stateless tokens**: HMAC-signed JWTs embed the user and expiry
//! - **Single-use**: redeemed tokens are recorded per user until they expire
//! - **Pluggable storage**: in-memory by default, Redis for shared deployments
//! - **Integrator callbacks**: delivery and user lookup stay in the application
//!
//! ## Flow
//!
//! ```text
//! request_token: fields → (verify_user) → sign → send_token → Pass
//! accept_token:  token → verify → (verify_user) → replay check → Success
//! ```
//!
//! ## Example
//!
//! ```
//! use magic_link_auth::{
//!     AuthOptions, AuthOutcome, AuthRequest, Callbacks, MagicLinkConfig, MagicLinkStrategy,
//! };
//! use magic_link_auth::callbacks::UserData;
//! use serde_json::json;
//! use std::sync::{Arc, Mutex};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let outbox: Arc<Mutex<Vec<String>>> = Arc::default();
//! let sent = Arc::clone(&outbox);
//!
//! let strategy = MagicLinkStrategy::new(
//!     MagicLinkConfig::new("secret", ["email"], "token"),
//!     Callbacks::user_only(
//!         move |_user: UserData, token: String| {
//!             let sent = Arc::clone(&sent);
//!             async move {
//!                 sent.lock().map_err(|_| anyhow::anyhow!("outbox poisoned"))?.push(token);
//!                 Ok(())
//!             }
//!         },
//!         |fields: UserData| async move { Ok(Some(fields)) },
//!     ),
//! )?;
//!
//! // 1. Issue a token
//! let request = AuthRequest::new().with_body(json!({ "email": "a@b.com" }));
//! strategy.authenticate(&request, &AuthOptions::request_token()).await?;
//!
//! // 2. Redeem it
//! let token = outbox.lock().map_err(|_| "outbox poisoned")?[0].clone();
//! let request = AuthRequest::new().with_query(json!({ "token": token }));
//! let outcome = strategy.authenticate(&request, &AuthOptions::accept_token()).await?;
//! assert!(matches!(outcome, AuthOutcome::Success(_)));
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]

// Public modules
pub mod callbacks;
pub mod config;
pub mod constants;
pub mod error;
pub mod ledger;
pub mod lookup;
pub mod options;
pub mod providers;
pub mod request;
pub mod stores;
pub mod strategy;
pub mod token;

// Re-export main types for convenience
pub use callbacks::{Callbacks, UserData};
pub use config::MagicLinkConfig;
pub use error::{AuthError, ConfigError, Result, StorageError};
pub use ledger::{TokenRecord, UsedTokens};
pub use options::{Action, AuthOptions};
pub use providers::TokenStorage;
pub use request::{AuthRequest, FieldSource};
pub use stores::MemoryTokenStorage;
#[cfg(feature = "redis")]
pub use stores::RedisTokenStorage;
pub use strategy::{AuthOutcome, Failure, FailureKind, MagicLinkStrategy};
pub use token::{TokenClaims, TokenSigner};
