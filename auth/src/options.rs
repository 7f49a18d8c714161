//! Per-invocation authentication options.

use crate::constants::defaults;
use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Authentication phase selector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Action {
    /// Issue a token and hand it to `send_token`.
    RequestToken,

    /// Verify a presented token and authenticate its bearer.
    #[default]
    AcceptToken,
}

impl Action {
    /// Wire name of the action.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::RequestToken => "requestToken",
            Self::AcceptToken => "acceptToken",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "requestToken" => Ok(Self::RequestToken),
            "acceptToken" => Ok(Self::AcceptToken),
            other => Err(ConfigError::UnknownAction(other.to_string())),
        }
    }
}

/// Options passed with each [`authenticate`](crate::strategy::MagicLinkStrategy::authenticate) call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthOptions {
    /// Phase to run. Default: [`Action::AcceptToken`].
    pub action: Action,

    /// Challenge message used when `verify_user` finds no user.
    pub auth_message: Option<String>,

    /// Skip the replay check on acceptance.
    pub allow_reuse: bool,

    /// Subject field keying the used-token ledger. Default: `email`.
    ///
    /// Every token subject must carry this field unless `allow_reuse` is
    /// set. A subject without it fails acceptance with
    /// [`FailureKind::MissingPrimaryKey`](crate::strategy::FailureKind::MissingPrimaryKey).
    pub user_primary_key: String,

    /// Challenge message used when a token is replayed.
    pub token_already_used_message: Option<String>,
}

impl AuthOptions {
    /// Options for the issuance phase.
    #[must_use]
    pub fn request_token() -> Self {
        Self {
            action: Action::RequestToken,
            ..Self::default()
        }
    }

    /// Options for the acceptance phase.
    #[must_use]
    pub fn accept_token() -> Self {
        Self::default()
    }

    /// Set the "no user found" challenge message.
    #[must_use]
    pub fn with_auth_message(mut self, message: impl Into<String>) -> Self {
        self.auth_message = Some(message.into());
        self
    }

    /// Allow a token to be accepted more than once.
    #[must_use]
    pub const fn with_allow_reuse(mut self, allow_reuse: bool) -> Self {
        self.allow_reuse = allow_reuse;
        self
    }

    /// Set the subject field keying the used-token ledger.
    #[must_use]
    pub fn with_user_primary_key(mut self, key: impl Into<String>) -> Self {
        self.user_primary_key = key.into();
        self
    }

    /// Set the replayed-token challenge message.
    #[must_use]
    pub fn with_token_already_used_message(mut self, message: impl Into<String>) -> Self {
        self.token_already_used_message = Some(message.into());
        self
    }
}

impl Default for AuthOptions {
    fn default() -> Self {
        Self {
            action: Action::AcceptToken,
            auth_message: None,
            allow_reuse: false,
            user_primary_key: defaults::USER_PRIMARY_KEY.to_string(),
            token_already_used_message: None,
        }
    }
}
