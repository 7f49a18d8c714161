//! Authentication constants.
//!
//! This module contains default values and challenge messages used by the
//! magic link strategy.

/// Name under which the strategy registers with a host runtime.
pub const STRATEGY_NAME: &str = "magiclink";

/// Configuration defaults and bounds.
pub mod defaults {
    /// Default token lifetime in seconds (10 minutes).
    pub const TTL_SECONDS: u64 = 600;

    /// Shortest accepted token lifetime in seconds.
    pub const MIN_TTL_SECONDS: u64 = 1;

    /// Longest accepted token lifetime in seconds (24 hours).
    pub const MAX_TTL_SECONDS: u64 = 86_400;

    /// Subject field used to key the used-token ledger.
    pub const USER_PRIMARY_KEY: &str = "email";
}

/// Challenge messages returned with authentication failures.
pub mod messages {
    /// One or more configured user fields were absent from the request.
    pub const MISSING_USER_FIELDS: &str = "Mandatory user fields missing";

    /// `verify_user` resolved to no user.
    pub const NO_USER_FOUND: &str = "No user found";

    /// No token present in body, query or path parameters.
    pub const TOKEN_MISSING: &str = "Token missing";

    /// Token failed signature or expiry verification.
    pub const INVALID_TOKEN: &str = "Invalid token";

    /// Token is already recorded in the user's ledger.
    pub const TOKEN_ALREADY_USED: &str = "Token was already used";

    /// Issuance completed and the token was handed to `send_token`.
    pub const TOKEN_DELIVERED: &str = "Token successfully delivered";
}

/// Status code attached to a replayed-token failure.
pub const TOKEN_ALREADY_USED_STATUS: u16 = 400;
