//! Magic link strategy configuration.
//!
//! Configuration values are provided by the application, either through the
//! builder methods or from the process environment with
//! [`MagicLinkConfig::from_env`]. Validation happens once, when the strategy
//! is constructed.

use crate::constants::defaults;
use crate::error::ConfigError;
use jsonwebtoken::Algorithm;

/// Magic link authentication configuration.
#[derive(Clone)]
pub struct MagicLinkConfig {
    /// HMAC signing key for issued tokens.
    pub secret: String,

    /// Request fields that must all be present to issue a token.
    ///
    /// Entries may be nested paths such as `user.email` or `user[email]`.
    pub user_fields: Vec<String>,

    /// Field under which a token is expected on acceptance.
    pub token_field: String,

    /// Token time-to-live in seconds.
    ///
    /// Default: 600 (10 minutes). Valid range: 1 to 86400.
    pub ttl_seconds: u64,

    /// Signing algorithm.
    ///
    /// Default: `HS256`. Only HMAC algorithms are accepted.
    pub algorithm: Algorithm,

    /// Whether request-body fields are considered in addition to the query.
    ///
    /// Default: `true`
    pub allow_post: bool,

    /// Defer `verify_user` from issuance to acceptance.
    ///
    /// When set, the raw extracted user fields are embedded in the token and
    /// the user is looked up only once the token comes back.
    ///
    /// Default: `false`
    pub verify_user_after_token: bool,
}

impl std::fmt::Debug for MagicLinkConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MagicLinkConfig")
            .field("secret", &"<redacted>")
            .field("user_fields", &self.user_fields)
            .field("token_field", &self.token_field)
            .field("ttl_seconds", &self.ttl_seconds)
            .field("algorithm", &self.algorithm)
            .field("allow_post", &self.allow_post)
            .field("verify_user_after_token", &self.verify_user_after_token)
            .finish()
    }
}

impl MagicLinkConfig {
    /// Create new configuration with default TTL, algorithm and flags.
    ///
    /// # Arguments
    ///
    /// * `secret` - HMAC signing key
    /// * `user_fields` - Mandatory request fields (e.g. `["email"]`)
    /// * `token_field` - Field carrying the token on acceptance (e.g. `"token"`)
    #[must_use]
    pub fn new<I, F>(
        secret: impl Into<String>,
        user_fields: I,
        token_field: impl Into<String>,
    ) -> Self
    where
        I: IntoIterator<Item = F>,
        F: Into<String>,
    {
        Self {
            secret: secret.into(),
            user_fields: user_fields.into_iter().map(Into::into).collect(),
            token_field: token_field.into(),
            ttl_seconds: defaults::TTL_SECONDS,
            algorithm: Algorithm::HS256,
            allow_post: true,
            verify_user_after_token: false,
        }
    }

    /// Set token time-to-live.
    #[must_use]
    pub const fn with_ttl_seconds(mut self, seconds: u64) -> Self {
        self.ttl_seconds = seconds;
        self
    }

    /// Set signing algorithm.
    #[must_use]
    pub const fn with_algorithm(mut self, algorithm: Algorithm) -> Self {
        self.algorithm = algorithm;
        self
    }

    /// Set whether body fields are considered.
    #[must_use]
    pub const fn with_allow_post(mut self, allow_post: bool) -> Self {
        self.allow_post = allow_post;
        self
    }

    /// Set verification ordering.
    #[must_use]
    pub const fn with_verify_user_after_token(mut self, after_token: bool) -> Self {
        self.verify_user_after_token = after_token;
        self
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns the first violated constraint:
    /// - empty secret
    /// - empty user-field list or blank field name
    /// - blank token field
    /// - TTL outside `[1, 86400]`
    /// - non-HMAC algorithm
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.trim().is_empty() {
            return Err(ConfigError::MissingSecret);
        }

        if self.user_fields.is_empty() {
            return Err(ConfigError::MissingUserFields);
        }

        if let Some(index) = self.user_fields.iter().position(|f| f.trim().is_empty()) {
            return Err(ConfigError::InvalidUserField { index });
        }

        if self.token_field.trim().is_empty() {
            return Err(ConfigError::MissingTokenField);
        }

        if !(defaults::MIN_TTL_SECONDS..=defaults::MAX_TTL_SECONDS).contains(&self.ttl_seconds) {
            return Err(ConfigError::TtlOutOfRange(self.ttl_seconds));
        }

        if !matches!(
            self.algorithm,
            Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512
        ) {
            return Err(ConfigError::UnsupportedAlgorithm(format!("{:?}", self.algorithm)));
        }

        Ok(())
    }

    /// Load configuration from environment variables.
    ///
    /// | Variable | Required | Format |
    /// |---|---|---|
    /// | `MAGIC_LINK_SECRET` | yes | string |
    /// | `MAGIC_LINK_USER_FIELDS` | yes | comma separated |
    /// | `MAGIC_LINK_TOKEN_FIELD` | yes | string |
    /// | `MAGIC_LINK_TTL_SECONDS` | no | integer |
    /// | `MAGIC_LINK_ALGORITHM` | no | `HS256`, `HS384`, `HS512` |
    /// | `MAGIC_LINK_ALLOW_POST` | no | boolean |
    /// | `MAGIC_LINK_VERIFY_USER_AFTER_TOKEN` | no | boolean |
    ///
    /// The result is validated before it is returned.
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing, a value cannot be
    /// parsed, or the resulting configuration is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(|var| std::env::var(var).ok())
    }

    fn from_vars<F>(get: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required =
            |var: &str| get(var).ok_or_else(|| ConfigError::EnvVarNotSet(var.to_string()));

        let user_fields: Vec<String> = required("MAGIC_LINK_USER_FIELDS")?
            .split(',')
            .map(|f| f.trim().to_string())
            .filter(|f| !f.is_empty())
            .collect();

        let mut config = Self::new(
            required("MAGIC_LINK_SECRET")?,
            user_fields,
            required("MAGIC_LINK_TOKEN_FIELD")?,
        );

        if let Some(raw) = get("MAGIC_LINK_TTL_SECONDS") {
            config.ttl_seconds = raw.trim().parse().map_err(|_| ConfigError::InvalidEnvValue {
                var: "MAGIC_LINK_TTL_SECONDS".to_string(),
                value: raw.clone(),
            })?;
        }

        if let Some(raw) = get("MAGIC_LINK_ALGORITHM") {
            config.algorithm = parse_algorithm(&raw)?;
        }

        if let Some(raw) = get("MAGIC_LINK_ALLOW_POST") {
            config.allow_post = parse_bool("MAGIC_LINK_ALLOW_POST", &raw)?;
        }

        if let Some(raw) = get("MAGIC_LINK_VERIFY_USER_AFTER_TOKEN") {
            config.verify_user_after_token =
                parse_bool("MAGIC_LINK_VERIFY_USER_AFTER_TOKEN", &raw)?;
        }

        config.validate()?;
        Ok(config)
    }
}

/// Parse an HMAC algorithm name, case-insensitively.
///
/// # Errors
///
/// Returns [`ConfigError::UnsupportedAlgorithm`] for anything other than
/// `HS256`, `HS384` or `HS512`.
pub fn parse_algorithm(name: &str) -> Result<Algorithm, ConfigError> {
    match name.trim().to_ascii_uppercase().as_str() {
        "HS256" => Ok(Algorithm::HS256),
        "HS384" => Ok(Algorithm::HS384),
        "HS512" => Ok(Algorithm::HS512),
        _ => Err(ConfigError::UnsupportedAlgorithm(name.to_string())),
    }
}

fn parse_bool(var: &str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidEnvValue {
            var: var.to_string(),
            value: raw.to_string(),
        }),
    }
}
