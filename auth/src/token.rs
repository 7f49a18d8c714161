//! Signed magic link tokens.
//!
//! Tokens are compact JWS values (`header.payload.signature`) signed with an
//! HMAC key. The payload carries the user data the token was issued for:
//!
//! ```json
//! { "user": { "email": "a@b.com" }, "iat": 1700000000, "exp": 1700000600 }
//! ```

use crate::callbacks::UserData;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::Error as JwtError;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Token payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenClaims {
    /// User data the token was issued for.
    pub user: UserData,

    /// Issued-at, unix seconds.
    pub iat: i64,

    /// Expiry, unix seconds.
    pub exp: i64,
}

impl TokenClaims {
    /// Expiry as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// Signs and verifies tokens with a shared secret.
#[derive(Clone)]
pub struct TokenSigner {
    algorithm: Algorithm,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl TokenSigner {
    /// Create a signer for `secret` using `algorithm`.
    #[must_use]
    pub fn new(secret: &str, algorithm: Algorithm) -> Self {
        Self {
            algorithm,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    /// Algorithm used for signing and accepted on verification.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    /// Sign `user` with a lifetime of `expires_in` seconds from now.
    ///
    /// A negative lifetime produces a token that is already expired.
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be serialized or signed.
    pub fn sign(&self, user: UserData, expires_in: i64) -> Result<String, JwtError> {
        self.sign_at(user, Utc::now(), expires_in)
    }

    /// Sign `user` as if issued at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns error if the payload cannot be serialized or signed.
    pub fn sign_at(
        &self,
        user: UserData,
        issued_at: DateTime<Utc>,
        expires_in: i64,
    ) -> Result<String, JwtError> {
        let iat = issued_at.timestamp();
        let claims = TokenClaims {
            user,
            iat,
            exp: iat.saturating_add(expires_in),
        };

        jsonwebtoken::encode(&Header::new(self.algorithm), &claims, &self.encoding_key)
    }

    /// Verify signature, algorithm and expiry, returning the payload.
    ///
    /// Expiry is checked without leeway: a token is invalid from the second
    /// its `exp` has passed.
    ///
    /// # Errors
    ///
    /// Returns the `jsonwebtoken` error for malformed, tampered, expired or
    /// wrongly-signed tokens.
    pub fn verify(&self, token: &str) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_required_spec_claims(&["exp"]);

        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
    }
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("algorithm", &self.algorithm)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use jsonwebtoken::errors::ErrorKind;
    use serde_json::json;

    fn user() -> UserData {
        json!({ "email": "a@b.com" }).as_object().cloned().unwrap()
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = TokenSigner::new("s", Algorithm::HS256);
        let token = signer.sign(user(), 600).unwrap();

        let claims = signer.verify(&token).unwrap();
        assert_eq!(claims.user, user());
        assert_eq!(claims.exp - claims.iat, 600);
        assert_eq!(
            claims.expires_at().map(|at| at.timestamp()),
            Some(claims.exp)
        );
    }

    #[test]
    fn test_expired_token_rejected() {
        let signer = TokenSigner::new("s", Algorithm::HS256);
        let token = signer.sign(user(), -1).unwrap();

        let err = signer.verify(&token).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ExpiredSignature));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let token = TokenSigner::new("s", Algorithm::HS256).sign(user(), 600).unwrap();

        let err = TokenSigner::new("other", Algorithm::HS256)
            .verify(&token)
            .unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::InvalidSignature));
    }

    #[test]
    fn test_algorithm_mismatch_rejected() {
        let token = TokenSigner::new("s", Algorithm::HS512).sign(user(), 600).unwrap();
        assert!(TokenSigner::new("s", Algorithm::HS256).verify(&token).is_err());
    }

    #[test]
    fn test_malformed_token_rejected() {
        let signer = TokenSigner::new("s", Algorithm::HS256);
        assert!(signer.verify("not-a-token").is_err());
        assert!(signer.verify("").is_err());
    }

    #[test]
    fn test_debug_hides_keys() {
        let signer = TokenSigner::new("very-secret", Algorithm::HS384);
        let debug = format!("{signer:?}");
        assert!(debug.contains("HS384"));
        assert!(!debug.contains("very-secret"));
    }
}
