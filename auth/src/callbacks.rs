//! Integrator-supplied callbacks.
//!
//! The strategy needs two collaborators from the application:
//!
//! - `send_token(user, token)`: deliver the token out-of-band (email, SMS, ...)
//! - `verify_user(user)`: resolve request fields or a decoded token subject
//!   to a known user, or `None` if there is no such user
//!
//! Both come in two shapes, selected once when building [`Callbacks`]:
//! [`Callbacks::user_only`] and [`Callbacks::with_request`], where the
//! inbound [`AuthRequest`] is passed as the first argument.
//!
//! # Example
//!
//! ```
//! use magic_link_auth::callbacks::{Callbacks, UserData};
//!
//! let callbacks = Callbacks::user_only(
//!     |user: UserData, token: String| async move {
//!         println!("send {token} to {:?}", user.get("email"));
//!         Ok(())
//!     },
//!     |fields: UserData| async move { Ok(Some(fields)) },
//! );
//! assert!(!callbacks.passes_request());
//! ```

use crate::request::AuthRequest;
use futures::future::{BoxFuture, FutureExt};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// Opaque user data: extracted request fields, a verified user record, or a
/// decoded token subject.
pub type UserData = serde_json::Map<String, serde_json::Value>;

type SendTokenFn =
    Arc<dyn Fn(UserData, String) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

type VerifyUserFn =
    Arc<dyn Fn(UserData) -> BoxFuture<'static, anyhow::Result<Option<UserData>>> + Send + Sync>;

type SendTokenWithRequestFn = Arc<
    dyn Fn(AuthRequest, UserData, String) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync,
>;

type VerifyUserWithRequestFn = Arc<
    dyn Fn(AuthRequest, UserData) -> BoxFuture<'static, anyhow::Result<Option<UserData>>>
        + Send
        + Sync,
>;

/// Delivery and user-verification callbacks.
#[derive(Clone)]
pub enum Callbacks {
    /// Callbacks receive user data only.
    UserOnly {
        /// Token delivery.
        send_token: SendTokenFn,
        /// User verification.
        verify_user: VerifyUserFn,
    },

    /// Callbacks receive the inbound request as their first argument.
    WithRequest {
        /// Token delivery.
        send_token: SendTokenWithRequestFn,
        /// User verification.
        verify_user: VerifyUserWithRequestFn,
    },
}

impl Callbacks {
    /// Build callbacks that receive user data only.
    pub fn user_only<S, SFut, V, VFut>(send_token: S, verify_user: V) -> Self
    where
        S: Fn(UserData, String) -> SFut + Send + Sync + 'static,
        SFut: Future<Output = anyhow::Result<()>> + Send + 'static,
        V: Fn(UserData) -> VFut + Send + Sync + 'static,
        VFut: Future<Output = anyhow::Result<Option<UserData>>> + Send + 'static,
    {
        Self::UserOnly {
            send_token: Arc::new(move |user, token| send_token(user, token).boxed()),
            verify_user: Arc::new(move |user| verify_user(user).boxed()),
        }
    }

    /// Build callbacks that receive the request first.
    pub fn with_request<S, SFut, V, VFut>(send_token: S, verify_user: V) -> Self
    where
        S: Fn(AuthRequest, UserData, String) -> SFut + Send + Sync + 'static,
        SFut: Future<Output = anyhow::Result<()>> + Send + 'static,
        V: Fn(AuthRequest, UserData) -> VFut + Send + Sync + 'static,
        VFut: Future<Output = anyhow::Result<Option<UserData>>> + Send + 'static,
    {
        Self::WithRequest {
            send_token: Arc::new(move |request, user, token| {
                send_token(request, user, token).boxed()
            }),
            verify_user: Arc::new(move |request, user| verify_user(request, user).boxed()),
        }
    }

    /// Whether the request is forwarded to the callbacks.
    #[must_use]
    pub const fn passes_request(&self) -> bool {
        matches!(self, Self::WithRequest { .. })
    }

    pub(crate) async fn send_token(
        &self,
        request: &AuthRequest,
        user: UserData,
        token: String,
    ) -> anyhow::Result<()> {
        match self {
            Self::UserOnly { send_token, .. } => send_token(user, token).await,
            Self::WithRequest { send_token, .. } => send_token(request.clone(), user, token).await,
        }
    }

    pub(crate) async fn verify_user(
        &self,
        request: &AuthRequest,
        user: UserData,
    ) -> anyhow::Result<Option<UserData>> {
        match self {
            Self::UserOnly { verify_user, .. } => verify_user(user).await,
            Self::WithRequest { verify_user, .. } => verify_user(request.clone(), user).await,
        }
    }
}

impl fmt::Debug for Callbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let shape = match self {
            Self::UserOnly { .. } => "UserOnly",
            Self::WithRequest { .. } => "WithRequest",
        };
        f.debug_tuple("Callbacks").field(&shape).finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)] // Test code
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    fn fields() -> UserData {
        json!({ "email": "a@b.com" }).as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_user_only_shape() {
        let sent = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&sent);

        let callbacks = Callbacks::user_only(
            move |user: UserData, token: String| {
                let sink = Arc::clone(&sink);
                async move {
                    sink.lock().unwrap().push((user, token));
                    Ok(())
                }
            },
            |_fields: UserData| async move { Ok(None) },
        );

        assert!(!callbacks.passes_request());

        let request = AuthRequest::new();
        callbacks
            .send_token(&request, fields(), "tok".to_string())
            .await
            .unwrap();
        assert_eq!(sent.lock().unwrap().as_slice(), &[(fields(), "tok".to_string())]);

        assert!(callbacks.verify_user(&request, fields()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_with_request_shape_receives_request() {
        let callbacks = Callbacks::with_request(
            |_request: AuthRequest, _user: UserData, _token: String| async move { Ok(()) },
            |request: AuthRequest, mut user: UserData| async move {
                user.insert("ip".to_string(), request.params["ip"].clone());
                Ok(Some(user))
            },
        );

        assert!(callbacks.passes_request());

        let request = AuthRequest::new().with_params(json!({ "ip": "10.0.0.1" }));
        let user = callbacks.verify_user(&request, fields()).await.unwrap().unwrap();
        assert_eq!(user.get("ip"), Some(&json!("10.0.0.1")));
    }

    #[tokio::test]
    async fn test_callback_errors_propagate() {
        let callbacks = Callbacks::user_only(
            |_user: UserData, _token: String| async move { Err(anyhow::anyhow!("smtp down")) },
            |_fields: UserData| async move { Err(anyhow::anyhow!("db down")) },
        );

        let request = AuthRequest::new();
        let err = callbacks
            .send_token(&request, fields(), "tok".to_string())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "smtp down");
        assert!(callbacks.verify_user(&request, fields()).await.is_err());
    }

    #[test]
    fn test_debug_names_shape() {
        let callbacks = Callbacks::user_only(
            |_user: UserData, _token: String| async move { Ok(()) },
            |fields: UserData| async move { Ok(Some(fields)) },
        );
        assert_eq!(format!("{callbacks:?}"), "Callbacks(\"UserOnly\")");
    }
}
