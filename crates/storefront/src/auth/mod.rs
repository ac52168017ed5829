//! Identity: who is signed in, and how to sign in, up and out.
//!
//! The active [`Session`] lives in a [`SessionSlot`] shared with the
//! [`crate::backend::RestStore`], so that table requests made after sign-in
//! carry the user's bearer token instead of the anon key.

pub mod error;
pub mod gotrue;
pub mod local;

pub use error::{AuthError, MIN_PASSWORD_LENGTH, validate_password};
pub use gotrue::GoTrueIdentity;
pub use local::LocalIdentity;

use core::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use voltline_core::{Email, UserId};

/// Profile metadata attached to an account at sign-up.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: UserId,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default, rename = "user_metadata")]
    pub metadata: UserMetadata,
}

/// An authenticated session.
#[derive(Clone)]
pub struct Session {
    pub user: AuthUser,
    pub access_token: SecretString,
    pub refresh_token: Option<SecretString>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Session {
    /// Bearer token for authenticated requests.
    #[must_use]
    pub fn bearer(&self) -> &str {
        self.access_token.expose_secret()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("user", &self.user)
            .field("access_token", &"[REDACTED]")
            .field("expires_at", &self.expires_at)
            .finish_non_exhaustive()
    }
}

/// Sign-up form.
#[derive(Clone)]
pub struct SignUpRequest {
    pub email: Email,
    pub password: SecretString,
    pub metadata: UserMetadata,
}

impl fmt::Debug for SignUpRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignUpRequest")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("metadata", &self.metadata)
            .finish()
    }
}

/// Process-wide holder of the current session.
///
/// Cloning shares the slot.
#[derive(Clone, Default)]
pub struct SessionSlot {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current session, if signed in.
    #[must_use]
    pub fn get(&self) -> Option<Session> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Current user, if signed in.
    #[must_use]
    pub fn user(&self) -> Option<AuthUser> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.user.clone())
    }

    /// Current user id, if signed in.
    #[must_use]
    pub fn user_id(&self) -> Option<UserId> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.user.id)
    }

    /// Bearer token of the current session, if signed in.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|session| session.bearer().to_string())
    }

    /// Replace the current session, returning the previous one.
    pub fn set(&self, session: Session) -> Option<Session> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(session)
    }

    /// Drop the current session, returning it.
    pub fn clear(&self) -> Option<Session> {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl fmt::Debug for SessionSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionSlot")
            .field("user_id", &self.user_id())
            .finish()
    }
}

/// Session and identity operations.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// The slot this provider writes sessions into.
    fn session(&self) -> &SessionSlot;

    /// The signed-in user, or `None` for a guest.
    fn current_user(&self) -> Option<AuthUser> {
        self.session().user()
    }

    /// Sign in with email and password.
    async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<Session, AuthError>;

    /// Create an account. Returns `None` when the backend requires the email
    /// address to be confirmed before a session is issued.
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, AuthError>;

    /// End the current session. Signing out as a guest is a no-op.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(id: UserId) -> Session {
        Session {
            user: AuthUser {
                id,
                email: Some("buyer@example.fr".into()),
                metadata: UserMetadata::default(),
            },
            access_token: SecretString::from("token-abc"),
            refresh_token: None,
            expires_at: None,
        }
    }

    #[test]
    fn test_slot_is_shared_between_clones() {
        let slot = SessionSlot::new();
        let other = slot.clone();
        let id = UserId::random();

        assert!(slot.user().is_none());
        slot.set(session(id));
        assert_eq!(other.user_id(), Some(id));
        assert_eq!(other.access_token().as_deref(), Some("token-abc"));

        let previous = other.clear();
        assert_eq!(previous.map(|s| s.user.id), Some(id));
        assert!(slot.get().is_none());
    }

    #[test]
    fn test_session_debug_redacts_token() {
        let debug = format!("{:?}", session(UserId::random()));
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("token-abc"));
    }
}
