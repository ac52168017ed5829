//! In-process identity provider for tests and offline demos.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::info;
use uuid::Uuid;

use voltline_core::{Email, UserId};

use super::{
    AuthError, AuthUser, IdentityProvider, Session, SessionSlot, SignUpRequest, UserMetadata,
    validate_password,
};

struct Account {
    id: UserId,
    password: SecretString,
    metadata: UserMetadata,
}

/// Accounts kept in memory. Sign-up confirms immediately and signs in.
#[derive(Clone, Default)]
pub struct LocalIdentity {
    accounts: Arc<Mutex<HashMap<Email, Account>>>,
    session: SessionSlot,
}

impl LocalIdentity {
    /// Provider writing into `session`.
    #[must_use]
    pub fn new(session: SessionSlot) -> Self {
        Self {
            accounts: Arc::default(),
            session,
        }
    }

    /// Register an account without signing in. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns an error if the password is too short or the email is taken.
    pub fn register(
        &self,
        email: Email,
        password: &str,
        metadata: UserMetadata,
    ) -> Result<UserId, AuthError> {
        validate_password(password)?;
        let mut accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
        if accounts.contains_key(&email) {
            return Err(AuthError::UserAlreadyExists);
        }
        let id = UserId::random();
        accounts.insert(
            email,
            Account {
                id,
                password: SecretString::from(password.to_string()),
                metadata,
            },
        );
        Ok(id)
    }

    fn open_session(&self, email: &Email, id: UserId, metadata: UserMetadata) -> Session {
        let session = Session {
            user: AuthUser {
                id,
                email: Some(email.to_string()),
                metadata,
            },
            access_token: SecretString::from(format!("local-{}", Uuid::new_v4())),
            refresh_token: None,
            expires_at: None,
        };
        self.session.set(session.clone());
        session
    }
}

#[async_trait]
impl IdentityProvider for LocalIdentity {
    fn session(&self) -> &SessionSlot {
        &self.session
    }

    async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<Session, AuthError> {
        let (id, metadata) = {
            let accounts = self.accounts.lock().unwrap_or_else(PoisonError::into_inner);
            let account = accounts
                .get(email)
                .filter(|a| a.password.expose_secret() == password.expose_secret())
                .ok_or(AuthError::InvalidCredentials)?;
            (account.id, account.metadata.clone())
        };

        info!(user_id = %id, "Signed in (local)");
        Ok(self.open_session(email, id, metadata))
    }

    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, AuthError> {
        let id = self.register(
            request.email.clone(),
            request.password.expose_secret(),
            request.metadata.clone(),
        )?;
        info!(user_id = %id, "Signed up (local)");
        Ok(Some(self.open_session(
            &request.email,
            id,
            request.metadata.clone(),
        )))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.session.clear() {
            info!(user_id = %session.user.id, "Signed out (local)");
        }
        Ok(())
    }
}
