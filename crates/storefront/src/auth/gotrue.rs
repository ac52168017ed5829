//! Hosted identity backend client.
//!
//! Endpoints, relative to the backend base URL:
//! - `POST auth/v1/token?grant_type=password` - sign in
//! - `POST auth/v1/signup` - create an account (with profile metadata)
//! - `POST auth/v1/logout` - revoke the current session

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use url::Url;

use voltline_core::Email;

use super::{
    AuthError, AuthUser, IdentityProvider, Session, SessionSlot, SignUpRequest, UserMetadata,
    validate_password,
};
use crate::config::{BackendConfig, anon_key};

/// Identity provider backed by the hosted auth endpoints.
#[derive(Clone)]
pub struct GoTrueIdentity {
    client: reqwest::Client,
    config: BackendConfig,
    session: SessionSlot,
}

#[derive(Serialize)]
struct PasswordGrant<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct SignUpBody<'a> {
    email: &'a str,
    password: &'a str,
    data: &'a UserMetadata,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_at: Option<i64>,
    user: AuthUser,
}

impl TokenResponse {
    fn into_session(self) -> Session {
        Session {
            user: self.user,
            access_token: SecretString::from(self.access_token),
            refresh_token: self.refresh_token.map(SecretString::from),
            expires_at: self
                .expires_at
                .and_then(|secs| DateTime::<Utc>::from_timestamp(secs, 0)),
        }
    }
}

/// Sign-up answers with a session when accounts are auto-confirmed, or with
/// the bare user while confirmation is pending.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    Session(TokenResponse),
    Pending(AuthUser),
}

#[derive(Deserialize, Default)]
struct ErrorBody {
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn message(self, raw: &str) -> String {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .or(self.error_code)
            .or(self.error)
            .unwrap_or_else(|| raw.chars().take(200).collect())
    }
}

impl GoTrueIdentity {
    /// Create a client sharing `session` with the table client.
    ///
    /// # Errors
    ///
    /// Returns error if the anon key is not a valid header value or the HTTP
    /// client fails to build.
    pub fn new(config: &BackendConfig, session: SessionSlot) -> Result<Self, AuthError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            "apikey",
            HeaderValue::from_str(anon_key(config))
                .map_err(|e| AuthError::Decode(format!("Invalid anon key format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(config.request_timeout)
            .build()?;

        Ok(Self {
            client,
            config: config.clone(),
            session,
        })
    }

    fn url(&self, path: &str) -> Result<Url, AuthError> {
        self.config
            .endpoint(path)
            .map_err(|e| AuthError::Decode(format!("invalid auth URL: {e}")))
    }

    async fn post<B: Serialize + Sync>(
        &self,
        url: Url,
        body: &B,
        bearer: Option<&str>,
    ) -> Result<String, AuthError> {
        let mut request = self.client.post(url).json(body);
        if let Some(token) = bearer {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .unwrap_or_default()
                .message(&text);
            warn!(status = %status, message = %message, "Identity backend refused request");
            return Err(AuthError::from_provider(status.as_u16(), &message));
        }

        Ok(text)
    }
}

#[async_trait]
impl IdentityProvider for GoTrueIdentity {
    fn session(&self) -> &SessionSlot {
        &self.session
    }

    #[instrument(skip(self, password), fields(email = %email))]
    async fn sign_in(&self, email: &Email, password: &SecretString) -> Result<Session, AuthError> {
        let mut url = self.url("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "password");

        let body = PasswordGrant {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        let text = self.post(url, &body, None).await?;
        let token: TokenResponse =
            serde_json::from_str(&text).map_err(|e| AuthError::Decode(e.to_string()))?;

        let session = token.into_session();
        self.session.set(session.clone());
        info!(user_id = %session.user.id, "Signed in");
        Ok(session)
    }

    #[instrument(skip(self, request), fields(email = %request.email))]
    async fn sign_up(&self, request: &SignUpRequest) -> Result<Option<Session>, AuthError> {
        validate_password(request.password.expose_secret())?;

        let body = SignUpBody {
            email: request.email.as_str(),
            password: request.password.expose_secret(),
            data: &request.metadata,
        };
        let text = self.post(self.url("auth/v1/signup")?, &body, None).await?;
        let response: SignUpResponse =
            serde_json::from_str(&text).map_err(|e| AuthError::Decode(e.to_string()))?;

        match response {
            SignUpResponse::Session(token) => {
                let session = token.into_session();
                self.session.set(session.clone());
                info!(user_id = %session.user.id, "Signed up");
                Ok(Some(session))
            }
            SignUpResponse::Pending(user) => {
                info!(user_id = %user.id, "Signed up, email confirmation pending");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self))]
    async fn sign_out(&self) -> Result<(), AuthError> {
        let Some(session) = self.session.clear() else {
            return Ok(());
        };

        // The local session is gone either way; a failed revoke only leaves
        // the token valid until it expires.
        let url = self.url("auth/v1/logout")?;
        self.post(url, &serde_json::json!({}), Some(session.bearer()))
            .await?;
        info!(user_id = %session.user.id, "Signed out");
        Ok(())
    }
}
