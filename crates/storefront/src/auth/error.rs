//! Authentication error types.

use thiserror::Error;

/// Minimum password length enforced by the identity backend.
pub const MIN_PASSWORD_LENGTH: usize = 6;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] voltline_core::EmailError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Password too weak or invalid.
    #[error("password validation failed: {0}")]
    WeakPassword(String),

    /// Account exists but its email address was never confirmed.
    #[error("email not confirmed")]
    EmailNotConfirmed,

    /// Any other refusal from the identity backend.
    #[error("identity provider error: HTTP {status}: {message}")]
    Provider { status: u16, message: String },

    /// The identity backend could not be reached.
    #[error("HTTP error: {0}")]
    Transport(String),

    /// The identity backend answered with an unexpected body.
    #[error("failed to decode identity response: {0}")]
    Decode(String),
}

impl AuthError {
    /// Classify an error message returned by the identity backend.
    #[must_use]
    pub fn from_provider(status: u16, message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("invalid login credentials") || lower.contains("invalid_credentials") {
            Self::InvalidCredentials
        } else if lower.contains("already registered") || lower.contains("user_already_exists") {
            Self::UserAlreadyExists
        } else if lower.contains("password should be") || lower.contains("weak_password") {
            Self::WeakPassword(message.to_string())
        } else if lower.contains("email not confirmed") || lower.contains("email_not_confirmed") {
            Self::EmailNotConfirmed
        } else {
            Self::Provider {
                status,
                message: message.to_string(),
            }
        }
    }
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Reject passwords the identity backend would refuse.
///
/// # Errors
///
/// Returns [`AuthError::WeakPassword`] if the password is too short.
pub fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "Password should be at least {MIN_PASSWORD_LENGTH} characters."
        )));
    }
    Ok(())
}
