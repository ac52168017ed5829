//! Subcommand implementations.

pub mod admin;
pub mod cart;
pub mod checkout;
pub mod demo;
pub mod orders;
pub mod products;
pub mod routes;

use std::fmt::Display;

use secrecy::SecretString;
use thiserror::Error;
use tracing::info;

use voltline_storefront::config::{ConfigError, StorefrontConfig};
use voltline_storefront::{Storefront, StorefrontError};

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CliError {
    /// Environment configuration is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A storefront operation failed.
    #[error("{0}")]
    Storefront(#[from] StorefrontError),

    /// `--email` was given without a password.
    #[error("Missing password: set VOLTLINE_PASSWORD or pass --password")]
    MissingPassword,

    /// The command needs a signed-in user.
    #[error("This command requires --email")]
    SignInRequired,

    /// An argument could not be interpreted.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Output could not be rendered.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Connect to the configured backend, signing in when `email` is given.
///
/// # Errors
///
/// Returns an error if the configuration is invalid or sign-in fails.
pub async fn connect(
    email: Option<&str>,
    password: Option<&SecretString>,
) -> Result<Storefront, CliError> {
    let config = StorefrontConfig::from_env()?;
    let storefront = Storefront::connect(&config)?;

    if let Some(email) = email {
        let password = password.ok_or(CliError::MissingPassword)?;
        let user = storefront.sign_in(email, password).await?;
        info!(user_id = %user.id, "Signed in");
    }
    Ok(storefront)
}

/// Fail unless a user is signed in.
fn require_sign_in(storefront: &Storefront) -> Result<(), CliError> {
    storefront
        .current_user()
        .map(drop)
        .ok_or(CliError::SignInRequired)
}

/// Write one line of command output.
#[allow(clippy::print_stdout)]
pub fn emit(line: impl Display) {
    println!("{line}");
}

/// Write a value as pretty JSON.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn emit_json(value: &impl serde::Serialize) -> Result<(), CliError> {
    emit(serde_json::to_string_pretty(value)?);
    Ok(())
}
