//! Unified error handling with Sentry integration.
//!
//! Every public operation returns [`StorefrontError`]. Callers show
//! [`StorefrontError::user_message`] as a transient notification and call
//! [`StorefrontError::report`] to log the technical detail; server-side
//! failures are captured to Sentry there. No error is fatal to the process.

use thiserror::Error;

use voltline_core::{AddressError, ProductId};

use crate::auth::AuthError;
use crate::backend::BackendError;
use crate::checkout::CheckoutError;
use crate::config::ConfigError;

/// Input rejected before any remote call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The operation needs a signed-in user.
    #[error("sign-in required")]
    SignInRequired,

    /// Checkout was attempted with no cart lines.
    #[error("cart is empty")]
    EmptyCart,

    /// A required address field is blank.
    #[error(transparent)]
    Address(#[from] AddressError),

    /// A cart line has no joined product, so its price is unknown.
    #[error("no price snapshot for product {0}")]
    MissingPriceSnapshot(ProductId),

    /// A quantity is zero on a checkout line, or larger than a cart row holds.
    #[error("invalid quantity {quantity} for product {product_id}")]
    InvalidQuantity { product_id: ProductId, quantity: i64 },
}

impl ValidationError {
    fn user_message(&self) -> &'static str {
        match self {
            Self::SignInRequired => "Vous devez être connecté pour passer commande.",
            Self::EmptyCart => "Votre panier est vide.",
            Self::Address(_) => "Veuillez remplir tous les champs obligatoires.",
            Self::MissingPriceSnapshot(_) => {
                "Un produit de votre panier n'est plus disponible. Veuillez actualiser votre panier."
            }
            Self::InvalidQuantity { .. } => "La quantité demandée n'est pas valide.",
        }
    }
}

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum StorefrontError {
    /// Input rejected locally.
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Remote call failed.
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order creation failed.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),

    /// Configuration could not be loaded.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// User is not signed in.
    #[error("Unauthenticated")]
    Unauthenticated,

    /// Signed-in user lacks the admin role.
    #[error("Forbidden: {0}")]
    Forbidden(&'static str),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl StorefrontError {
    /// Whether the failure happened outside the caller's control and should
    /// be tracked.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        match self {
            Self::Backend(_) | Self::Config(_) => true,
            Self::Checkout(err) => !matches!(err, CheckoutError::Validation(_)),
            Self::Auth(err) => matches!(
                err,
                AuthError::Provider { .. } | AuthError::Transport(_) | AuthError::Decode(_)
            ),
            Self::Validation(_) | Self::Unauthenticated | Self::Forbidden(_) | Self::NotFound(_) => {
                false
            }
        }
    }

    /// Generic text to show the user. Technical detail stays in the logs.
    #[must_use]
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Validation(err) | Self::Checkout(CheckoutError::Validation(err)) => {
                err.user_message()
            }
            Self::Checkout(_) => "Une erreur est survenue lors de la création de votre commande.",
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => {
                    "Identifiants invalides. Vérifiez votre email et mot de passe."
                }
                AuthError::UserAlreadyExists => "Un compte existe déjà avec cet email.",
                AuthError::WeakPassword(_) => {
                    "Le mot de passe doit contenir au moins 6 caractères."
                }
                AuthError::InvalidEmail(_) => "Adresse email invalide.",
                AuthError::EmailNotConfirmed => "Veuillez confirmer votre adresse email.",
                _ => "Une erreur s'est produite.",
            },
            Self::Unauthenticated => "Vous devez être connecté pour accéder à cette page.",
            Self::Forbidden(_) => "Accès réservé aux administrateurs.",
            Self::NotFound(_) => "Élément introuvable.",
            Self::Backend(_) | Self::Config(_) => "Une erreur s'est produite. Veuillez réessayer.",
        }
    }

    /// Log the error and capture server-side failures to Sentry.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Operation failed"
            );
        } else {
            tracing::info!(error = %self, "Operation rejected");
        }
    }
}

/// Result type alias for `StorefrontError`.
pub type Result<T> = std::result::Result<T, StorefrontError>;

/// Set the Sentry user context from a user ID.
///
/// Call this after successful authentication to associate errors with users.
pub fn set_sentry_user(user_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(user_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
///
/// Call this on sign-out to stop associating errors with the user.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added product", Some(&[("product_id", "7")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}
