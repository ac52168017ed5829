//! Integration tests for Voltline.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p voltline-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `cart` - Cart row invariants and guest behavior
//! - `checkout` - Order creation, snapshot prices, partial failures
//! - `roles` - Role defaults, admin gating, back-office mutations
//! - `rest_backend` - The same flows over HTTP against a mock backend
//!
//! Everything except `rest_backend` runs through [`Storefront`] with an
//! [`InMemoryStore`] and a [`LocalIdentity`], so no backend is needed.

#![allow(clippy::unwrap_used, clippy::missing_panics_doc)]

use std::sync::Arc;

use secrecy::SecretString;

use voltline_core::{Address, AppRole, Email, Price, UserId};
use voltline_storefront::Storefront;
use voltline_storefront::auth::{LocalIdentity, SessionSlot, UserMetadata};
use voltline_storefront::backend::InMemoryStore;
use voltline_storefront::models::Product;

/// Password used for every test account.
pub const PASSWORD: &str = "test-password";

/// A storefront over in-memory collaborators, with handles on both.
pub struct TestContext {
    pub storefront: Storefront,
    pub store: InMemoryStore,
    pub identity: LocalIdentity,
}

impl TestContext {
    /// Catalog with product 7 at 50.00 and product 9 at 10.00.
    #[must_use]
    pub fn new() -> Self {
        Self::with_products([product(7, 5000), product(9, 1000)])
    }

    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = InMemoryStore::with_products(products);
        let identity = LocalIdentity::new(SessionSlot::new());
        let storefront = Storefront::builder()
            .store(Arc::new(store.clone()))
            .identity(Arc::new(identity.clone()))
            .build();
        Self {
            storefront,
            store,
            identity,
        }
    }

    /// Register an account with the shared password.
    pub fn register(&self, email: &str) -> UserId {
        self.identity
            .register(
                Email::parse(email).unwrap(),
                PASSWORD,
                UserMetadata::default(),
            )
            .unwrap()
    }

    /// Register an account and grant it the admin role.
    pub fn register_admin(&self, email: &str) -> UserId {
        let id = self.register(email);
        self.store.seed_role(id, AppRole::Admin);
        id
    }

    /// Sign in as `email`, registering it first if needed.
    pub async fn sign_in(&self, email: &str) -> UserId {
        let password = SecretString::from(PASSWORD);
        if let Ok(user) = self.storefront.sign_in(email, &password).await {
            return user.id;
        }
        self.register(email);
        self.storefront.sign_in(email, &password).await.unwrap().id
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// An in-stock product row.
#[must_use]
pub fn product(id: i64, cents: i64) -> Product {
    serde_json::from_value(serde_json::json!({
        "id": id,
        "name": format!("Produit {id}"),
        "brand": "Schneider Electric",
        "category": "disjoncteurs",
        "price": Price::from_cents(cents),
        "in_stock": true,
        "stock_quantity": 50,
    }))
    .unwrap()
}

/// A complete shipping address.
#[must_use]
pub fn address() -> Address {
    Address::new("SARL Dupont", "12 rue Volta", "Lyon", "69003", "France")
}
