//! Offline walkthrough of the cart-to-order flow.
//!
//! Runs against an [`InMemoryStore`] and a [`LocalIdentity`], so it needs no
//! backend configuration.

use std::sync::Arc;

use secrecy::SecretString;
use serde_json::json;

use voltline_core::{Address, AppRole, Email, OrderStatus, Price, ProductId};
use voltline_storefront::{Storefront, StorefrontError};
use voltline_storefront::auth::{LocalIdentity, SessionSlot, UserMetadata};
use voltline_storefront::backend::InMemoryStore;
use voltline_storefront::checkout::CheckoutRequest;
use voltline_storefront::models::Product;
use voltline_storefront::routes::Route;

use super::cart::print_cart;
use super::orders::print_detail;
use super::{CliError, emit};

const BUYER: &str = "acheteur@voltline.fr";
const ADMIN: &str = "admin@voltline.fr";
const PASSWORD: &str = "demo-password";

fn product(
    id: i64,
    name: &str,
    brand: &str,
    category: &str,
    cents: i64,
) -> Result<Product, CliError> {
    Ok(serde_json::from_value(json!({
        "id": id,
        "name": name,
        "brand": brand,
        "category": category,
        "price": Price::from_cents(cents),
        "in_stock": true,
        "stock_quantity": 25,
    }))?)
}

fn email(raw: &str) -> Result<Email, CliError> {
    Email::parse(raw).map_err(|e| CliError::InvalidArgument(e.to_string()))
}

/// Run the scenario and print each step.
///
/// # Errors
///
/// Returns an error if any step fails.
pub async fn run() -> Result<(), CliError> {
    let store = InMemoryStore::with_products([
        product(7, "Contacteur TeSys D 25A", "Schneider Electric", "automation", 5000)?,
        product(9, "Bornier de raccordement", "Legrand", "armoires", 1000)?,
    ]);
    let identity = LocalIdentity::new(SessionSlot::new());
    let storefront = Storefront::builder()
        .store(Arc::new(store.clone()))
        .identity(Arc::new(identity.clone()))
        .build();

    let metadata = UserMetadata {
        name: Some("Claire Martin".into()),
        company: Some("Martin Électricité".into()),
        phone: None,
    };
    identity
        .register(email(BUYER)?, PASSWORD, metadata)
        .map_err(StorefrontError::from)?;
    let admin = identity
        .register(email(ADMIN)?, PASSWORD, UserMetadata::default())
        .map_err(StorefrontError::from)?;
    store.seed_role(admin, AppRole::Admin);

    let password = SecretString::from(PASSWORD);
    let buyer = storefront.sign_in(BUYER, &password).await?;
    emit(format_args!("Connecté : {BUYER} ({})", buyer.id));

    let cart = storefront.cart();
    cart.add_item(ProductId::new(7), 2).await?;
    cart.add_item(ProductId::new(9), 1).await?;
    emit("\nPanier :");
    print_cart(&cart.view().await?);

    let request = CheckoutRequest::new(
        cart.rows().await?,
        Address::new("Martin Électricité", "4 quai Ampère", "Grenoble", "38000", "France"),
    )
    .with_payment_method("virement");
    let order = storefront
        .checkout()
        .create_order(request)
        .await
        .map_err(StorefrontError::from)?;
    emit("\nCommande :");
    print_detail(&storefront.orders().get(order.id).await?);

    emit("\nPanier après commande :");
    print_cart(&cart.view().await?);

    emit("\nAccès :");
    for route in [Route::Checkout, Route::Admin] {
        emit(format_args!("  {route} -> {:?}", storefront.access(&route).await?));
    }

    storefront.sign_in(ADMIN, &password).await?;
    storefront
        .orders()
        .update_status(order.id, OrderStatus::Delivered)
        .await?;
    let stats = storefront.analytics().sales_stats().await?;
    emit("\nTableau de bord :");
    emit(format_args!("  Chiffre d'affaires : {}", stats.total_revenue));
    emit(format_args!("  Commandes : {}", stats.total_orders));

    storefront.sign_out().await?;
    Ok(())
}
