//! Cart invariants through the storefront services.

#![allow(clippy::unwrap_used)]

use futures::future::join_all;

use voltline_core::{Price, ProductId};
use voltline_storefront::StorefrontError;
use voltline_storefront::backend::{RemoteStore, StoreCall};
use voltline_storefront::error::ValidationError;
use voltline_integration_tests::TestContext;

// ============================================================================
// Row Invariants
// ============================================================================

#[tokio::test]
async fn test_same_product_twice_is_one_row() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u1@example.fr").await;
    let cart = ctx.storefront.cart();

    cart.add_item(ProductId::new(7), 2).await.unwrap();
    cart.add_item(ProductId::new(7), 3).await.unwrap();

    let rows = ctx.store.cart_snapshot(user);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 5);

    let view = cart.view().await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.total_items, 5);
}

#[tokio::test]
async fn test_quantity_floor_removes_row() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u1@example.fr").await;
    let cart = ctx.storefront.cart();

    cart.add_item(ProductId::new(7), 2).await.unwrap();
    cart.add_item(ProductId::new(9), 1).await.unwrap();

    cart.update_quantity(ProductId::new(7), 0).await.unwrap();
    cart.update_quantity(ProductId::new(9), -4).await.unwrap();

    assert!(ctx.store.cart_snapshot(user).is_empty());
    assert!(cart.view().await.unwrap().items.is_empty());
}

#[tokio::test]
async fn test_update_quantity_sets_absolute_value() {
    let ctx = TestContext::new();
    ctx.sign_in("u1@example.fr").await;
    let cart = ctx.storefront.cart();

    cart.add_item(ProductId::new(9), 1).await.unwrap();
    cart.update_quantity(ProductId::new(9), 4).await.unwrap();

    let view = cart.view().await.unwrap();
    assert_eq!(view.total_items, 4);
    assert_eq!(view.total_price, Price::from_cents(4000));
}

#[tokio::test]
async fn test_totals_use_read_time_prices() {
    let ctx = TestContext::new();
    ctx.sign_in("u1@example.fr").await;
    let cart = ctx.storefront.cart();

    cart.add_item(ProductId::new(7), 2).await.unwrap();
    cart.add_item(ProductId::new(9), 1).await.unwrap();

    let view = cart.view().await.unwrap();
    assert_eq!(view.total_items, 3);
    assert_eq!(view.total_price, Price::from_cents(11000));
    assert_eq!(view.total_price.to_string(), "110.00 €");
}

// ============================================================================
// Guest And Missing-Row No-ops
// ============================================================================

#[tokio::test]
async fn test_guest_mutations_are_silent_noops() {
    let ctx = TestContext::new();
    let cart = ctx.storefront.cart();

    cart.add_item(ProductId::new(7), 2).await.unwrap();
    cart.update_quantity(ProductId::new(7), 3).await.unwrap();
    cart.remove_item(ProductId::new(7)).await.unwrap();
    cart.clear().await.unwrap();

    assert!(ctx.store.calls().is_empty());
    assert!(cart.view().await.unwrap().items.is_empty());
}

#[tokio::test]
async fn test_missing_row_mutations_touch_nothing() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u1@example.fr").await;
    let cart = ctx.storefront.cart();

    cart.add_item(ProductId::new(7), 2).await.unwrap();
    ctx.store.clear_calls();

    cart.remove_item(ProductId::new(9)).await.unwrap();
    cart.update_quantity(ProductId::new(9), 5).await.unwrap();
    cart.update_quantity(ProductId::new(9), 0).await.unwrap();

    assert_eq!(ctx.store.count(StoreCall::DeleteCartItems), 0);
    assert_eq!(ctx.store.count(StoreCall::UpdateCartItem), 0);
    let rows = ctx.store.cart_snapshot(user);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].quantity, 2);
}

#[tokio::test]
async fn test_carts_are_per_user() {
    let ctx = TestContext::new();
    let cart = ctx.storefront.cart();

    let a = ctx.sign_in("a@example.fr").await;
    cart.add_item(ProductId::new(7), 1).await.unwrap();

    let b = ctx.sign_in("b@example.fr").await;
    assert!(cart.view().await.unwrap().items.is_empty());
    cart.add_item(ProductId::new(9), 2).await.unwrap();

    assert_eq!(ctx.store.cart_snapshot(a)[0].product_id, ProductId::new(7));
    assert_eq!(ctx.store.cart_snapshot(b)[0].product_id, ProductId::new(9));
}

#[tokio::test]
async fn test_clear_empties_only_current_user() {
    let ctx = TestContext::new();
    let cart = ctx.storefront.cart();

    let a = ctx.sign_in("a@example.fr").await;
    cart.add_item(ProductId::new(7), 1).await.unwrap();
    let b = ctx.sign_in("b@example.fr").await;
    cart.add_item(ProductId::new(7), 1).await.unwrap();
    cart.clear().await.unwrap();

    assert!(ctx.store.cart_snapshot(b).is_empty());
    assert_eq!(ctx.store.cart_snapshot(a).len(), 1);
}

#[tokio::test]
async fn test_update_quantity_after_remote_delete() {
    let ctx = TestContext::new();
    let user = ctx.sign_in("u1@example.fr").await;
    let cart = ctx.storefront.cart();
    cart.add_item(ProductId::new(7), 2).await.unwrap();
    cart.add_item(ProductId::new(9), 1).await.unwrap();
    assert_eq!(cart.view().await.unwrap().total_items, 3);

    // Another session removes the row while this one still has it cached.
    let stale: Vec<_> = ctx
        .store
        .cart_snapshot(user)
        .into_iter()
        .filter(|row| row.product_id == ProductId::new(7))
        .map(|row| row.id)
        .collect();
    ctx.store.delete_cart_items(&stale).await.unwrap();

    cart.update_quantity(ProductId::new(7), 5).await.unwrap();

    let view = cart.view().await.unwrap();
    assert_eq!(view.items.len(), 1);
    assert_eq!(view.items[0].product_id, ProductId::new(9));
    assert_eq!(view.total_items, 1);
}

#[tokio::test]
async fn test_oversized_quantity_is_rejected() {
    let ctx = TestContext::new();
    ctx.sign_in("u1@example.fr").await;
    let cart = ctx.storefront.cart();
    cart.add_item(ProductId::new(7), 1).await.unwrap();
    cart.add_item(ProductId::new(9), 1).await.unwrap();

    cart.update_quantity(ProductId::new(7), i64::from(u32::MAX))
        .await
        .unwrap();
    assert_eq!(cart.view().await.unwrap().total_items, u32::MAX);

    let err = cart
        .update_quantity(ProductId::new(9), i64::MAX)
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        StorefrontError::Validation(ValidationError::InvalidQuantity { .. })
    ));
    assert_eq!(ctx.store.count(StoreCall::UpdateCartItem), 1);
}

// ============================================================================
// Concurrency
// ============================================================================

#[tokio::test]
async fn test_concurrent_views_share_one_fetch() {
    let ctx = TestContext::new();
    ctx.sign_in("u1@example.fr").await;
    ctx.storefront
        .cart()
        .add_item(ProductId::new(9), 4)
        .await
        .unwrap();
    let before = ctx.store.count(StoreCall::ListCartItems);

    ctx.storefront.cache().clear();
    let cart = ctx.storefront.cart();
    let views = join_all((0..8).map(|_| cart.view())).await;

    for view in views {
        assert_eq!(view.unwrap().total_price, Price::from_cents(4000));
    }
    assert_eq!(ctx.store.count(StoreCall::ListCartItems), before + 1);
}
