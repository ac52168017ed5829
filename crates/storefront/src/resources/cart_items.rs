//! Raw cart rows of the signed-in user.
//!
//! At most one row exists per (user, product): [`CartItemsResource::add`]
//! looks for an existing row and bumps its quantity before it ever inserts.

use tracing::{debug, instrument};

use voltline_core::{CartItemId, ProductId, UserId};

use super::DataContext;
use crate::cache::{CacheKey, Invalidation, QueryState};
use crate::error::StorefrontError;
use crate::models::{CartItem, CartItemPatch, NewCartItem};

/// Cart rows accessor and mutations.
#[derive(Clone)]
pub struct CartItemsResource {
    ctx: DataContext,
}

impl CartItemsResource {
    #[must_use]
    pub const fn new(ctx: DataContext) -> Self {
        Self { ctx }
    }

    /// Whether a user is signed in.
    #[must_use]
    pub fn is_signed_in(&self) -> bool {
        self.ctx.current_user().is_some()
    }

    fn invalidations(user: UserId) -> [Invalidation; 1] {
        [Invalidation::Key(CacheKey::CartItems(user))]
    }

    /// Rows of the signed-in user, joined with their product, in insertion
    /// order. Guests get an empty list without a remote call.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<CartItem>, StorefrontError> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(Vec::new());
        };
        let store = self.ctx.store();
        Ok(self
            .ctx
            .cache()
            .fetch(CacheKey::CartItems(user), store.list_cart_items(user))
            .await?)
    }

    /// Drop the signed-in user's cached rows so the next read re-fetches.
    pub async fn refresh(&self) {
        if let Some(user) = self.ctx.current_user() {
            self.ctx.cache().invalidate(&Self::invalidations(user)).await;
        }
    }

    /// Current state of the signed-in user's rows.
    pub async fn state(&self) -> QueryState<Vec<CartItem>> {
        match self.ctx.current_user() {
            Some(user) => self.ctx.cache().snapshot(&CacheKey::CartItems(user)).await,
            None => QueryState {
                data: Some(Vec::new()),
                ..QueryState::default()
            },
        }
    }

    /// Add `quantity` units of a product, merging into an existing row.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Unauthenticated`] for a guest, or the
    /// remote error.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<CartItem, StorefrontError> {
        let user = self.ctx.require_user()?;
        let store = self.ctx.store();

        let write = async {
            match store.find_cart_item(user, product_id).await? {
                Some(existing) => {
                    debug!(cart_item_id = %existing.id, "Merging into existing row");
                    let patch = CartItemPatch {
                        quantity: existing.quantity.saturating_add(quantity),
                    };
                    store.update_cart_item(existing.id, &patch).await
                }
                None => {
                    store
                        .insert_cart_item(&NewCartItem {
                            user_id: user,
                            product_id,
                            quantity,
                        })
                        .await
                }
            }
        };

        Ok(self
            .ctx
            .cache()
            .mutate(&Self::invalidations(user), write)
            .await?)
    }

    /// Set a row's quantity.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Unauthenticated`] for a guest, or the
    /// remote error.
    #[instrument(skip(self), fields(cart_item_id = %id))]
    pub async fn set_quantity(
        &self,
        id: CartItemId,
        quantity: u32,
    ) -> Result<CartItem, StorefrontError> {
        let user = self.ctx.require_user()?;
        let patch = CartItemPatch { quantity };
        Ok(self
            .ctx
            .cache()
            .mutate(
                &Self::invalidations(user),
                self.ctx.store().update_cart_item(id, &patch),
            )
            .await?)
    }

    /// Delete rows by id.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Unauthenticated`] for a guest, or the
    /// remote error.
    #[instrument(skip(self))]
    pub async fn remove(&self, ids: &[CartItemId]) -> Result<(), StorefrontError> {
        let user = self.ctx.require_user()?;
        Ok(self
            .ctx
            .cache()
            .mutate(
                &Self::invalidations(user),
                self.ctx.store().delete_cart_items(ids),
            )
            .await?)
    }

    /// Delete every row of the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Unauthenticated`] for a guest, or the
    /// remote error.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StorefrontError> {
        let user = self.ctx.require_user()?;
        Ok(self
            .ctx
            .cache()
            .mutate(
                &Self::invalidations(user),
                self.ctx.store().delete_cart_items_for_user(user),
            )
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use secrecy::SecretString;
    use voltline_core::Price;

    use super::*;
    use crate::auth::{AuthUser, Session, SessionSlot, UserMetadata};
    use crate::backend::{InMemoryStore, StoreCall};
    use crate::cache::QueryCache;
    use crate::config::CacheConfig;
    use crate::models::Product;

    fn product(id: i64, cents: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id, "name": format!("P{id}"), "brand": "ABB", "category": "bt",
            "price": Price::from_cents(cents), "in_stock": true, "stock_quantity": 20
        }))
        .unwrap()
    }

    fn resource(store: &InMemoryStore, session: SessionSlot) -> CartItemsResource {
        let cache = QueryCache::new(&CacheConfig {
            ttl: Duration::from_secs(300),
            capacity: 100,
        });
        CartItemsResource::new(DataContext::new(Arc::new(store.clone()), cache, session))
    }

    fn signed_in(user: UserId) -> SessionSlot {
        let slot = SessionSlot::new();
        slot.set(Session {
            user: AuthUser {
                id: user,
                email: None,
                metadata: UserMetadata::default(),
            },
            access_token: SecretString::from("t"),
            refresh_token: None,
            expires_at: None,
        });
        slot
    }

    #[tokio::test]
    async fn test_guest_list_is_empty_without_request() {
        let store = InMemoryStore::new();
        let cart = resource(&store, SessionSlot::new());

        assert!(cart.list().await.unwrap().is_empty());
        assert_eq!(cart.state().await.data, Some(Vec::new()));
        assert!(store.calls().is_empty());
        assert!(matches!(
            cart.add(ProductId::new(7), 1).await,
            Err(StorefrontError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn test_add_merges_into_one_row() {
        let store = InMemoryStore::with_products([product(7, 5000)]);
        let user = UserId::random();
        let cart = resource(&store, signed_in(user));

        cart.add(ProductId::new(7), 2).await.unwrap();
        let merged = cart.add(ProductId::new(7), 3).await.unwrap();
        assert_eq!(merged.quantity, 5);

        let rows = cart.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity, 5);
        assert_eq!(store.count(StoreCall::InsertCartItem), 1);
        assert_eq!(store.count(StoreCall::UpdateCartItem), 1);
    }

    #[tokio::test]
    async fn test_mutations_invalidate_cached_rows() {
        let store = InMemoryStore::with_products([product(7, 5000), product(9, 1000)]);
        let user = UserId::random();
        let cart = resource(&store, signed_in(user));

        let row = cart.add(ProductId::new(7), 1).await.unwrap();
        cart.add(ProductId::new(9), 1).await.unwrap();
        assert_eq!(cart.list().await.unwrap().len(), 2);

        cart.set_quantity(row.id, 4).await.unwrap();
        assert_eq!(cart.list().await.unwrap()[0].quantity, 4);

        cart.remove(&[row.id]).await.unwrap();
        assert_eq!(cart.list().await.unwrap().len(), 1);

        cart.clear().await.unwrap();
        assert!(cart.list().await.unwrap().is_empty());
        assert_eq!(store.count(StoreCall::ListCartItems), 4);
    }
}
