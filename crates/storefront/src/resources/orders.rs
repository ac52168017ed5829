//! Orders: the signed-in user's history, the admin list, and status changes.
//!
//! Order creation lives in [`crate::checkout`].

use chrono::Utc;
use tracing::{info, instrument};

use voltline_core::{OrderId, OrderStatus};

use super::DataContext;
use crate::cache::{CacheKey, Invalidation, QueryState, Resource};
use crate::error::StorefrontError;
use crate::models::{Order, OrderStatusUpdate};

/// Orders accessor and admin status writes.
#[derive(Clone)]
pub struct OrdersResource {
    ctx: DataContext,
}

impl OrdersResource {
    #[must_use]
    pub const fn new(ctx: DataContext) -> Self {
        Self { ctx }
    }

    /// The signed-in user's orders with their lines, newest first. Guests
    /// get an empty list without a remote call.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    #[instrument(skip(self))]
    pub async fn list_for_current_user(&self) -> Result<Vec<Order>, StorefrontError> {
        let Some(user) = self.ctx.current_user() else {
            return Ok(Vec::new());
        };
        let store = self.ctx.store();
        Ok(self
            .ctx
            .cache()
            .fetch(CacheKey::Orders(Some(user)), store.list_orders(Some(user)))
            .await?)
    }

    /// Current state of the signed-in user's order list.
    pub async fn state(&self) -> QueryState<Vec<Order>> {
        match self.ctx.current_user() {
            Some(user) => {
                self.ctx
                    .cache()
                    .snapshot(&CacheKey::Orders(Some(user)))
                    .await
            }
            None => QueryState {
                data: Some(Vec::new()),
                ..QueryState::default()
            },
        }
    }

    /// Every order (back office), newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    #[instrument(skip(self))]
    pub async fn list_all(&self) -> Result<Vec<Order>, StorefrontError> {
        let store = self.ctx.store();
        Ok(self
            .ctx
            .cache()
            .fetch(CacheKey::Orders(None), store.list_orders(None))
            .await?)
    }

    /// One order with its lines.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::NotFound`] if there is no such order, or
    /// the remote error.
    #[instrument(skip(self), fields(order_id = %id))]
    pub async fn get(&self, id: OrderId) -> Result<Order, StorefrontError> {
        let store = self.ctx.store();
        self.ctx
            .cache()
            .fetch(CacheKey::OrderDetail(id), store.get_order(id))
            .await?
            .ok_or_else(|| StorefrontError::NotFound(format!("order {id}")))
    }

    /// Change an order's status and stamp `updated_at`.
    ///
    /// # Errors
    ///
    /// Returns error if the remote update fails.
    #[instrument(skip(self), fields(order_id = %id, status = %status))]
    pub async fn update_status(
        &self,
        id: OrderId,
        status: OrderStatus,
    ) -> Result<Order, StorefrontError> {
        let update = OrderStatusUpdate {
            status,
            updated_at: Utc::now(),
        };
        let invalidations = [
            Invalidation::Resource(Resource::Orders),
            Invalidation::Key(CacheKey::OrderDetail(id)),
            Invalidation::Key(CacheKey::SalesStats),
        ];
        let order = self
            .ctx
            .cache()
            .mutate(
                &invalidations,
                self.ctx.store().update_order_status(id, &update),
            )
            .await?;
        info!("Order status updated");
        Ok(order)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use secrecy::SecretString;
    use voltline_core::{Address, PaymentStatus, Price, UserId};

    use super::*;
    use crate::auth::{AuthUser, Session, SessionSlot, UserMetadata};
    use crate::backend::{InMemoryStore, RemoteStore, StoreCall};
    use crate::cache::QueryCache;
    use crate::config::CacheConfig;
    use crate::models::NewOrder;

    fn resource(store: &InMemoryStore, session: SessionSlot) -> OrdersResource {
        let cache = QueryCache::new(&CacheConfig {
            ttl: Duration::from_secs(300),
            capacity: 100,
        });
        OrdersResource::new(DataContext::new(Arc::new(store.clone()), cache, session))
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

    async fn place(store: &InMemoryStore, user: UserId) -> Order {
        store
            .insert_order(&NewOrder {
                user_id: user,
                status: OrderStatus::Pending,
                payment_status: PaymentStatus::Pending,
                total_amount: Price::from_cents(2500),
                shipping_address: Address::new("n", "s", "c", "p", "France"),
                billing_address: None,
                payment_method: Some("card".into()),
                notes: None,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_guest_has_no_orders() {
        let store = InMemoryStore::new();
        let orders = resource(&store, SessionSlot::new());
        assert!(orders.list_for_current_user().await.unwrap().is_empty());
        assert_eq!(store.count(StoreCall::ListOrders), 0);
    }

    #[tokio::test]
    async fn test_status_update_refreshes_every_orders_key() {
        let store = InMemoryStore::new();
        let user = UserId::random();
        let order = place(&store, user).await;
        place(&store, UserId::random()).await;
        let orders = resource(&store, signed_in(user));

        assert_eq!(orders.list_for_current_user().await.unwrap().len(), 1);
        assert_eq!(orders.list_all().await.unwrap().len(), 2);
        assert_eq!(orders.get(order.id).await.unwrap().status, OrderStatus::Pending);

        let updated = orders
            .update_status(order.id, OrderStatus::Shipped)
            .await
            .unwrap();
        assert_eq!(updated.status, OrderStatus::Shipped);
        assert!(updated.updated_at >= order.updated_at);

        assert_eq!(
            orders.list_for_current_user().await.unwrap()[0].status,
            OrderStatus::Shipped
        );
        assert_eq!(orders.get(order.id).await.unwrap().status, OrderStatus::Shipped);
        assert_eq!(store.count(StoreCall::ListOrders), 3);
    }

    #[tokio::test]
    async fn test_missing_order_is_not_found() {
        let store = InMemoryStore::new();
        let orders = resource(&store, SessionSlot::new());
        let err = orders.get(OrderId::random()).await.unwrap_err();
        assert!(matches!(err, StorefrontError::NotFound(_)));
    }
}
