//! In-process [`RemoteStore`] with the REST backend's read semantics.
//!
//! Reads join cart rows with their product and orders with their lines, the
//! way the embedded selects of [`super::RestStore`] do. Every call is logged
//! as a [`StoreCall`], and any call can be made to fail on demand.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use voltline_core::{
    AnalyticsEventId, AppRole, CartItemId, OrderId, OrderItemId, Price, ProductId, UserId,
    UserRoleId,
};

use super::{ApiError, BackendError, RemoteStore, Table};
use crate::models::{
    AnalyticsEvent, CartItem, CartItemPatch, DateRange, NewAnalyticsEvent, NewCartItem, NewOrder,
    NewOrderItem, NewProduct, NewUserRole, Order, OrderItem, OrderItemProduct, OrderStatusUpdate,
    Product, Profile, RoleUpdate, StockUpdate, UserRole,
};

/// One [`RemoteStore`] operation, as recorded in the call log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreCall {
    ListProducts,
    GetProduct,
    InsertProduct,
    UpdateProductStock,
    ListCartItems,
    FindCartItem,
    InsertCartItem,
    UpdateCartItem,
    DeleteCartItems,
    DeleteCartItemsForUser,
    ListOrders,
    GetOrder,
    InsertOrder,
    InsertOrderItems,
    UpdateOrderStatus,
    ListProfiles,
    GetProfile,
    UpsertProfile,
    GetUserRole,
    ListUserRoles,
    InsertUserRole,
    UpdateUserRole,
    InsertAnalyticsEvent,
    ListAnalyticsEvents,
}

impl StoreCall {
    /// Table the operation touches.
    #[must_use]
    pub const fn table(self) -> Table {
        match self {
            Self::ListProducts | Self::GetProduct | Self::InsertProduct | Self::UpdateProductStock => {
                Table::Products
            }
            Self::ListCartItems
            | Self::FindCartItem
            | Self::InsertCartItem
            | Self::UpdateCartItem
            | Self::DeleteCartItems
            | Self::DeleteCartItemsForUser => Table::CartItems,
            Self::ListOrders | Self::GetOrder | Self::InsertOrder | Self::UpdateOrderStatus => {
                Table::Orders
            }
            Self::InsertOrderItems => Table::OrderItems,
            Self::ListProfiles | Self::GetProfile | Self::UpsertProfile => Table::Profiles,
            Self::GetUserRole | Self::ListUserRoles | Self::InsertUserRole | Self::UpdateUserRole => {
                Table::UserRoles
            }
            Self::InsertAnalyticsEvent | Self::ListAnalyticsEvents => Table::Analytics,
        }
    }
}

/// How long an injected fault lasts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultMode {
    /// Fail the next matching call only.
    Once,
    /// Fail every matching call until [`InMemoryStore::heal`].
    Always,
}

#[derive(Default)]
struct Tables {
    products: Vec<Product>,
    cart_items: Vec<CartItem>,
    orders: Vec<Order>,
    order_items: Vec<OrderItem>,
    profiles: Vec<Profile>,
    user_roles: Vec<UserRole>,
    analytics: Vec<AnalyticsEvent>,
}

#[derive(Default)]
struct State {
    tables: Tables,
    calls: Vec<StoreCall>,
    faults: HashMap<StoreCall, FaultMode>,
    latency: Option<Duration>,
}

/// Process-local backend. Cloning shares the data.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<Mutex<State>>,
}

impl InMemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-filled with `products`, in the given insertion order.
    #[must_use]
    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let store = Self::new();
        for product in products {
            store.seed_product(product);
        }
        store
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record `call`, apply latency and injected faults.
    async fn begin(&self, call: StoreCall) -> Result<(), BackendError> {
        let (fault, latency) = {
            let mut state = self.state();
            state.calls.push(call);
            let fault = match state.faults.get(&call).copied() {
                Some(FaultMode::Once) => state.faults.remove(&call),
                other => other,
            };
            (fault, state.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match fault {
            Some(_) => Err(BackendError::api(
                call.table(),
                ApiError::new(503, format!("injected failure on {call:?}")).with_code("fault"),
            )),
            None => Ok(()),
        }
    }

    /// Insert or replace a product row as-is.
    pub fn seed_product(&self, product: Product) {
        let mut state = self.state();
        let products = &mut state.tables.products;
        match products.iter_mut().find(|p| p.id == product.id) {
            Some(existing) => *existing = product,
            None => products.push(product),
        }
    }

    /// Change a product's live price, as an external editor would.
    pub fn set_product_price(&self, id: ProductId, price: Price) {
        if let Some(product) = self.state().tables.products.iter_mut().find(|p| p.id == id) {
            product.price = price;
        }
    }

    /// Insert or replace a profile row.
    pub fn seed_profile(&self, profile: Profile) {
        let mut state = self.state();
        let profiles = &mut state.tables.profiles;
        match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => *existing = profile,
            None => profiles.push(profile),
        }
    }

    /// Give `user` a role row.
    pub fn seed_role(&self, user: UserId, role: AppRole) {
        let mut state = self.state();
        let roles = &mut state.tables.user_roles;
        match roles.iter_mut().find(|r| r.user_id == user) {
            Some(existing) => existing.role = role,
            None => roles.push(UserRole {
                id: UserRoleId::random(),
                user_id: user,
                role,
                created_at: Some(Utc::now()),
            }),
        }
    }

    /// Make `call` fail.
    pub fn fail(&self, call: StoreCall, mode: FaultMode) {
        self.state().faults.insert(call, mode);
    }

    /// Remove any fault injected for `call`.
    pub fn heal(&self, call: StoreCall) {
        self.state().faults.remove(&call);
    }

    /// Delay every call by `latency`.
    pub fn set_latency(&self, latency: Duration) {
        self.state().latency = Some(latency);
    }

    /// All calls so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state().calls.clone()
    }

    /// Number of times `call` was made.
    #[must_use]
    pub fn count(&self, call: StoreCall) -> usize {
        self.state().calls.iter().filter(|c| **c == call).count()
    }

    pub fn clear_calls(&self) {
        self.state().calls.clear();
    }

    /// Joined cart rows of `user`, without logging a call.
    #[must_use]
    pub fn cart_snapshot(&self, user: UserId) -> Vec<CartItem> {
        let state = self.state();
        state
            .tables
            .cart_items
            .iter()
            .filter(|item| item.user_id == user)
            .map(|item| join_cart_item(&state.tables, item))
            .collect()
    }

    /// Every order with its lines, newest first, without logging a call.
    #[must_use]
    pub fn orders_snapshot(&self) -> Vec<Order> {
        let state = self.state();
        state
            .tables
            .orders
            .iter()
            .rev()
            .map(|order| join_order(&state.tables, order))
            .collect()
    }

    /// Every analytics event, oldest first, without logging a call.
    #[must_use]
    pub fn analytics_snapshot(&self) -> Vec<AnalyticsEvent> {
        self.state().tables.analytics.clone()
    }
}

fn join_cart_item(tables: &Tables, item: &CartItem) -> CartItem {
    CartItem {
        product: tables
            .products
            .iter()
            .find(|p| p.id == item.product_id)
            .cloned(),
        ..item.clone()
    }
}

fn join_order(tables: &Tables, order: &Order) -> Order {
    let order_items = tables
        .order_items
        .iter()
        .filter(|line| line.order_id == order.id)
        .map(|line| OrderItem {
            product: tables
                .products
                .iter()
                .find(|p| p.id == line.product_id)
                .map(|p| OrderItemProduct {
                    id: p.id,
                    name: p.name.clone(),
                    image: p.image.clone(),
                    brand: p.brand.clone(),
                }),
            ..line.clone()
        })
        .collect();
    Order {
        order_items,
        ..order.clone()
    }
}

fn conflict(table: Table, message: &str) -> BackendError {
    BackendError::api(table, ApiError::new(409, message).with_code("23505"))
}

fn foreign_key(table: Table, message: &str) -> BackendError {
    BackendError::api(table, ApiError::new(409, message).with_code("23503"))
}

#[async_trait]
impl RemoteStore for InMemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, BackendError> {
        self.begin(StoreCall::ListProducts).await?;
        Ok(self.state().tables.products.iter().rev().cloned().collect())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, BackendError> {
        self.begin(StoreCall::GetProduct).await?;
        Ok(self
            .state()
            .tables
            .products
            .iter()
            .find(|p| p.id == id)
            .cloned())
    }

    async fn insert_product(&self, product: &NewProduct) -> Result<Product, BackendError> {
        self.begin(StoreCall::InsertProduct).await?;
        let mut state = self.state();
        let products = &mut state.tables.products;
        let next_id = products.iter().map(|p| p.id.as_i64()).max().unwrap_or(0) + 1;
        let row = Product {
            id: ProductId::new(next_id),
            name: product.name.clone(),
            brand: product.brand.clone(),
            category: product.category.clone(),
            price: product.price,
            original_price: product.original_price,
            image: product.image.clone(),
            badge: product.badge.clone(),
            short_description: product.short_description.clone(),
            features: product.features.clone(),
            technical_specs: product.technical_specs.clone(),
            in_stock: product.in_stock,
            stock_quantity: product.stock_quantity,
            low_stock_threshold: product.low_stock_threshold,
            total_sold: 0,
            created_at: Some(Utc::now()),
        };
        products.push(row.clone());
        Ok(row)
    }

    async fn update_product_stock(
        &self,
        id: ProductId,
        update: &StockUpdate,
    ) -> Result<Product, BackendError> {
        self.begin(StoreCall::UpdateProductStock).await?;
        let mut state = self.state();
        let product = state
            .tables
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or(BackendError::MissingRow(Table::Products.as_str()))?;
        product.stock_quantity = update.stock_quantity;
        product.in_stock = update.in_stock;
        if let Some(threshold) = update.low_stock_threshold {
            product.low_stock_threshold = threshold;
        }
        Ok(product.clone())
    }

    async fn list_cart_items(&self, user: UserId) -> Result<Vec<CartItem>, BackendError> {
        self.begin(StoreCall::ListCartItems).await?;
        Ok(self.cart_snapshot(user))
    }

    async fn find_cart_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<Option<CartItem>, BackendError> {
        self.begin(StoreCall::FindCartItem).await?;
        Ok(self
            .state()
            .tables
            .cart_items
            .iter()
            .find(|item| item.user_id == user && item.product_id == product)
            .cloned())
    }

    async fn insert_cart_item(&self, item: &NewCartItem) -> Result<CartItem, BackendError> {
        self.begin(StoreCall::InsertCartItem).await?;
        let mut state = self.state();
        let tables = &mut state.tables;
        if !tables.products.iter().any(|p| p.id == item.product_id) {
            return Err(foreign_key(
                Table::CartItems,
                "insert or update on table \"cart_items\" violates foreign key constraint",
            ));
        }
        if tables
            .cart_items
            .iter()
            .any(|row| row.user_id == item.user_id && row.product_id == item.product_id)
        {
            return Err(conflict(
                Table::CartItems,
                "duplicate key value violates unique constraint \"cart_items_user_id_product_id_key\"",
            ));
        }
        let row = CartItem {
            id: CartItemId::random(),
            user_id: item.user_id,
            product_id: item.product_id,
            quantity: item.quantity,
            product: None,
            created_at: Some(Utc::now()),
        };
        tables.cart_items.push(row.clone());
        Ok(join_cart_item(tables, &row))
    }

    async fn update_cart_item(
        &self,
        id: CartItemId,
        patch: &CartItemPatch,
    ) -> Result<CartItem, BackendError> {
        self.begin(StoreCall::UpdateCartItem).await?;
        let mut state = self.state();
        let tables = &mut state.tables;
        let row = tables
            .cart_items
            .iter_mut()
            .find(|item| item.id == id)
            .ok_or(BackendError::MissingRow(Table::CartItems.as_str()))?;
        row.quantity = patch.quantity;
        let row = row.clone();
        Ok(join_cart_item(tables, &row))
    }

    async fn delete_cart_items(&self, ids: &[CartItemId]) -> Result<(), BackendError> {
        self.begin(StoreCall::DeleteCartItems).await?;
        self.state()
            .tables
            .cart_items
            .retain(|item| !ids.contains(&item.id));
        Ok(())
    }

    async fn delete_cart_items_for_user(&self, user: UserId) -> Result<(), BackendError> {
        self.begin(StoreCall::DeleteCartItemsForUser).await?;
        self.state()
            .tables
            .cart_items
            .retain(|item| item.user_id != user);
        Ok(())
    }

    async fn list_orders(&self, user: Option<UserId>) -> Result<Vec<Order>, BackendError> {
        self.begin(StoreCall::ListOrders).await?;
        Ok(self
            .orders_snapshot()
            .into_iter()
            .filter(|order| user.is_none_or(|user| order.user_id == user))
            .collect())
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, BackendError> {
        self.begin(StoreCall::GetOrder).await?;
        let state = self.state();
        Ok(state
            .tables
            .orders
            .iter()
            .find(|order| order.id == id)
            .map(|order| join_order(&state.tables, order)))
    }

    async fn insert_order(&self, order: &NewOrder) -> Result<Order, BackendError> {
        self.begin(StoreCall::InsertOrder).await?;
        let now = Utc::now();
        let row = Order {
            id: OrderId::random(),
            user_id: order.user_id,
            status: order.status,
            payment_status: order.payment_status,
            total_amount: order.total_amount,
            shipping_address: order.shipping_address.clone(),
            billing_address: order.billing_address.clone(),
            payment_method: order.payment_method.clone(),
            notes: order.notes.clone(),
            created_at: now,
            updated_at: now,
            order_items: Vec::new(),
        };
        self.state().tables.orders.push(row.clone());
        Ok(row)
    }

    async fn insert_order_items(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, BackendError> {
        self.begin(StoreCall::InsertOrderItems).await?;
        let mut state = self.state();
        let tables = &mut state.tables;
        if let Some(orphan) = items
            .iter()
            .find(|item| !tables.orders.iter().any(|o| o.id == item.order_id))
        {
            return Err(foreign_key(
                Table::OrderItems,
                &format!("order {} does not exist", orphan.order_id),
            ));
        }

        let now = Utc::now();
        let rows: Vec<OrderItem> = items
            .iter()
            .map(|item| OrderItem {
                id: OrderItemId::random(),
                order_id: item.order_id,
                product_id: item.product_id,
                quantity: item.quantity,
                price: item.price,
                created_at: Some(now),
                product: None,
            })
            .collect();
        tables.order_items.extend(rows.iter().cloned());
        Ok(rows)
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        update: &OrderStatusUpdate,
    ) -> Result<Order, BackendError> {
        self.begin(StoreCall::UpdateOrderStatus).await?;
        let mut state = self.state();
        let tables = &mut state.tables;
        let order = tables
            .orders
            .iter_mut()
            .find(|order| order.id == id)
            .ok_or(BackendError::MissingRow(Table::Orders.as_str()))?;
        order.status = update.status;
        order.updated_at = update.updated_at;
        let order = order.clone();
        Ok(join_order(tables, &order))
    }

    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError> {
        self.begin(StoreCall::ListProfiles).await?;
        Ok(self.state().tables.profiles.iter().rev().cloned().collect())
    }

    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, BackendError> {
        self.begin(StoreCall::GetProfile).await?;
        Ok(self
            .state()
            .tables
            .profiles
            .iter()
            .find(|p| p.id == user)
            .cloned())
    }

    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile, BackendError> {
        self.begin(StoreCall::UpsertProfile).await?;
        let now = Utc::now();
        let mut state = self.state();
        let profiles = &mut state.tables.profiles;
        let row = match profiles.iter_mut().find(|p| p.id == profile.id) {
            Some(existing) => {
                existing.name.clone_from(&profile.name);
                existing.company.clone_from(&profile.company);
                existing.phone.clone_from(&profile.phone);
                existing.updated_at = Some(now);
                existing.clone()
            }
            None => {
                let row = Profile {
                    created_at: Some(now),
                    updated_at: Some(now),
                    ..profile.clone()
                };
                profiles.push(row.clone());
                row
            }
        };
        Ok(row)
    }

    async fn get_user_role(&self, user: UserId) -> Result<Option<UserRole>, BackendError> {
        self.begin(StoreCall::GetUserRole).await?;
        Ok(self
            .state()
            .tables
            .user_roles
            .iter()
            .find(|r| r.user_id == user)
            .cloned())
    }

    async fn list_user_roles(&self) -> Result<Vec<UserRole>, BackendError> {
        self.begin(StoreCall::ListUserRoles).await?;
        Ok(self.state().tables.user_roles.clone())
    }

    async fn insert_user_role(&self, role: &NewUserRole) -> Result<UserRole, BackendError> {
        self.begin(StoreCall::InsertUserRole).await?;
        let mut state = self.state();
        let roles = &mut state.tables.user_roles;
        if roles.iter().any(|r| r.user_id == role.user_id) {
            return Err(conflict(
                Table::UserRoles,
                "duplicate key value violates unique constraint \"user_roles_user_id_key\"",
            ));
        }
        let row = UserRole {
            id: UserRoleId::random(),
            user_id: role.user_id,
            role: role.role,
            created_at: Some(Utc::now()),
        };
        roles.push(row.clone());
        Ok(row)
    }

    async fn update_user_role(
        &self,
        user: UserId,
        update: &RoleUpdate,
    ) -> Result<UserRole, BackendError> {
        self.begin(StoreCall::UpdateUserRole).await?;
        let mut state = self.state();
        let row = state
            .tables
            .user_roles
            .iter_mut()
            .find(|r| r.user_id == user)
            .ok_or(BackendError::MissingRow(Table::UserRoles.as_str()))?;
        row.role = update.role;
        Ok(row.clone())
    }

    async fn insert_analytics_event(
        &self,
        event: &NewAnalyticsEvent,
    ) -> Result<AnalyticsEvent, BackendError> {
        self.begin(StoreCall::InsertAnalyticsEvent).await?;
        let row = AnalyticsEvent {
            id: AnalyticsEventId::random(),
            event_type: event.event_type.clone(),
            event_data: event.event_data.clone(),
            user_id: event.user_id,
            created_at: Utc::now(),
        };
        self.state().tables.analytics.push(row.clone());
        Ok(row)
    }

    async fn list_analytics_events(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<AnalyticsEvent>, BackendError> {
        self.begin(StoreCall::ListAnalyticsEvents).await?;
        Ok(self
            .state()
            .tables
            .analytics
            .iter()
            .rev()
            .filter(|event| range.is_none_or(|range| range.contains(event.created_at)))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use voltline_core::{Address, OrderStatus, PaymentStatus};

    use super::*;

    fn product(id: i64, cents: i64) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id, "name": format!("P{id}"), "brand": "ABB", "category": "bt",
            "price": Price::from_cents(cents), "in_stock": true, "stock_quantity": 20
        }))
        .unwrap()
    }

    fn new_order(user: UserId) -> NewOrder {
        NewOrder {
            user_id: user,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount: Price::from_cents(1000),
            shipping_address: Address::new("n", "s", "c", "p", "France"),
            billing_address: None,
            payment_method: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn test_cart_rows_join_live_product_in_insertion_order() {
        let store = InMemoryStore::with_products([product(7, 5000), product(9, 1000)]);
        let user = UserId::random();
        for id in [9, 7] {
            store
                .insert_cart_item(&NewCartItem {
                    user_id: user,
                    product_id: ProductId::new(id),
                    quantity: 1,
                })
                .await
                .unwrap();
        }

        store.set_product_price(ProductId::new(7), Price::from_cents(6000));
        let items = store.list_cart_items(user).await.unwrap();
        let ids: Vec<i64> = items.iter().map(|i| i.product_id.as_i64()).collect();
        assert_eq!(ids, [9, 7]);
        assert_eq!(items[1].snapshot_price(), Some(Price::from_cents(6000)));
        assert!(store.list_cart_items(UserId::random()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_cart_row_is_a_conflict() {
        let store = InMemoryStore::with_products([product(7, 5000)]);
        let item = NewCartItem {
            user_id: UserId::random(),
            product_id: ProductId::new(7),
            quantity: 1,
        };
        store.insert_cart_item(&item).await.unwrap();
        let err = store.insert_cart_item(&item).await.unwrap_err();
        assert!(err.is_conflict());
    }

    #[tokio::test]
    async fn test_fault_once_then_recovers() {
        let store = InMemoryStore::new();
        store.fail(StoreCall::ListProducts, FaultMode::Once);

        let err = store.list_products().await.unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(store.list_products().await.is_ok());
        assert_eq!(store.count(StoreCall::ListProducts), 2);
    }

    #[tokio::test]
    async fn test_fault_always_until_healed() {
        let store = InMemoryStore::new();
        store.fail(StoreCall::InsertOrder, FaultMode::Always);
        let user = UserId::random();

        assert!(store.insert_order(&new_order(user)).await.is_err());
        assert!(store.insert_order(&new_order(user)).await.is_err());
        store.heal(StoreCall::InsertOrder);
        assert!(store.insert_order(&new_order(user)).await.is_ok());
    }

    #[tokio::test]
    async fn test_orders_newest_first_with_lines() {
        let store = InMemoryStore::with_products([product(7, 5000)]);
        let user = UserId::random();
        let first = store.insert_order(&new_order(user)).await.unwrap();
        let second = store.insert_order(&new_order(user)).await.unwrap();
        store
            .insert_order_items(&[NewOrderItem {
                order_id: first.id,
                product_id: ProductId::new(7),
                quantity: 2,
                price: Price::from_cents(5000),
            }])
            .await
            .unwrap();

        let orders = store.list_orders(Some(user)).await.unwrap();
        assert_eq!(orders[0].id, second.id);
        assert_eq!(orders[1].order_items.len(), 1);
        assert_eq!(
            orders[1].order_items[0].product.as_ref().map(|p| p.name.as_str()),
            Some("P7")
        );
        assert!(store.list_orders(Some(UserId::random())).await.unwrap().is_empty());
        assert_eq!(store.list_orders(None).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_order_items_require_existing_order() {
        let store = InMemoryStore::new();
        let err = store
            .insert_order_items(&[NewOrderItem {
                order_id: OrderId::random(),
                product_id: ProductId::new(1),
                quantity: 1,
                price: Price::ZERO,
            }])
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("23503"));
    }

    #[tokio::test]
    async fn test_update_missing_row() {
        let store = InMemoryStore::new();
        let err = store
            .update_cart_item(CartItemId::random(), &CartItemPatch { quantity: 3 })
            .await
            .unwrap_err();
        assert_eq!(err, BackendError::MissingRow("cart_items"));
    }
}
