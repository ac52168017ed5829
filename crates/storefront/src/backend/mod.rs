//! Remote data access for the hosted backend.
//!
//! # Architecture
//!
//! - [`RemoteStore`] is the only way the rest of the crate touches remote
//!   tables. It has one typed method per table operation, so there is no
//!   untyped escape hatch around the schema.
//! - [`RestStore`] talks to the backend's REST surface over HTTP.
//! - [`InMemoryStore`] keeps the same semantics in process, with fault
//!   injection and a call log, for tests and offline demos.
//!
//! Every read is a possibly stale copy of the remote row; callers cache it
//! through [`crate::cache::QueryCache`] and never treat it as authoritative.

pub mod memory;
pub mod query;
pub mod rest;

pub use memory::{FaultMode, InMemoryStore, StoreCall};
pub use query::{Direction, TableQuery};
pub use rest::RestStore;

use core::fmt;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

use voltline_core::{CartItemId, OrderId, ProductId, UserId};

use crate::models::{
    AnalyticsEvent, CartItem, CartItemPatch, DateRange, NewAnalyticsEvent, NewCartItem, NewOrder,
    NewOrderItem, NewProduct, NewUserRole, Order, OrderItem, OrderStatusUpdate, Product, Profile,
    RoleUpdate, StockUpdate, UserRole,
};

/// Remote tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Products,
    CartItems,
    Orders,
    OrderItems,
    Profiles,
    UserRoles,
    Analytics,
}

impl Table {
    /// Table name on the backend.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::CartItems => "cart_items",
            Self::Orders => "orders",
            Self::OrderItems => "order_items",
            Self::Profiles => "profiles",
            Self::UserRoles => "user_roles",
            Self::Analytics => "analytics",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Structured error body returned by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ApiError {
    /// HTTP status of the response.
    #[serde(skip)]
    pub status: u16,
    /// Backend error code (e.g. a SQLSTATE such as `23505`, or `PGRST116`).
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl ApiError {
    /// Error with a status and message only.
    #[must_use]
    pub fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            code: None,
            message: message.into(),
            details: None,
            hint: None,
        }
    }

    /// Attach a backend error code.
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {}", self.status)?;
        if let Some(code) = &self.code {
            write!(f, " [{code}]")?;
        }
        if self.message.is_empty() {
            f.write_str(": (no message)")?;
        } else {
            write!(f, ": {}", self.message)?;
        }
        if let Some(details) = &self.details {
            write!(f, " ({details})")?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " hint: {hint}")?;
        }
        Ok(())
    }
}

/// Errors returned by a [`RemoteStore`].
///
/// `Clone` so that the cache can keep the last failure of a read and hand it
/// to every caller waiting on the same key.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The request never produced a response (DNS, TLS, timeout, ...).
    #[error("HTTP error: {0}")]
    Transport(String),

    /// The backend answered with an error status.
    #[error("{table}: {error}")]
    Api { table: &'static str, error: ApiError },

    /// The response body did not match the expected row type.
    #[error("failed to decode {table} response: {message}")]
    Decode { table: &'static str, message: String },

    /// A write that must return a row returned none.
    #[error("{0}: write returned no row")]
    MissingRow(&'static str),
}

impl BackendError {
    /// Wrap an API error for `table`.
    #[must_use]
    pub const fn api(table: Table, error: ApiError) -> Self {
        Self::Api {
            table: table.as_str(),
            error,
        }
    }

    /// HTTP status, when the backend answered.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Api { error, .. } => Some(error.status),
            _ => None,
        }
    }

    /// Backend error code, when present.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { error, .. } => error.code.as_deref(),
            _ => None,
        }
    }

    /// Unique constraint violation (SQLSTATE 23505).
    #[must_use]
    pub fn is_conflict(&self) -> bool {
        self.code() == Some("23505") || self.status() == Some(409)
    }

    /// Row-level security or missing credentials.
    #[must_use]
    pub fn is_permission_denied(&self) -> bool {
        self.code() == Some("42501") || matches!(self.status(), Some(401 | 403))
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Typed operations against the backend's tables.
///
/// Implementations must preserve read ordering: products and orders newest
/// first, cart rows in insertion order.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    // products
    async fn list_products(&self) -> Result<Vec<Product>, BackendError>;
    async fn get_product(&self, id: ProductId) -> Result<Option<Product>, BackendError>;
    async fn insert_product(&self, product: &NewProduct) -> Result<Product, BackendError>;
    async fn update_product_stock(
        &self,
        id: ProductId,
        update: &StockUpdate,
    ) -> Result<Product, BackendError>;

    // cart_items (reads join the product row)
    async fn list_cart_items(&self, user: UserId) -> Result<Vec<CartItem>, BackendError>;
    async fn find_cart_item(
        &self,
        user: UserId,
        product: ProductId,
    ) -> Result<Option<CartItem>, BackendError>;
    async fn insert_cart_item(&self, item: &NewCartItem) -> Result<CartItem, BackendError>;
    async fn update_cart_item(
        &self,
        id: CartItemId,
        patch: &CartItemPatch,
    ) -> Result<CartItem, BackendError>;
    async fn delete_cart_items(&self, ids: &[CartItemId]) -> Result<(), BackendError>;
    async fn delete_cart_items_for_user(&self, user: UserId) -> Result<(), BackendError>;

    // orders / order_items (reads embed lines and a product summary)
    async fn list_orders(&self, user: Option<UserId>) -> Result<Vec<Order>, BackendError>;
    async fn get_order(&self, id: OrderId) -> Result<Option<Order>, BackendError>;
    async fn insert_order(&self, order: &NewOrder) -> Result<Order, BackendError>;
    async fn insert_order_items(
        &self,
        items: &[NewOrderItem],
    ) -> Result<Vec<OrderItem>, BackendError>;
    async fn update_order_status(
        &self,
        id: OrderId,
        update: &OrderStatusUpdate,
    ) -> Result<Order, BackendError>;

    // profiles
    async fn list_profiles(&self) -> Result<Vec<Profile>, BackendError>;
    async fn get_profile(&self, user: UserId) -> Result<Option<Profile>, BackendError>;
    async fn upsert_profile(&self, profile: &Profile) -> Result<Profile, BackendError>;

    // user_roles
    async fn get_user_role(&self, user: UserId) -> Result<Option<UserRole>, BackendError>;
    async fn list_user_roles(&self) -> Result<Vec<UserRole>, BackendError>;
    async fn insert_user_role(&self, role: &NewUserRole) -> Result<UserRole, BackendError>;
    async fn update_user_role(
        &self,
        user: UserId,
        update: &RoleUpdate,
    ) -> Result<UserRole, BackendError>;

    // analytics
    async fn insert_analytics_event(
        &self,
        event: &NewAnalyticsEvent,
    ) -> Result<AnalyticsEvent, BackendError>;
    async fn list_analytics_events(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<AnalyticsEvent>, BackendError>;
}
