//! Row types for the hosted backend's tables, plus the payloads written to them.
//!
//! # Tables
//!
//! - `products` - Catalog, inventory counters
//! - `cart_items` - One row per (user, product), joined with `products` on read
//! - `orders` / `order_items` - Order headers and their lines (price snapshot)
//! - `profiles` - Customer profile metadata
//! - `user_roles` - At most one role row per user
//! - `analytics` - Append-only event log
//!
//! Every read type is a cache of the remote row; nothing here is authoritative.

pub mod analytics;
pub mod cart;
pub mod order;
pub mod product;
pub mod profile;
pub mod role;

pub use analytics::{AnalyticsEvent, DateRange, MonthlyRevenue, NewAnalyticsEvent, SalesStats, TopProduct};
pub use cart::{CartItem, CartItemPatch, CartLine, NewCartItem};
pub use order::{NewOrder, NewOrderItem, Order, OrderItem, OrderItemProduct, OrderStatusUpdate};
pub use product::{NewProduct, Product, StockUpdate};
pub use profile::{Profile, ProfileUpdate};
pub use role::{NewUserRole, RoleUpdate, UserRole, UserWithRole};

use serde::{Deserialize, Deserializer};

/// Deserialize `null` as the type's default.
///
/// The backend returns `null` for unset array/object columns, which
/// `#[serde(default)]` alone does not cover.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
