//! Cart rows and the consumer-facing cart line.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voltline_core::{CartItemId, Price, ProductId, UserId};

use super::Product;

/// A persisted `cart_items` row, joined with its product on read.
///
/// At most one row exists per (user, product); repeat adds bump `quantity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
    /// Product snapshot at read time (joined, not stored).
    #[serde(default)]
    pub product: Option<Product>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl CartItem {
    /// Unit price from the joined product snapshot, if it was joined.
    #[must_use]
    pub fn snapshot_price(&self) -> Option<Price> {
        self.product.as_ref().map(|product| product.price)
    }
}

/// Payload for inserting a cart row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewCartItem {
    pub user_id: UserId,
    pub product_id: ProductId,
    pub quantity: u32,
}

/// Partial update of a cart row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CartItemPatch {
    pub quantity: u32,
}

/// A cart line as shown to the shopper.
///
/// Prices are read-time prices (there is no order snapshot yet). A row whose
/// product could not be joined shows empty text and a zero price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLine {
    pub product_id: ProductId,
    pub name: String,
    pub price: Price,
    pub quantity: u32,
    pub image: String,
    pub brand: String,
}

impl From<&CartItem> for CartLine {
    fn from(item: &CartItem) -> Self {
        let product = item.product.as_ref();
        Self {
            product_id: item.product_id,
            name: product.map(|p| p.name.clone()).unwrap_or_default(),
            price: product.map_or(Price::ZERO, |p| p.price),
            quantity: item.quantity,
            image: product.and_then(|p| p.image.clone()).unwrap_or_default(),
            brand: product.map(|p| p.brand.clone()).unwrap_or_default(),
        }
    }
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.line_total(self.quantity)
    }
}
