//! Orders and order lines.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voltline_core::{Address, OrderId, OrderItemId, OrderStatus, PaymentStatus, Price, ProductId, UserId};

use super::null_as_default;

/// An order header, with its lines when they were embedded in the read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Price,
    pub shipping_address: Address,
    #[serde(default)]
    pub billing_address: Option<Address>,
    #[serde(default)]
    pub payment_method: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub order_items: Vec<OrderItem>,
}

impl Order {
    /// Total number of units across the embedded lines, saturating.
    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.order_items
            .iter()
            .fold(0, |total, item| total.saturating_add(item.quantity))
    }

    /// The address to bill, falling back to the shipping address.
    #[must_use]
    pub fn billing_or_shipping(&self) -> &Address {
        self.billing_address.as_ref().unwrap_or(&self.shipping_address)
    }
}

/// An order line. `price` is the unit price captured when the order was
/// placed and is never re-read from the live product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Price,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub product: Option<OrderItemProduct>,
}

impl OrderItem {
    /// Snapshot price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.price.line_total(self.quantity)
    }
}

/// Product summary embedded in order lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderItemProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub image: Option<String>,
    pub brand: String,
}

/// Payload for inserting an order header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewOrder {
    pub user_id: UserId,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub total_amount: Price,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

/// Payload for inserting an order line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NewOrderItem {
    pub order_id: OrderId,
    pub product_id: ProductId,
    pub quantity: u32,
    pub price: Price,
}

/// Administrative status change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OrderStatusUpdate {
    pub status: OrderStatus,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_order_with_embedded_items() {
        let json = serde_json::json!({
            "id": "a3d1b7f0-2c3e-4f8a-9b6d-1e2f3a4b5c6d",
            "user_id": "0b6a3c52-8a8e-4f5e-9a43-5a4c1e2f9d10",
            "status": "pending",
            "payment_status": "pending",
            "total_amount": 110,
            "shipping_address": {
                "name": "SARL Dupont", "street": "12 rue Volta", "city": "Lyon",
                "postal_code": "69003", "country": "France"
            },
            "billing_address": null,
            "payment_method": "card",
            "notes": null,
            "created_at": "2025-05-02T08:30:00.123456+00:00",
            "updated_at": "2025-05-02T08:30:00.123456+00:00",
            "order_items": [{
                "id": "c0ffee00-0000-4000-8000-000000000001",
                "order_id": "a3d1b7f0-2c3e-4f8a-9b6d-1e2f3a4b5c6d",
                "product_id": 7,
                "quantity": 2,
                "price": "50.00",
                "product": {"id": 7, "name": "Contacteur", "image": null, "brand": "ABB"}
            }]
        });

        let order: Order = serde_json::from_value(json).unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.total_amount, Price::from_cents(11000));
        assert_eq!(order.item_count(), 2);
        assert_eq!(order.billing_or_shipping().city, "Lyon");
        assert_eq!(order.order_items[0].line_total(), Price::from_cents(10000));
    }

    #[test]
    fn test_order_items_null_is_empty() {
        let json = serde_json::json!({
            "id": "a3d1b7f0-2c3e-4f8a-9b6d-1e2f3a4b5c6d",
            "user_id": "0b6a3c52-8a8e-4f5e-9a43-5a4c1e2f9d10",
            "status": "shipped",
            "payment_status": "paid",
            "total_amount": "12890.00",
            "shipping_address": {
                "name": "n", "street": "s", "city": "c", "postal_code": "p", "country": "France"
            },
            "created_at": "2025-05-02T08:30:00Z",
            "updated_at": "2025-05-03T08:30:00Z",
            "order_items": null
        });

        let order: Order = serde_json::from_value(json).unwrap();
        assert!(order.order_items.is_empty());
        assert_eq!(order.payment_status, PaymentStatus::Paid);
    }
}
