//! Catalog products.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voltline_core::{Price, ProductId};

use super::null_as_default;

/// Stock level at or below which a product counts as low on stock, when the
/// row does not set its own threshold.
pub const DEFAULT_LOW_STOCK_THRESHOLD: i32 = 10;

const fn default_low_stock_threshold() -> i32 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

/// A catalog product as stored in `products`.
///
/// `in_stock` and `stock_quantity` are written independently by whoever
/// edits the row. Neither is derived from the other here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: Price,
    #[serde(default)]
    pub original_price: Option<Price>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub badge: Option<String>,
    #[serde(default)]
    pub short_description: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub features: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub technical_specs: BTreeMap<String, serde_json::Value>,
    pub in_stock: bool,
    #[serde(default)]
    pub stock_quantity: i32,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: i32,
    #[serde(default)]
    pub total_sold: i64,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Whether the stock counter is at or below the product's threshold.
    #[must_use]
    pub const fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.low_stock_threshold
    }

    /// Whether the product is shown with a strike-through original price.
    #[must_use]
    pub fn is_discounted(&self) -> bool {
        self.original_price.is_some_and(|original| original > self.price)
    }
}

/// Payload for inserting a product (admin back office).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewProduct {
    pub name: String,
    pub brand: String,
    pub category: String,
    pub price: Price,
    pub original_price: Option<Price>,
    pub image: Option<String>,
    pub badge: Option<String>,
    pub short_description: Option<String>,
    pub features: Vec<String>,
    pub technical_specs: BTreeMap<String, serde_json::Value>,
    pub in_stock: bool,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
}

impl NewProduct {
    /// Start a payload with the required display fields and form defaults.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        brand: impl Into<String>,
        category: impl Into<String>,
        price: Price,
    ) -> Self {
        Self {
            name: name.into(),
            brand: brand.into(),
            category: category.into(),
            price,
            original_price: None,
            image: None,
            badge: None,
            short_description: None,
            features: Vec::new(),
            technical_specs: BTreeMap::new(),
            in_stock: true,
            stock_quantity: 0,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }

    /// Drop blank feature lines and store empty optional text as null.
    #[must_use]
    pub fn normalized(mut self) -> Self {
        self.features.retain(|feature| !feature.trim().is_empty());
        for field in [&mut self.image, &mut self.badge, &mut self.short_description] {
            if field.as_deref().is_some_and(|value| value.trim().is_empty()) {
                *field = None;
            }
        }
        if self.original_price.is_some_and(|price| price == Price::ZERO) {
            self.original_price = None;
        }
        self
    }
}

/// Partial update of a product's inventory fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StockUpdate {
    pub stock_quantity: i32,
    pub in_stock: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub low_stock_threshold: Option<i32>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_row_with_nulls() {
        let json = serde_json::json!({
            "id": 1,
            "name": "Disjoncteur Tripolaire C60N 63A",
            "brand": "Schneider Electric",
            "category": "disjoncteurs",
            "price": 189.9,
            "original_price": null,
            "image": "/placeholder.svg",
            "badge": "Bestseller",
            "short_description": null,
            "features": null,
            "technical_specs": {"voltage": "400V"},
            "in_stock": true,
            "stock_quantity": 4,
            "created_at": "2025-03-01T10:00:00+00:00"
        });

        let product: Product = serde_json::from_value(json).unwrap();
        assert_eq!(product.id, ProductId::new(1));
        assert_eq!(product.price, Price::from_cents(18990));
        assert!(product.features.is_empty());
        assert_eq!(product.low_stock_threshold, DEFAULT_LOW_STOCK_THRESHOLD);
        assert!(product.is_low_stock());
        assert_eq!(product.technical_specs["voltage"], "400V");
    }

    #[test]
    fn test_in_stock_not_derived_from_quantity() {
        let json = serde_json::json!({
            "id": 3, "name": "Armoire IP65", "brand": "Legrand", "category": "armoires",
            "price": "749.90", "in_stock": false, "stock_quantity": 12
        });
        let product: Product = serde_json::from_value(json).unwrap();
        assert!(!product.in_stock);
        assert_eq!(product.stock_quantity, 12);
        assert!(!product.is_low_stock());
    }

    #[test]
    fn test_new_product_normalized() {
        let mut product = NewProduct::new("Câble HTA", "Nexans", "cablage", Price::from_cents(4560));
        product.features = vec!["20kV".into(), "  ".into(), String::new()];
        product.badge = Some(String::new());
        product.original_price = Some(Price::ZERO);

        let product = product.normalized();
        assert_eq!(product.features, vec!["20kV".to_string()]);
        assert_eq!(product.badge, None);
        assert_eq!(product.original_price, None);
        assert_eq!(product.low_stock_threshold, 10);
    }

    #[test]
    fn test_stock_update_skips_threshold() {
        let update = StockUpdate {
            stock_quantity: 0,
            in_stock: false,
            low_stock_threshold: None,
        };
        let json = serde_json::to_value(update).unwrap();
        assert_eq!(json, serde_json::json!({"stock_quantity": 0, "in_stock": false}));
    }
}
