//! Analytics events and the back-office sales summary.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use voltline_core::{AnalyticsEventId, OrderStatus, Price, UserId};

use super::{Order, Product};

/// Number of products listed in [`SalesStats::top_products`].
pub const TOP_PRODUCTS_LIMIT: usize = 5;

/// An `analytics` row. Append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsEvent {
    pub id: AnalyticsEventId,
    pub event_type: String,
    #[serde(default)]
    pub event_data: serde_json::Value,
    #[serde(default)]
    pub user_id: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Payload for appending an event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewAnalyticsEvent {
    pub event_type: String,
    pub event_data: serde_json::Value,
    pub user_id: Option<UserId>,
}

impl NewAnalyticsEvent {
    /// Event with no payload.
    #[must_use]
    pub fn new(event_type: impl Into<String>, user_id: Option<UserId>) -> Self {
        Self {
            event_type: event_type.into(),
            event_data: serde_json::Value::Null,
            user_id,
        }
    }

    /// Attach a structured payload.
    #[must_use]
    pub fn with_data(mut self, event_data: serde_json::Value) -> Self {
        self.event_data = event_data;
        self
    }
}

/// Inclusive time window on `created_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl DateRange {
    /// Whether `at` falls inside the window.
    #[must_use]
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from <= at && at <= self.to
    }
}

/// Revenue for one calendar month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MonthlyRevenue {
    pub month: String,
    pub revenue: Price,
}

/// Best-selling product summary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopProduct {
    pub name: String,
    pub total_sold: i64,
    pub price: Price,
    pub stock_quantity: i32,
    pub low_stock_threshold: i32,
}

/// Back-office dashboard figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesStats {
    /// Sum of `total_amount` over delivered orders.
    pub total_revenue: Price,
    pub total_orders: usize,
    pub pending_orders: usize,
    pub low_stock_products: usize,
    /// One entry per month with at least one order, oldest first. Only
    /// delivered orders contribute revenue.
    pub monthly_revenue: Vec<MonthlyRevenue>,
    pub top_products: Vec<TopProduct>,
}

impl SalesStats {
    /// Summarize orders and products.
    #[must_use]
    pub fn compute(orders: &[Order], products: &[Product]) -> Self {
        let delivered = |order: &&Order| order.status == OrderStatus::Delivered;

        let total_revenue: Price = orders.iter().filter(delivered).map(|o| o.total_amount).sum();
        let pending_orders = orders
            .iter()
            .filter(|o| o.status == OrderStatus::Pending)
            .count();

        let mut months: BTreeMap<String, Price> = BTreeMap::new();
        for order in orders {
            let entry = months
                .entry(order.created_at.format("%Y-%m").to_string())
                .or_insert(Price::ZERO);
            if order.status == OrderStatus::Delivered {
                *entry = *entry + order.total_amount;
            }
        }

        let mut ranked: Vec<&Product> = products.iter().collect();
        ranked.sort_by(|a, b| b.total_sold.cmp(&a.total_sold));

        Self {
            total_revenue,
            total_orders: orders.len(),
            pending_orders,
            low_stock_products: products.iter().filter(|p| p.is_low_stock()).count(),
            monthly_revenue: months
                .into_iter()
                .map(|(month, revenue)| MonthlyRevenue { month, revenue })
                .collect(),
            top_products: ranked
                .into_iter()
                .take(TOP_PRODUCTS_LIMIT)
                .map(|p| TopProduct {
                    name: p.name.clone(),
                    total_sold: p.total_sold,
                    price: p.price,
                    stock_quantity: p.stock_quantity,
                    low_stock_threshold: p.low_stock_threshold,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;
    use voltline_core::{Address, OrderId, PaymentStatus};

    use super::*;

    fn order(status: OrderStatus, cents: i64, year: i32, month: u32) -> Order {
        let at = Utc.with_ymd_and_hms(year, month, 15, 12, 0, 0).unwrap();
        Order {
            id: OrderId::random(),
            user_id: UserId::random(),
            status,
            payment_status: PaymentStatus::Pending,
            total_amount: Price::from_cents(cents),
            shipping_address: Address::new("n", "s", "c", "p", "France"),
            billing_address: None,
            payment_method: None,
            notes: None,
            created_at: at,
            updated_at: at,
            order_items: Vec::new(),
        }
    }

    fn product(id: i64, total_sold: i64, stock: i32) -> Product {
        serde_json::from_value(serde_json::json!({
            "id": id, "name": format!("P{id}"), "brand": "ABB", "category": "bt",
            "price": "10.00", "in_stock": true, "stock_quantity": stock,
            "low_stock_threshold": 5, "total_sold": total_sold
        }))
        .unwrap()
    }

    #[test]
    fn test_compute_revenue_and_counts() {
        let orders = [
            order(OrderStatus::Delivered, 10000, 2025, 1),
            order(OrderStatus::Delivered, 2550, 2025, 1),
            order(OrderStatus::Pending, 99999, 2025, 2),
            order(OrderStatus::Cancelled, 500, 2024, 12),
        ];
        let products = [product(1, 3, 2), product(2, 10, 50)];

        let stats = SalesStats::compute(&orders, &products);
        assert_eq!(stats.total_revenue, Price::from_cents(12550));
        assert_eq!(stats.total_orders, 4);
        assert_eq!(stats.pending_orders, 1);
        assert_eq!(stats.low_stock_products, 1);

        let months: Vec<_> = stats.monthly_revenue.iter().map(|m| m.month.as_str()).collect();
        assert_eq!(months, ["2024-12", "2025-01", "2025-02"]);
        assert_eq!(stats.monthly_revenue[0].revenue, Price::ZERO);
        assert_eq!(stats.monthly_revenue[1].revenue, Price::from_cents(12550));
        assert_eq!(stats.monthly_revenue[2].revenue, Price::ZERO);
    }

    #[test]
    fn test_top_products_sorted_and_capped() {
        let products: Vec<_> = (1..=7).map(|id| product(id, id * 2, 100)).collect();
        let stats = SalesStats::compute(&[], &products);

        assert_eq!(stats.top_products.len(), TOP_PRODUCTS_LIMIT);
        assert_eq!(stats.top_products[0].name, "P7");
        assert_eq!(stats.top_products[4].name, "P3");
    }

    #[test]
    fn test_date_range_inclusive() {
        let from = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let to = Utc.with_ymd_and_hms(2025, 1, 31, 23, 59, 59).unwrap();
        let range = DateRange { from, to };
        assert!(range.contains(from));
        assert!(range.contains(to));
        assert!(!range.contains(to + chrono::Duration::seconds(1)));
    }
}
