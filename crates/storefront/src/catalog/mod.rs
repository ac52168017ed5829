//! Client-side catalog browsing: filtering, sorting, stock alerts, related
//! products and the category tree.
//!
//! The product list is read once through
//! [`ProductsResource`](crate::resources::ProductsResource); everything here
//! works on that in-memory list.

pub mod categories;

pub use categories::{Category, CategoryError, CategoryService, CategoryUpdate, NewCategory};

use std::collections::BTreeSet;

use voltline_core::Price;

use crate::models::Product;

/// Price bucket offered by the catalog sidebar.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum PriceRange {
    #[default]
    All,
    /// `min` inclusive, `max` exclusive. `None` is unbounded.
    Between { min: Price, max: Option<Price> },
}

impl PriceRange {
    /// Parse a sidebar value such as `0-100`, `1000+` or `all`.
    ///
    /// Unknown values mean no price filter.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        let euros = |v: &str| v.trim().parse::<i64>().ok().map(|e| Price::from_cents(e * 100));
        if let Some(min) = s.strip_suffix('+') {
            return euros(min).map_or(Self::All, |min| Self::Between { min, max: None });
        }
        match s.split_once('-').map(|(lo, hi)| (euros(lo), euros(hi))) {
            Some((Some(min), Some(max))) if min < max => Self::Between {
                min,
                max: Some(max),
            },
            _ => Self::All,
        }
    }

    /// Whether `price` falls in the bucket.
    #[must_use]
    pub fn contains(&self, price: Price) -> bool {
        match self {
            Self::All => true,
            Self::Between { min, max } => price >= *min && max.is_none_or(|max| price < max),
        }
    }
}

/// Catalog sort order.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum ProductSort {
    /// Backend order (newest first).
    #[default]
    Featured,
    PriceAsc,
    PriceDesc,
    Name,
}

impl ProductSort {
    /// Parse from the sort selector value.
    #[must_use]
    pub fn parse(s: &str) -> Self {
        match s {
            "price-asc" | "price_asc" => Self::PriceAsc,
            "price-desc" | "price_desc" => Self::PriceDesc,
            "name" => Self::Name,
            _ => Self::Featured,
        }
    }

    /// Convert to the sort selector value.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Featured => "featured",
            Self::PriceAsc => "price-asc",
            Self::PriceDesc => "price-desc",
            Self::Name => "name",
        }
    }
}

/// Catalog sidebar filters.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive substring of name, brand or short description
    pub search: Option<String>,
    /// Category id; matches the product's category exactly
    pub category: Option<String>,
    /// Accepted brands; empty accepts every brand
    pub brands: BTreeSet<String>,
    pub price: PriceRange,
    pub in_stock_only: bool,
    pub sort: ProductSort,
}

impl ProductFilter {
    /// Whether `product` passes every active filter.
    #[must_use]
    pub fn matches(&self, product: &Product) -> bool {
        if self.in_stock_only && !product.in_stock {
            return false;
        }
        if !self.price.contains(product.price) {
            return false;
        }
        if !self.brands.is_empty() && !self.brands.contains(&product.brand) {
            return false;
        }
        if let Some(category) = &self.category
            && &product.category != category
        {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            None | Some("") => true,
            Some(term) => {
                let term = term.to_lowercase();
                [
                    Some(product.name.as_str()),
                    Some(product.brand.as_str()),
                    product.short_description.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|text| text.to_lowercase().contains(&term))
            }
        }
    }

    /// Matching products in the requested order.
    ///
    /// Sorting is stable, so ties keep the input order.
    #[must_use]
    pub fn apply<'a>(&self, products: &'a [Product]) -> Vec<&'a Product> {
        let mut matched: Vec<&Product> = products.iter().filter(|p| self.matches(p)).collect();
        match self.sort {
            ProductSort::Featured => {}
            ProductSort::PriceAsc => matched.sort_by_key(|p| p.price),
            ProductSort::PriceDesc => matched.sort_by(|a, b| b.price.cmp(&a.price)),
            ProductSort::Name => matched.sort_by_cached_key(|p| p.name.to_lowercase()),
        }
        matched
    }
}

/// Distinct brands in `products`, sorted.
#[must_use]
pub fn brands(products: &[Product]) -> Vec<&str> {
    products
        .iter()
        .map(|p| p.brand.as_str())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Products at or below their low-stock threshold.
#[must_use]
pub fn low_stock(products: &[Product]) -> Vec<&Product> {
    products.iter().filter(|p| p.is_low_stock()).collect()
}

/// Up to `limit` products from the same category as `product`, excluding it.
#[must_use]
pub fn related<'a>(product: &Product, products: &'a [Product], limit: usize) -> Vec<&'a Product> {
    products
        .iter()
        .filter(|p| p.category == product.category && p.id != product.id)
        .take(limit)
        .collect()
}
