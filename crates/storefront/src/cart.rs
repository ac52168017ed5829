//! Shopper-facing cart: line items, totals, and mutations with the guest
//! policy applied.
//!
//! Guests cannot persist a cart. Every mutation is a logged no-op for them.
//! Mutations addressed by product id resolve the cart row from the current
//! cached rows; a product that is no longer in the cart is a silent no-op.

use serde::Serialize;
use tracing::{debug, info, instrument};

use voltline_core::{Price, ProductId};

use crate::backend::BackendError;
use crate::error::{StorefrontError, ValidationError, add_breadcrumb};
use crate::models::{CartItem, CartLine};
use crate::resources::CartItemsResource;

/// The cart as shown to the shopper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CartView {
    /// Lines in the order the rows were returned.
    pub items: Vec<CartLine>,
    /// Sum of quantities, saturating at `u32::MAX`.
    pub total_items: u32,
    /// Sum of read-time unit price times quantity.
    pub total_price: Price,
    pub is_loading: bool,
}

impl CartView {
    /// Project joined rows into lines and totals.
    #[must_use]
    pub fn from_items(rows: &[CartItem]) -> Self {
        let items: Vec<CartLine> = rows.iter().map(CartLine::from).collect();
        Self {
            total_items: items
                .iter()
                .fold(0, |total, line| total.saturating_add(line.quantity)),
            total_price: items.iter().map(CartLine::line_total).sum(),
            items,
            is_loading: false,
        }
    }
}

/// Cart aggregation over the cart rows accessor.
#[derive(Clone)]
pub struct CartService {
    items: CartItemsResource,
}

impl CartService {
    #[must_use]
    pub const fn new(items: CartItemsResource) -> Self {
        Self { items }
    }

    /// Raw rows, for checkout.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    pub async fn rows(&self) -> Result<Vec<CartItem>, StorefrontError> {
        self.items.list().await
    }

    /// Current lines and totals, fetching when nothing is cached.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    pub async fn view(&self) -> Result<CartView, StorefrontError> {
        Ok(CartView::from_items(&self.items.list().await?))
    }

    /// What is known right now, without fetching.
    pub async fn snapshot(&self) -> CartView {
        let state = self.items.state().await;
        CartView {
            is_loading: state.is_loading,
            ..CartView::from_items(state.data.as_deref().unwrap_or_default())
        }
    }

    /// Add `quantity` units of a product.
    ///
    /// # Errors
    ///
    /// Returns error if the remote write fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
    ) -> Result<(), StorefrontError> {
        if !self.is_signed_in() {
            info!("Guest cart: add ignored, sign in to keep a cart");
            return Ok(());
        }
        self.items.add(product_id, quantity).await?;
        let id = product_id.to_string();
        add_breadcrumb("cart", "Added product", Some(&[("product_id", id.as_str())]));
        Ok(())
    }

    /// Remove a product's line.
    ///
    /// # Errors
    ///
    /// Returns error if the remote delete fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: ProductId) -> Result<(), StorefrontError> {
        if !self.is_signed_in() {
            info!("Guest cart: remove ignored");
            return Ok(());
        }
        let Some(row) = self.find_row(product_id).await? else {
            return Ok(());
        };
        self.items.remove(&[row.id]).await
    }

    /// Set a product's quantity. Zero or below deletes the line. A row that
    /// was already deleted remotely is a no-op and the cached rows are
    /// re-fetched on the next read.
    ///
    /// # Errors
    ///
    /// Returns [`ValidationError::InvalidQuantity`] above `u32::MAX`, or the
    /// remote error if the write fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn update_quantity(
        &self,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<(), StorefrontError> {
        if !self.is_signed_in() {
            info!("Guest cart: quantity change ignored");
            return Ok(());
        }
        let quantity = u32::try_from(quantity.max(0))
            .map_err(|_| ValidationError::InvalidQuantity {
                product_id,
                quantity,
            })?;
        let Some(row) = self.find_row(product_id).await? else {
            return Ok(());
        };
        if quantity == 0 {
            return self.items.remove(&[row.id]).await;
        }
        match self.items.set_quantity(row.id, quantity).await {
            Ok(_) => Ok(()),
            Err(StorefrontError::Backend(BackendError::MissingRow(_))) => {
                debug!(cart_item_id = %row.id, "Cart row already gone, refreshing");
                self.items.refresh().await;
                Ok(())
            }
            Err(err) => Err(err),
        }
    }

    /// Delete every line.
    ///
    /// # Errors
    ///
    /// Returns error if the remote delete fails.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<(), StorefrontError> {
        if !self.is_signed_in() {
            info!("Guest cart: clear ignored");
            return Ok(());
        }
        self.items.clear().await
    }

    fn is_signed_in(&self) -> bool {
        self.items.is_signed_in()
    }

    async fn find_row(&self, product_id: ProductId) -> Result<Option<CartItem>, StorefrontError> {
        let row = self
            .items
            .list()
            .await?
            .into_iter()
            .find(|item| item.product_id == product_id);
        if row.is_none() {
            debug!("No cart row for product, nothing to do");
        }
        Ok(row)
    }
}
