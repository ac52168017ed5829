//! Order creation.
//!
//! A single sequential pass, never retried:
//!
//! ```text
//! idle -> computing-total -> creating-order-header -> creating-order-items
//!      -> clearing-cart -> done
//! ```
//!
//! Validation happens before any remote call. A failed header insert is
//! terminal with nothing written. A failed item insert is terminal and
//! leaves the header behind without lines; there is no rollback, and the
//! error carries the orphaned order id for reconciliation. A failed cart
//! delete is logged and ignored because the order already exists.
//!
//! Each line's unit price is read once from the cart row's product snapshot
//! and used for both the total and the persisted line.

use core::fmt;

use serde_json::json;
use thiserror::Error;
use tracing::{debug, error, info, instrument, warn};

use voltline_core::{
    Address, CartItemId, OrderId, OrderStatus, PaymentStatus, Price, ProductId, UserId,
};

use crate::backend::BackendError;
use crate::cache::{CacheKey, Invalidation};
use crate::error::{ValidationError, add_breadcrumb};
use crate::models::{CartItem, NewAnalyticsEvent, NewOrder, NewOrderItem, Order};
use crate::resources::{AnalyticsResource, DataContext};

/// Analytics event emitted for every created order.
pub const ORDER_CREATED_EVENT: &str = "order_created";

/// Steps of order creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckoutStage {
    Idle,
    ComputingTotal,
    CreatingOrderHeader,
    CreatingOrderItems,
    ClearingCart,
    Done,
    Failed,
}

impl fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Idle => "idle",
            Self::ComputingTotal => "computing-total",
            Self::CreatingOrderHeader => "creating-order-header",
            Self::CreatingOrderItems => "creating-order-items",
            Self::ClearingCart => "clearing-cart",
            Self::Done => "done",
            Self::Failed => "failed",
        })
    }
}

/// Order creation failure.
#[derive(Debug, Error)]
pub enum CheckoutError {
    /// Rejected before any remote call.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The order header could not be inserted. Nothing was written.
    #[error("failed to create order: {0}")]
    HeaderFailed(#[source] BackendError),

    /// The header exists but its lines could not be inserted.
    #[error("order {order_id} created without items: {source}")]
    ItemsFailed {
        order_id: OrderId,
        #[source]
        source: BackendError,
    },
}

impl CheckoutError {
    /// Last stage entered before the failure.
    #[must_use]
    pub const fn stage(&self) -> CheckoutStage {
        match self {
            Self::Validation(_) => CheckoutStage::Idle,
            Self::HeaderFailed(_) => CheckoutStage::CreatingOrderHeader,
            Self::ItemsFailed { .. } => CheckoutStage::CreatingOrderItems,
        }
    }

    /// The header left without lines, if any.
    #[must_use]
    pub const fn orphaned_order(&self) -> Option<OrderId> {
        match self {
            Self::ItemsFailed { order_id, .. } => Some(*order_id),
            _ => None,
        }
    }
}

/// Checkout form plus the cart rows being bought.
#[derive(Debug, Clone, PartialEq)]
pub struct CheckoutRequest {
    /// Cart rows as read by the caller, with their product snapshot.
    pub cart_items: Vec<CartItem>,
    pub shipping_address: Address,
    pub billing_address: Option<Address>,
    pub payment_method: Option<String>,
    pub notes: Option<String>,
}

impl CheckoutRequest {
    #[must_use]
    pub const fn new(cart_items: Vec<CartItem>, shipping_address: Address) -> Self {
        Self {
            cart_items,
            shipping_address,
            billing_address: None,
            payment_method: None,
            notes: None,
        }
    }

    #[must_use]
    pub fn with_billing_address(mut self, address: Address) -> Self {
        self.billing_address = Some(address);
        self
    }

    #[must_use]
    pub fn with_payment_method(mut self, method: impl Into<String>) -> Self {
        self.payment_method = Some(method.into());
        self
    }

    #[must_use]
    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

/// A cart line with its unit price captured once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PricedLine {
    cart_item_id: CartItemId,
    product_id: ProductId,
    quantity: u32,
    unit_price: Price,
}

/// Capture each line's price from its snapshot and sum the total.
fn price_lines(items: &[CartItem]) -> Result<(Vec<PricedLine>, Price), ValidationError> {
    let lines = items
        .iter()
        .map(|item| {
            if item.quantity == 0 {
                return Err(ValidationError::InvalidQuantity {
                    product_id: item.product_id,
                    quantity: i64::from(item.quantity),
                });
            }
            let unit_price = item
                .snapshot_price()
                .ok_or(ValidationError::MissingPriceSnapshot(item.product_id))?;
            Ok(PricedLine {
                cart_item_id: item.id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let total = lines
        .iter()
        .map(|line| line.unit_price.line_total(line.quantity))
        .sum();
    Ok((lines, total))
}

fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Creates orders from cart contents.
#[derive(Clone)]
pub struct CheckoutService {
    ctx: DataContext,
    analytics: AnalyticsResource,
}

impl CheckoutService {
    #[must_use]
    pub const fn new(ctx: DataContext, analytics: AnalyticsResource) -> Self {
        Self { ctx, analytics }
    }

    /// Create an order from `request` and return its header.
    ///
    /// # Errors
    ///
    /// - [`CheckoutError::Validation`] if no user is signed in, the cart is
    ///   empty, an address field is blank, or a line has no price snapshot
    /// - [`CheckoutError::HeaderFailed`] if the order insert fails
    /// - [`CheckoutError::ItemsFailed`] if the line insert fails after the
    ///   header was created
    #[instrument(skip(self, request), fields(lines = request.cart_items.len()))]
    pub async fn create_order(&self, request: CheckoutRequest) -> Result<Order, CheckoutError> {
        let user = self
            .ctx
            .current_user()
            .ok_or(ValidationError::SignInRequired)?;
        if request.cart_items.is_empty() {
            return Err(ValidationError::EmptyCart.into());
        }
        request
            .shipping_address
            .validate()
            .map_err(ValidationError::from)?;
        if let Some(billing) = &request.billing_address {
            billing.validate().map_err(ValidationError::from)?;
        }

        stage(CheckoutStage::ComputingTotal);
        let (lines, total_amount) = price_lines(&request.cart_items)?;

        stage(CheckoutStage::CreatingOrderHeader);
        let header = NewOrder {
            user_id: user,
            status: OrderStatus::Pending,
            payment_status: PaymentStatus::Pending,
            total_amount,
            shipping_address: request.shipping_address,
            billing_address: request.billing_address,
            payment_method: blank_to_none(request.payment_method),
            notes: blank_to_none(request.notes),
        };
        let order = self
            .ctx
            .store()
            .insert_order(&header)
            .await
            .map_err(|err| {
                error!(error = %err, stage = %CheckoutStage::Failed, "Order header insert failed");
                CheckoutError::HeaderFailed(err)
            })?;

        stage(CheckoutStage::CreatingOrderItems);
        let items: Vec<NewOrderItem> = lines
            .iter()
            .map(|line| NewOrderItem {
                order_id: order.id,
                product_id: line.product_id,
                quantity: line.quantity,
                price: line.unit_price,
            })
            .collect();
        if let Err(err) = self.ctx.store().insert_order_items(&items).await {
            error!(
                order_id = %order.id,
                error = %err,
                stage = %CheckoutStage::Failed,
                "Order items insert failed, order header left without items"
            );
            // The header is visible in the order lists even without lines.
            self.invalidate(user).await;
            return Err(CheckoutError::ItemsFailed {
                order_id: order.id,
                source: err,
            });
        }

        let item_count = lines
            .iter()
            .fold(0_u32, |total, line| total.saturating_add(line.quantity));
        drop(
            self.analytics.emit(
                NewAnalyticsEvent::new(ORDER_CREATED_EVENT, Some(user)).with_data(json!({
                    "order_id": order.id,
                    "total_amount": order.total_amount,
                    "item_count": item_count,
                })),
            ),
        );

        stage(CheckoutStage::ClearingCart);
        let purchased: Vec<CartItemId> = lines.iter().map(|line| line.cart_item_id).collect();
        if let Err(err) = self.ctx.store().delete_cart_items(&purchased).await {
            warn!(
                order_id = %order.id,
                error = %err,
                "Failed to clear cart after order, continuing"
            );
        }

        self.invalidate(user).await;
        stage(CheckoutStage::Done);
        info!(order_id = %order.id, total = %order.total_amount, "Order created");
        let id = order.id.to_string();
        add_breadcrumb("checkout", "Order created", Some(&[("order_id", id.as_str())]));
        Ok(order)
    }

    async fn invalidate(&self, user: UserId) {
        self.ctx
            .cache()
            .invalidate(&[
                Invalidation::Key(CacheKey::Orders(Some(user))),
                Invalidation::Key(CacheKey::Orders(None)),
                Invalidation::Key(CacheKey::CartItems(user)),
                Invalidation::Key(CacheKey::SalesStats),
            ])
            .await;
    }
}

fn stage(stage: CheckoutStage) {
    debug!(%stage, "Checkout stage");
}
