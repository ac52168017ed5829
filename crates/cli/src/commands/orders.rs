//! Order history for the signed-in user.

use clap::Subcommand;

use voltline_core::OrderId;
use voltline_storefront::Storefront;
use voltline_storefront::models::Order;

use super::{CliError, emit, emit_json, require_sign_in};

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List orders, newest first
    List {
        #[arg(long)]
        json: bool,
    },
    /// Show one order with its lines
    Show { order_id: OrderId },
}

/// Run an orders subcommand.
///
/// # Errors
///
/// Returns an error if no user is signed in or the remote read fails.
pub async fn run(storefront: &Storefront, action: OrdersAction) -> Result<(), CliError> {
    require_sign_in(storefront)?;
    match action {
        OrdersAction::List { json } => {
            let orders = storefront.orders().list_for_current_user().await?;
            if json {
                return emit_json(&orders);
            }
            if orders.is_empty() {
                emit("Aucune commande.");
            }
            for order in &orders {
                print_summary(order);
            }
        }
        OrdersAction::Show { order_id } => {
            let order = storefront.orders().get(order_id).await?;
            print_detail(&order);
        }
    }
    Ok(())
}

/// One-line order summary.
pub fn print_summary(order: &Order) {
    emit(format_args!(
        "{}  {}  {:<12} {:<12} {:>12}  {} article(s)",
        order.id,
        order.created_at.format("%d/%m/%Y"),
        order.status.label(),
        order.payment_status.label(),
        order.total_amount.to_string(),
        order.item_count()
    ));
}

/// Order header, address and lines.
pub fn print_detail(order: &Order) {
    print_summary(order);
    let address = &order.shipping_address;
    emit(format_args!(
        "  Livraison : {}, {}, {} {}, {}",
        address.name, address.street, address.postal_code, address.city, address.country
    ));
    for item in &order.order_items {
        let name = item.product.as_ref().map_or("?", |p| p.name.as_str());
        emit(format_args!(
            "  {:>5}  {:<40} {:>3} x {:>12} = {}",
            item.product_id,
            name,
            item.quantity,
            item.price.to_string(),
            item.line_total()
        ));
    }
}
