//! Back-office commands.
//!
//! Every subcommand checks the admin role first. The check only mirrors the
//! UI gate; the backend's row policies still apply to each request.

use clap::Subcommand;

use voltline_core::{AppRole, OrderId, OrderStatus, ProductId, UserId};
use voltline_storefront::Storefront;
use voltline_storefront::models::StockUpdate;

use super::orders::{print_detail, print_summary};
use super::{CliError, emit, emit_json};

#[derive(Subcommand)]
pub enum AdminAction {
    /// Sales dashboard figures
    Stats {
        #[arg(long)]
        json: bool,
    },
    /// Every user with their role
    Users,
    /// Grant or revoke the admin role
    SetRole {
        user_id: UserId,
        /// `admin` or `user`
        role: AppRole,
    },
    /// Every order, newest first
    Orders,
    /// Change an order's status
    OrderStatus {
        order_id: OrderId,
        /// `pending`, `confirmed`, `processing`, `shipped`, `delivered` or `cancelled`
        status: OrderStatus,
    },
    /// Set a product's stock counter and availability flag
    Stock {
        product_id: i64,
        quantity: i32,
        /// Flag the product as unavailable; the counter is kept as given
        #[arg(long)]
        out_of_stock: bool,
        #[arg(long)]
        threshold: Option<i32>,
    },
}

/// Run an admin subcommand.
///
/// # Errors
///
/// Returns an error if the user is not an admin or a remote call fails.
pub async fn run(storefront: &Storefront, action: AdminAction) -> Result<(), CliError> {
    storefront.roles().require_admin().await?;

    match action {
        AdminAction::Stats { json } => {
            let stats = storefront.analytics().sales_stats().await?;
            if json {
                return emit_json(&stats);
            }
            emit(format_args!("Chiffre d'affaires : {}", stats.total_revenue));
            emit(format_args!("Commandes : {}", stats.total_orders));
            emit(format_args!("En attente : {}", stats.pending_orders));
            emit(format_args!("Stock faible : {}", stats.low_stock_products));
            emit("Revenus mensuels :");
            for month in &stats.monthly_revenue {
                emit(format_args!("  {}  {}", month.month, month.revenue));
            }
            emit("Meilleures ventes :");
            for product in &stats.top_products {
                emit(format_args!(
                    "  {:<40} {:>6} vendus  stock {}",
                    product.name, product.total_sold, product.stock_quantity
                ));
            }
        }
        AdminAction::Users => {
            for user in storefront.roles().list_users().await? {
                let profile = &user.profile;
                emit(format_args!(
                    "{}  {:<6} {:<30} {}",
                    profile.id,
                    user.role,
                    profile.name.as_deref().unwrap_or("-"),
                    profile.company.as_deref().unwrap_or("-")
                ));
            }
        }
        AdminAction::SetRole { user_id, role } => {
            let row = storefront.roles().set_role(user_id, role).await?;
            emit(format_args!("Rôle mis à jour : {} -> {}", row.user_id, row.role));
        }
        AdminAction::Orders => {
            for order in storefront.orders().list_all().await? {
                print_summary(&order);
            }
        }
        AdminAction::OrderStatus { order_id, status } => {
            storefront.orders().update_status(order_id, status).await?;
            print_detail(&storefront.orders().get(order_id).await?);
        }
        AdminAction::Stock {
            product_id,
            quantity,
            out_of_stock,
            threshold,
        } => {
            let update = StockUpdate {
                stock_quantity: quantity,
                in_stock: !out_of_stock,
                low_stock_threshold: threshold,
            };
            let product = storefront
                .products()
                .update_stock(ProductId::new(product_id), update)
                .await?;
            emit(format_args!(
                "{}: stock {} ({})",
                product.name,
                product.stock_quantity,
                if product.in_stock { "en stock" } else { "rupture" }
            ));
        }
    }
    Ok(())
}
