//! Cart commands for the signed-in user.

use clap::Subcommand;

use voltline_core::ProductId;
use voltline_storefront::Storefront;
use voltline_storefront::cart::CartView;

use super::{CliError, emit, require_sign_in};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show cart lines and totals
    Show,
    /// Add a product (bumps the quantity if already in the cart)
    Add {
        product_id: i64,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity; zero or less removes it
    Set {
        product_id: i64,
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product's line
    Remove { product_id: i64 },
    /// Empty the cart
    Clear,
}

/// Run a cart subcommand and print the resulting cart.
///
/// # Errors
///
/// Returns an error if no user is signed in or a remote call fails.
pub async fn run(storefront: &Storefront, action: CartAction) -> Result<(), CliError> {
    require_sign_in(storefront)?;
    let cart = storefront.cart();
    match action {
        CartAction::Show => {}
        CartAction::Add {
            product_id,
            quantity,
        } => cart.add_item(ProductId::new(product_id), quantity).await?,
        CartAction::Set {
            product_id,
            quantity,
        } => {
            cart.update_quantity(ProductId::new(product_id), quantity)
                .await?;
        }
        CartAction::Remove { product_id } => cart.remove_item(ProductId::new(product_id)).await?,
        CartAction::Clear => cart.clear().await?,
    }
    print_cart(&cart.view().await?);
    Ok(())
}

/// Print cart lines and totals.
pub fn print_cart(view: &CartView) {
    if view.items.is_empty() {
        emit("Votre panier est vide.");
        return;
    }
    for line in &view.items {
        emit(format_args!(
            "{:>5}  {:<40} {:>3} x {:>12} = {}",
            line.product_id,
            line.name,
            line.quantity,
            line.price.to_string(),
            line.line_total()
        ));
    }
    emit(format_args!(
        "Total : {} article(s), {}",
        view.total_items, view.total_price
    ));
}
