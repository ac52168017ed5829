//! Place an order from the signed-in user's cart.

use clap::Args;

use voltline_core::Address;
use voltline_storefront::checkout::CheckoutRequest;
use voltline_storefront::{Storefront, StorefrontError};

use super::{CliError, emit, require_sign_in};

#[derive(Args)]
pub struct CheckoutArgs {
    /// Recipient or company name
    #[arg(long)]
    pub name: String,
    #[arg(long)]
    pub street: String,
    #[arg(long)]
    pub city: String,
    #[arg(long)]
    pub postal_code: String,
    #[arg(long, default_value = "France")]
    pub country: String,
    /// Payment method label stored on the order
    #[arg(long)]
    pub payment_method: Option<String>,
    #[arg(long)]
    pub notes: Option<String>,
}

/// Create an order from the current cart.
///
/// # Errors
///
/// Returns an error if no user is signed in, the form is incomplete, or
/// order creation fails.
pub async fn run(storefront: &Storefront, args: CheckoutArgs) -> Result<(), CliError> {
    require_sign_in(storefront)?;
    let rows = storefront.cart().rows().await?;

    let address = Address::new(args.name, args.street, args.city, args.postal_code, args.country);
    let mut request = CheckoutRequest::new(rows, address);
    if let Some(method) = args.payment_method {
        request = request.with_payment_method(method);
    }
    if let Some(notes) = args.notes {
        request = request.with_notes(notes);
    }

    let order = storefront
        .checkout()
        .create_order(request)
        .await
        .map_err(StorefrontError::from)?;

    emit("Commande créée avec succès !");
    emit(format_args!("  Numéro : {}", order.id));
    emit(format_args!("  Total : {}", order.total_amount));
    emit(format_args!("  Statut : {}", order.status.label()));
    Ok(())
}
