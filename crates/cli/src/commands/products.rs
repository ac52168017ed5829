//! Catalog browsing commands.

use std::collections::BTreeSet;

use clap::Subcommand;

use voltline_core::ProductId;
use voltline_storefront::{Storefront, StorefrontError};
use voltline_storefront::catalog::{self, PriceRange, ProductFilter, ProductSort};

use super::{CliError, emit, emit_json};

#[derive(Subcommand)]
pub enum ProductsAction {
    /// List products matching the filters
    List {
        /// Search name, brand and description
        #[arg(short, long)]
        search: Option<String>,

        /// Category id (e.g. `disjoncteurs`)
        #[arg(short, long)]
        category: Option<String>,

        /// Accepted brand, repeatable
        #[arg(short, long)]
        brand: Vec<String>,

        /// Price bucket: `0-100`, `100-500`, `500-1000`, `1000+`
        #[arg(short, long, default_value = "all")]
        price: String,

        /// Only products flagged in stock
        #[arg(long)]
        in_stock: bool,

        /// `featured`, `price-asc`, `price-desc` or `name`
        #[arg(long, default_value = "featured")]
        sort: String,

        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
    /// Show one product with related products
    Show {
        /// Product id
        id: i64,
    },
    /// List products at or below their low-stock threshold
    LowStock,
    /// Print the category tree
    Categories,
}

/// Run a products subcommand.
///
/// # Errors
///
/// Returns an error if the catalog cannot be read.
pub async fn run(storefront: &Storefront, action: ProductsAction) -> Result<(), CliError> {
    match action {
        ProductsAction::List {
            search,
            category,
            brand,
            price,
            in_stock,
            sort,
            json,
        } => {
            let filter = ProductFilter {
                search,
                category,
                brands: brand.into_iter().collect::<BTreeSet<_>>(),
                price: PriceRange::parse(&price),
                in_stock_only: in_stock,
                sort: ProductSort::parse(&sort),
            };
            let products = storefront.products().list().await?;
            let matched = filter.apply(&products);
            if json {
                return emit_json(&matched);
            }
            emit(format_args!("{} produits trouvés", matched.len()));
            for p in matched {
                emit(format_args!(
                    "{:>5}  {:<40} {:<20} {:>12}  {}",
                    p.id,
                    p.name,
                    p.brand,
                    p.price.to_string(),
                    if p.in_stock { "en stock" } else { "rupture" }
                ));
            }
        }
        ProductsAction::Show { id } => {
            let products = storefront.products().list().await?;
            let id = ProductId::new(id);
            let Some(product) = products.iter().find(|p| p.id == id) else {
                return Err(StorefrontError::NotFound(format!("product {id}")).into());
            };
            emit(format_args!("{} ({})", product.name, product.brand));
            emit(format_args!("  Catégorie : {}", product.category));
            match product.original_price.filter(|_| product.is_discounted()) {
                Some(original) => {
                    emit(format_args!("  Prix : {} (au lieu de {original})", product.price));
                }
                None => emit(format_args!("  Prix : {}", product.price)),
            }
            emit(format_args!(
                "  Stock : {} (seuil {}){}",
                product.stock_quantity,
                product.low_stock_threshold,
                if product.is_low_stock() { " - stock faible" } else { "" }
            ));
            if let Some(description) = &product.short_description {
                emit(format_args!("  {description}"));
            }
            for feature in &product.features {
                emit(format_args!("  - {feature}"));
            }
            for (key, value) in &product.technical_specs {
                emit(format_args!("  {key}: {value}"));
            }
            let related = catalog::related(product, &products, 4);
            if !related.is_empty() {
                emit("Produits similaires :");
                for p in related {
                    emit(format_args!("  {:>5}  {}  {}", p.id, p.name, p.price));
                }
            }
        }
        ProductsAction::LowStock => {
            let products = storefront.products().list().await?;
            for p in catalog::low_stock(&products) {
                emit(format_args!(
                    "{:>5}  {:<40} {:>4} / {}",
                    p.id, p.name, p.stock_quantity, p.low_stock_threshold
                ));
            }
        }
        ProductsAction::Categories => {
            let categories = storefront.categories();
            for root in categories.root_categories() {
                emit(format_args!("{} ({})", root.name, root.id));
                for sub in categories.sub_categories(&root.id) {
                    emit(format_args!("  {} ({})", sub.name, sub.id));
                }
            }
        }
    }
    Ok(())
}
