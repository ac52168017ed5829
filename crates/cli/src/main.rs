//! Voltline CLI - Drive the storefront services from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse the catalog (no sign-in needed)
//! voltline products list --brand ABB --price 100-500 --sort price-asc
//! voltline products show 7
//!
//! # Cart and checkout (password read from VOLTLINE_PASSWORD)
//! voltline --email buyer@example.fr cart add 7 --quantity 2
//! voltline --email buyer@example.fr checkout --name "SARL Dupont" \
//!     --street "12 rue Volta" --city Lyon --postal-code 69003
//!
//! # Back office
//! voltline --email admin@example.fr admin stats
//! voltline --email admin@example.fr admin order-status <order-id> shipped
//!
//! # Offline walkthrough against the in-memory backend
//! voltline demo
//! ```
//!
//! # Commands
//!
//! - `products` - List and show catalog products
//! - `cart` - Show and edit the signed-in user's cart
//! - `checkout` - Place an order from the cart
//! - `orders` - List the signed-in user's orders
//! - `admin` - Sales figures, users, roles and order statuses
//! - `routes` - Check where a path leads for the current viewer
//! - `demo` - Run the cart-to-order scenario offline

#![cfg_attr(not(test), forbid(unsafe_code))]

use clap::{Parser, Subcommand};
use secrecy::SecretString;

mod commands;

use commands::CliError;

#[derive(Parser)]
#[command(name = "voltline")]
#[command(author, version, about = "Voltline storefront CLI")]
struct Cli {
    /// Sign in with this email before running the command
    #[arg(long, global = true, env = "VOLTLINE_EMAIL")]
    email: Option<String>,

    /// Password for --email
    #[arg(long, global = true, env = "VOLTLINE_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the catalog
    Products {
        #[command(subcommand)]
        action: commands::products::ProductsAction,
    },
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: commands::cart::CartAction,
    },
    /// Place an order from the current cart
    Checkout(commands::checkout::CheckoutArgs),
    /// Order history
    Orders {
        #[command(subcommand)]
        action: commands::orders::OrdersAction,
    },
    /// Back-office operations (admin role required)
    Admin {
        #[command(subcommand)]
        action: commands::admin::AdminAction,
    },
    /// Route table checks
    Routes {
        #[command(subcommand)]
        action: commands::routes::RoutesAction,
    },
    /// Run the cart-to-order scenario against the in-memory backend
    Demo,
}

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed arguments
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let telemetry = match voltline_storefront::config::TelemetryConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            #[allow(clippy::print_stderr)]
            {
                eprintln!("Configuration error: {e}");
            }
            std::process::exit(2);
        }
    };
    let _telemetry = voltline_storefront::telemetry::init(
        &telemetry,
        "voltline_storefront=warn,voltline=info",
    );

    if let Err(e) = run(cli).await {
        tracing::error!("Command failed: {e}");
        if let CliError::Storefront(err) = &e {
            err.report();
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let password = cli.password.map(SecretString::from);
    let storefront = match &cli.command {
        Commands::Demo => return commands::demo::run().await,
        Commands::Routes { action } if cli.email.is_none() => {
            commands::routes::run_offline(action);
            return Ok(());
        }
        _ => commands::connect(cli.email.as_deref(), password.as_ref()).await?,
    };

    match cli.command {
        Commands::Products { action } => commands::products::run(&storefront, action).await,
        Commands::Cart { action } => commands::cart::run(&storefront, action).await,
        Commands::Checkout(args) => commands::checkout::run(&storefront, args).await,
        Commands::Orders { action } => commands::orders::run(&storefront, action).await,
        Commands::Admin { action } => commands::admin::run(&storefront, action).await,
        Commands::Routes { action } => commands::routes::run(&storefront, &action).await,
        Commands::Demo => commands::demo::run().await,
    }
}
