//! Route table checks.

use clap::Subcommand;

use voltline_storefront::Storefront;
use voltline_storefront::routes::{Access, Route, Viewer};

use super::{CliError, emit};

#[derive(Subcommand)]
pub enum RoutesAction {
    /// Show where a path leads for the current viewer
    Check { path: String },
}

fn print_access(path: &str, viewer: &Viewer) {
    let route = Route::parse(path);
    match route.access(viewer) {
        Access::Allow => match route {
            Route::NotFound(_) => emit(format_args!("{path} -> page introuvable")),
            _ => emit(format_args!("{path} -> {route}")),
        },
        Access::Redirect(target) => emit(format_args!("{path} -> redirection vers {target}")),
    }
}

/// Check a path as a guest, without contacting the backend.
pub fn run_offline(action: &RoutesAction) {
    let RoutesAction::Check { path } = action;
    print_access(path, &Viewer::Guest);
}

/// Check a path as the signed-in user.
///
/// # Errors
///
/// Returns an error if the role lookup fails.
pub async fn run(storefront: &Storefront, action: &RoutesAction) -> Result<(), CliError> {
    let RoutesAction::Check { path } = action;
    let viewer = storefront.viewer().await?;
    print_access(path, &viewer);
    Ok(())
}
