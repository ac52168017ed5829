//! Route table and page gating for the storefront UI.
//!
//! # Route Structure
//!
//! ```text
//! /               - Home page
//! /catalog        - Product catalog with filters
//! /product/:id    - Product detail
//! /about          - Company page
//! /auth           - Sign in / sign up
//! /checkout       - Checkout form (requires auth)
//! /dashboard      - Profile and order history (requires auth)
//! /admin          - Back office (requires admin role)
//! *               - Not found
//! ```
//!
//! Gating is a UI concern only. It decides where a viewer is sent; the
//! backend's row-level policies decide what data they can actually read.

use core::fmt;

use voltline_core::{AppRole, ProductId, UserId};

/// A storefront page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Route {
    Home,
    Catalog,
    Product(ProductId),
    About,
    Auth,
    Checkout,
    Dashboard,
    Admin,
    /// Any other path, kept as given
    NotFound(String),
}

impl Route {
    /// Match a path against the route table.
    ///
    /// Query string, fragment and a trailing slash are ignored. Anything
    /// unmatched, including `/product/` with a non-numeric id, is
    /// [`Route::NotFound`].
    #[must_use]
    pub fn parse(path: &str) -> Self {
        let trimmed = path
            .split(['?', '#'])
            .next()
            .unwrap_or_default()
            .trim_end_matches('/');
        let segments: Vec<&str> = trimmed.split('/').filter(|s| !s.is_empty()).collect();

        match segments.as_slice() {
            [] => Self::Home,
            ["catalog"] => Self::Catalog,
            ["product", id] => id
                .parse::<ProductId>()
                .map_or_else(|_| Self::NotFound(path.to_string()), Self::Product),
            ["about"] => Self::About,
            ["auth"] => Self::Auth,
            ["checkout"] => Self::Checkout,
            ["dashboard"] => Self::Dashboard,
            ["admin"] => Self::Admin,
            _ => Self::NotFound(path.to_string()),
        }
    }

    /// Whether the page needs a signed-in user.
    #[must_use]
    pub const fn requires_sign_in(&self) -> bool {
        matches!(self, Self::Checkout | Self::Dashboard | Self::Admin)
    }

    /// Where `viewer` ends up when navigating here.
    #[must_use]
    pub const fn access(&self, viewer: &Viewer) -> Access {
        match (self, viewer) {
            (Self::Checkout | Self::Dashboard | Self::Admin, Viewer::Guest) => {
                Access::Redirect(Self::Auth)
            }
            (Self::Admin, Viewer::User(_)) => Access::Redirect(Self::Dashboard),
            (Self::Auth, Viewer::User(_) | Viewer::Admin(_)) => Access::Redirect(Self::Home),
            _ => Access::Allow,
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Home => f.write_str("/"),
            Self::Catalog => f.write_str("/catalog"),
            Self::Product(id) => write!(f, "/product/{id}"),
            Self::About => f.write_str("/about"),
            Self::Auth => f.write_str("/auth"),
            Self::Checkout => f.write_str("/checkout"),
            Self::Dashboard => f.write_str("/dashboard"),
            Self::Admin => f.write_str("/admin"),
            Self::NotFound(path) => f.write_str(path),
        }
    }
}

/// Who is looking at a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Guest,
    User(UserId),
    Admin(UserId),
}

impl Viewer {
    /// Build from the signed-in user and their resolved role.
    #[must_use]
    pub const fn new(user: Option<UserId>, role: AppRole) -> Self {
        match (user, role) {
            (None, _) => Self::Guest,
            (Some(id), AppRole::Admin) => Self::Admin(id),
            (Some(id), AppRole::User) => Self::User(id),
        }
    }

    #[must_use]
    pub const fn user_id(&self) -> Option<UserId> {
        match self {
            Self::Guest => None,
            Self::User(id) | Self::Admin(id) => Some(*id),
        }
    }

    #[must_use]
    pub const fn is_admin(&self) -> bool {
        matches!(self, Self::Admin(_))
    }
}

/// Outcome of [`Route::access`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Redirect(Route),
}
