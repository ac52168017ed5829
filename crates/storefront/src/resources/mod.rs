//! Cache-backed accessors and mutations, one per remote resource.
//!
//! Every accessor reads through [`QueryCache`] under a user-scoped
//! [`crate::cache::CacheKey`]. Accessors that need a signed-in user resolve
//! to an empty result for guests without issuing a request. Every mutation
//! lists the keys it invalidates next to the write.

pub mod analytics;
pub mod cart_items;
pub mod orders;
pub mod products;
pub mod profiles;
pub mod roles;

pub use analytics::AnalyticsResource;
pub use cart_items::CartItemsResource;
pub use orders::OrdersResource;
pub use products::ProductsResource;
pub use profiles::ProfilesResource;
pub use roles::RolesResource;

use std::sync::Arc;

use voltline_core::UserId;

use crate::auth::SessionSlot;
use crate::backend::RemoteStore;
use crate::cache::QueryCache;
use crate::error::StorefrontError;

/// What every resource needs: the remote store, the shared cache and the
/// current session.
#[derive(Clone)]
pub struct DataContext {
    store: Arc<dyn RemoteStore>,
    cache: QueryCache,
    session: SessionSlot,
}

impl DataContext {
    #[must_use]
    pub fn new(store: Arc<dyn RemoteStore>, cache: QueryCache, session: SessionSlot) -> Self {
        Self {
            store,
            cache,
            session,
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn RemoteStore {
        self.store.as_ref()
    }

    /// Owned handle to the store, for detached tasks.
    #[must_use]
    pub fn store_handle(&self) -> Arc<dyn RemoteStore> {
        Arc::clone(&self.store)
    }

    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    #[must_use]
    pub const fn session(&self) -> &SessionSlot {
        &self.session
    }

    /// Signed-in user id, or `None` for a guest.
    #[must_use]
    pub fn current_user(&self) -> Option<UserId> {
        self.session.user_id()
    }

    /// Signed-in user id.
    ///
    /// # Errors
    ///
    /// Returns [`StorefrontError::Unauthenticated`] for a guest.
    pub fn require_user(&self) -> Result<UserId, StorefrontError> {
        self.current_user().ok_or(StorefrontError::Unauthenticated)
    }
}
