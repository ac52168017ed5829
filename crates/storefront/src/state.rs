//! Storefront state shared by every caller.
//!
//! [`Storefront`] is the composition root: it owns the remote store, the
//! identity provider, the query cache and the category tree, and hands out
//! the services built on them. Nothing else in the crate reaches for global
//! state.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use tracing::{info, instrument};

use voltline_core::{Email, UserId};

use crate::auth::{
    AuthError, AuthUser, GoTrueIdentity, IdentityProvider, LocalIdentity, SessionSlot,
    SignUpRequest, validate_password,
};
use crate::backend::{InMemoryStore, RemoteStore, RestStore};
use crate::cache::QueryCache;
use crate::cart::CartService;
use crate::catalog::CategoryService;
use crate::checkout::CheckoutService;
use crate::config::{CacheConfig, StorefrontConfig};
use crate::error::{StorefrontError, add_breadcrumb, clear_sentry_user, set_sentry_user};
use crate::resources::{
    AnalyticsResource, CartItemsResource, DataContext, OrdersResource, ProductsResource,
    ProfilesResource, RolesResource,
};
use crate::routes::{Access, Route, Viewer};

/// Application state shared across all callers.
///
/// This struct is cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct Storefront {
    inner: Arc<StorefrontInner>,
}

struct StorefrontInner {
    ctx: DataContext,
    identity: Arc<dyn IdentityProvider>,
    categories: CategoryService,
}

impl Storefront {
    /// Connect to the hosted backend described by `config`.
    ///
    /// The table client and the identity provider share one session, so
    /// requests carry the signed-in user's token.
    ///
    /// # Errors
    ///
    /// Returns an error if either HTTP client fails to build.
    pub fn connect(config: &StorefrontConfig) -> Result<Self, StorefrontError> {
        let session = SessionSlot::new();
        let store = RestStore::new(&config.backend, session.clone())?;
        let identity = GoTrueIdentity::new(&config.backend, session)?;

        info!(backend = %config.backend.url, "Storefront connected");
        Ok(Self::builder()
            .store(Arc::new(store))
            .identity(Arc::new(identity))
            .cache(config.cache)
            .build())
    }

    /// Start building a storefront from injected collaborators.
    #[must_use]
    pub fn builder() -> StorefrontBuilder {
        StorefrontBuilder::default()
    }

    /// Shared data access context.
    #[must_use]
    pub fn context(&self) -> &DataContext {
        &self.inner.ctx
    }

    #[must_use]
    pub fn cache(&self) -> &QueryCache {
        self.inner.ctx.cache()
    }

    #[must_use]
    pub fn session(&self) -> &SessionSlot {
        self.inner.ctx.session()
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.inner.identity.as_ref()
    }

    #[must_use]
    pub fn categories(&self) -> &CategoryService {
        &self.inner.categories
    }

    #[must_use]
    pub fn products(&self) -> ProductsResource {
        ProductsResource::new(self.inner.ctx.clone())
    }

    #[must_use]
    pub fn cart_items(&self) -> CartItemsResource {
        CartItemsResource::new(self.inner.ctx.clone())
    }

    #[must_use]
    pub fn orders(&self) -> OrdersResource {
        OrdersResource::new(self.inner.ctx.clone())
    }

    #[must_use]
    pub fn roles(&self) -> RolesResource {
        RolesResource::new(self.inner.ctx.clone())
    }

    #[must_use]
    pub fn profiles(&self) -> ProfilesResource {
        ProfilesResource::new(self.inner.ctx.clone())
    }

    #[must_use]
    pub fn analytics(&self) -> AnalyticsResource {
        AnalyticsResource::new(self.inner.ctx.clone())
    }

    #[must_use]
    pub fn cart(&self) -> CartService {
        CartService::new(self.cart_items())
    }

    #[must_use]
    pub fn checkout(&self) -> CheckoutService {
        CheckoutService::new(self.inner.ctx.clone(), self.analytics())
    }

    /// The signed-in user, or `None` for a guest.
    #[must_use]
    pub fn current_user(&self) -> Option<AuthUser> {
        self.inner.identity.current_user()
    }

    /// Sign in and return the user.
    ///
    /// Cached data of the previous and the new user is dropped.
    ///
    /// # Errors
    ///
    /// Returns error if the email is malformed or the credentials are
    /// rejected.
    #[instrument(skip(self, password))]
    pub async fn sign_in(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<AuthUser, StorefrontError> {
        let email = Email::parse(email).map_err(AuthError::from)?;
        let previous = self.session().user_id();

        let session = self.inner.identity.sign_in(&email, password).await?;
        self.identity_changed(previous, Some(&session.user));
        Ok(session.user)
    }

    /// Create an account. Returns the user when the backend signed them in
    /// straight away, `None` when the email must be confirmed first.
    ///
    /// # Errors
    ///
    /// Returns error if the password is too weak or the account exists.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn sign_up(
        &self,
        request: &SignUpRequest,
    ) -> Result<Option<AuthUser>, StorefrontError> {
        validate_password(request.password.expose_secret())?;
        let previous = self.session().user_id();

        let session = self.inner.identity.sign_up(request).await?;
        let user = session.map(|s| s.user);
        if user.is_some() {
            self.identity_changed(previous, user.as_ref());
        }
        Ok(user)
    }

    /// Sign out. A guest signing out is a no-op.
    ///
    /// # Errors
    ///
    /// Returns error if the backend rejects the sign-out.
    #[instrument(skip(self))]
    pub async fn sign_out(&self) -> Result<(), StorefrontError> {
        let previous = self.session().user_id();
        self.inner.identity.sign_out().await?;
        self.identity_changed(previous, None);
        Ok(())
    }

    /// The current viewer with their resolved role.
    ///
    /// # Errors
    ///
    /// Returns error if the role lookup fails.
    pub async fn viewer(&self) -> Result<Viewer, StorefrontError> {
        let role = self.roles().current_role().await?;
        Ok(Viewer::new(self.session().user_id(), role))
    }

    /// Where the current viewer ends up when navigating to `route`.
    ///
    /// # Errors
    ///
    /// Returns error if the role lookup fails.
    pub async fn access(&self, route: &Route) -> Result<Access, StorefrontError> {
        Ok(route.access(&self.viewer().await?))
    }

    fn identity_changed(&self, previous: Option<UserId>, current: Option<&AuthUser>) {
        let cache = self.cache();
        if let Some(previous) = previous {
            cache.invalidate_user(previous);
        }
        match current {
            Some(user) => {
                cache.invalidate_user(user.id);
                set_sentry_user(&user.id, user.email.as_deref());
                add_breadcrumb("auth", "Signed in", None);
            }
            None => {
                clear_sentry_user();
                add_breadcrumb("auth", "Signed out", None);
            }
        }
    }
}

/// Builder for [`Storefront`].
///
/// Defaults to an empty [`InMemoryStore`] and a [`LocalIdentity`]. A store
/// that authenticates requests must share the identity provider's
/// [`SessionSlot`].
#[derive(Default)]
pub struct StorefrontBuilder {
    store: Option<Arc<dyn RemoteStore>>,
    identity: Option<Arc<dyn IdentityProvider>>,
    cache: CacheConfig,
    categories: Option<CategoryService>,
}

impl StorefrontBuilder {
    #[must_use]
    pub fn store(mut self, store: Arc<dyn RemoteStore>) -> Self {
        self.store = Some(store);
        self
    }

    #[must_use]
    pub fn identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    #[must_use]
    pub const fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    #[must_use]
    pub fn categories(mut self, categories: CategoryService) -> Self {
        self.categories = Some(categories);
        self
    }

    #[must_use]
    pub fn build(self) -> Storefront {
        let identity: Arc<dyn IdentityProvider> = self
            .identity
            .unwrap_or_else(|| Arc::new(LocalIdentity::new(SessionSlot::new())));
        let store: Arc<dyn RemoteStore> = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let session = identity.session().clone();

        Storefront {
            inner: Arc::new(StorefrontInner {
                ctx: DataContext::new(store, QueryCache::new(&self.cache), session),
                identity,
                categories: self.categories.unwrap_or_default(),
            }),
        }
    }
}
