//! Process-wide query cache.
//!
//! Every read goes through [`QueryCache::fetch`] under a [`CacheKey`] scoped
//! by resource and, where the data is per-user, by user id. Concurrent
//! fetches of the same key share a single remote call. Failed fetches are
//! not cached and not retried; the last failure is remembered so that
//! [`QueryCache::snapshot`] can report it.
//!
//! Writes go through [`QueryCache::mutate`], which drops the keys the write
//! declares once the write succeeds. There is no dependency tracking: each
//! mutation lists its own [`Invalidation`]s.

use std::future::Future;
use std::sync::Arc;

use dashmap::DashMap;
use moka::future::Cache;
use tracing::{debug, error, warn};

use voltline_core::{OrderId, ProductId, UserId};

use crate::backend::BackendError;
use crate::config::CacheConfig;
use crate::models::{
    AnalyticsEvent, CartItem, DateRange, Order, Product, Profile, SalesStats, UserRole,
    UserWithRole,
};

/// Kind of cached data, independent of scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Products,
    Product,
    CartItems,
    Orders,
    OrderDetail,
    UserRole,
    Users,
    Analytics,
    SalesStats,
    Profile,
}

/// Cache key. No two users ever share a key for per-user data.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Product(ProductId),
    CartItems(UserId),
    /// One user's orders, or every order (admin) for `None`.
    Orders(Option<UserId>),
    OrderDetail(OrderId),
    UserRole(UserId),
    Users,
    Analytics(Option<DateRange>),
    SalesStats,
    Profile(UserId),
}

impl CacheKey {
    #[must_use]
    pub const fn resource(&self) -> Resource {
        match self {
            Self::Products => Resource::Products,
            Self::Product(_) => Resource::Product,
            Self::CartItems(_) => Resource::CartItems,
            Self::Orders(_) => Resource::Orders,
            Self::OrderDetail(_) => Resource::OrderDetail,
            Self::UserRole(_) => Resource::UserRole,
            Self::Users => Resource::Users,
            Self::Analytics(_) => Resource::Analytics,
            Self::SalesStats => Resource::SalesStats,
            Self::Profile(_) => Resource::Profile,
        }
    }

    /// Owning user of per-user keys.
    #[must_use]
    pub const fn user(&self) -> Option<UserId> {
        match self {
            Self::CartItems(user) | Self::UserRole(user) | Self::Profile(user) => Some(*user),
            Self::Orders(user) => *user,
            _ => None,
        }
    }
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Vec<Product>),
    Product(Option<Box<Product>>),
    CartItems(Vec<CartItem>),
    Orders(Vec<Order>),
    Order(Option<Box<Order>>),
    UserRole(Option<UserRole>),
    Users(Vec<UserWithRole>),
    Analytics(Vec<AnalyticsEvent>),
    SalesStats(Box<SalesStats>),
    Profile(Option<Profile>),
}

/// A type that can be stored as a [`CacheValue`].
pub trait Cached: Sized {
    fn into_value(self) -> CacheValue;
    fn from_value(value: CacheValue) -> Option<Self>;
}

macro_rules! impl_cached {
    ($ty:ty, $variant:ident) => {
        impl Cached for $ty {
            fn into_value(self) -> CacheValue {
                CacheValue::$variant(self)
            }

            fn from_value(value: CacheValue) -> Option<Self> {
                match value {
                    CacheValue::$variant(inner) => Some(inner),
                    _ => None,
                }
            }
        }
    };
}

impl_cached!(Vec<Product>, Products);
impl_cached!(Vec<CartItem>, CartItems);
impl_cached!(Vec<Order>, Orders);
impl_cached!(Option<UserRole>, UserRole);
impl_cached!(Vec<UserWithRole>, Users);
impl_cached!(Vec<AnalyticsEvent>, Analytics);
impl_cached!(Option<Profile>, Profile);

impl Cached for Option<Product> {
    fn into_value(self) -> CacheValue {
        CacheValue::Product(self.map(Box::new))
    }

    fn from_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::Product(product) => Some(product.map(|p| *p)),
            _ => None,
        }
    }
}

impl Cached for Option<Order> {
    fn into_value(self) -> CacheValue {
        CacheValue::Order(self.map(Box::new))
    }

    fn from_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::Order(order) => Some(order.map(|o| *o)),
            _ => None,
        }
    }
}

impl Cached for SalesStats {
    fn into_value(self) -> CacheValue {
        CacheValue::SalesStats(Box::new(self))
    }

    fn from_value(value: CacheValue) -> Option<Self> {
        match value {
            CacheValue::SalesStats(stats) => Some(*stats),
            _ => None,
        }
    }
}

/// What a read currently knows: `{ data, is_loading, error }`.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    pub data: Option<T>,
    pub is_loading: bool,
    pub error: Option<BackendError>,
}

impl<T> QueryState<T> {
    /// Settled state of a finished fetch.
    #[must_use]
    pub fn settled(result: Result<T, BackendError>) -> Self {
        match result {
            Ok(data) => Self {
                data: Some(data),
                is_loading: false,
                error: None,
            },
            Err(error) => Self {
                data: None,
                is_loading: false,
                error: Some(error),
            },
        }
    }
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            data: None,
            is_loading: false,
            error: None,
        }
    }
}

/// Keys to drop after a successful write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Invalidation {
    /// Exactly this key.
    Key(CacheKey),
    /// Every key of this resource, for every user.
    Resource(Resource),
}

/// Shared query cache. Cloning shares the entries.
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<QueryCacheInner>,
}

struct QueryCacheInner {
    entries: Cache<CacheKey, CacheValue>,
    loading: DashMap<CacheKey, usize>,
    errors: DashMap<CacheKey, BackendError>,
}

/// Marks a key as loading for as long as it lives.
struct LoadingGuard<'a> {
    loading: &'a DashMap<CacheKey, usize>,
    key: CacheKey,
}

impl<'a> LoadingGuard<'a> {
    fn new(loading: &'a DashMap<CacheKey, usize>, key: CacheKey) -> Self {
        *loading.entry(key.clone()).or_insert(0) += 1;
        Self { loading, key }
    }
}

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.loading.remove_if_mut(&self.key, |_, count| {
            *count = count.saturating_sub(1);
            *count == 0
        });
    }
}

impl QueryCache {
    /// Create a cache with the configured TTL and capacity.
    #[must_use]
    pub fn new(config: &CacheConfig) -> Self {
        let entries = Cache::builder()
            .max_capacity(config.capacity)
            .time_to_live(config.ttl)
            .support_invalidation_closures()
            .build();

        Self {
            inner: Arc::new(QueryCacheInner {
                entries,
                loading: DashMap::new(),
                errors: DashMap::new(),
            }),
        }
    }

    /// Return the cached value for `key`, or run `fetch` and cache its result.
    ///
    /// Concurrent calls for the same key wait on one `fetch`. A failure is
    /// returned to every waiter, remembered for [`Self::snapshot`], and not
    /// cached.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `fetch`.
    pub async fn fetch<T, Fut>(&self, key: CacheKey, fetch: Fut) -> Result<T, BackendError>
    where
        T: Cached,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        if let Some(value) = self.inner.entries.get(&key).await
            && let Some(data) = T::from_value(value)
        {
            debug!(?key, "Cache hit");
            return Ok(data);
        }
        debug!(?key, "Cache miss");

        let result = {
            let _loading = LoadingGuard::new(&self.inner.loading, key.clone());
            self.inner
                .entries
                .try_get_with(key.clone(), async { fetch.await.map(Cached::into_value) })
                .await
        };

        match result {
            Ok(value) => {
                self.inner.errors.remove(&key);
                T::from_value(value).ok_or_else(|| {
                    warn!(?key, "Cached value has the wrong type, dropping it");
                    BackendError::Decode {
                        table: "cache",
                        message: format!("unexpected value type for {key:?}"),
                    }
                })
            }
            Err(err) => {
                let err = BackendError::clone(&err);
                error!(?key, error = %err, "Fetch failed");
                self.inner.errors.insert(key, err.clone());
                Err(err)
            }
        }
    }

    /// Run `fetch` through the cache and report the settled state.
    pub async fn query<T, Fut>(&self, key: CacheKey, fetch: Fut) -> QueryState<T>
    where
        T: Cached,
        Fut: Future<Output = Result<T, BackendError>>,
    {
        QueryState::settled(self.fetch(key, fetch).await)
    }

    /// What is known about `key` right now, without fetching.
    pub async fn snapshot<T: Cached>(&self, key: &CacheKey) -> QueryState<T> {
        QueryState {
            data: self
                .inner
                .entries
                .get(key)
                .await
                .and_then(T::from_value),
            is_loading: self.is_loading(key),
            error: self.inner.errors.get(key).map(|e| e.value().clone()),
        }
    }

    /// Cached value for `key`, if fresh.
    pub async fn peek<T: Cached>(&self, key: &CacheKey) -> Option<T> {
        self.inner.entries.get(key).await.and_then(T::from_value)
    }

    /// Whether a fetch for `key` is in flight.
    #[must_use]
    pub fn is_loading(&self, key: &CacheKey) -> bool {
        self.inner.loading.contains_key(key)
    }

    /// Perform `write`, then drop `invalidations` if it succeeded.
    ///
    /// # Errors
    ///
    /// Returns the error produced by `write`; nothing is invalidated then.
    pub async fn mutate<T, E, Fut>(&self, invalidations: &[Invalidation], write: Fut) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
    {
        let output = write.await?;
        self.invalidate(invalidations).await;
        Ok(output)
    }

    /// Drop the given keys so the next read re-fetches.
    pub async fn invalidate(&self, invalidations: &[Invalidation]) {
        for invalidation in invalidations {
            match invalidation {
                Invalidation::Key(key) => {
                    debug!(?key, "Invalidating key");
                    self.inner.entries.invalidate(key).await;
                    self.inner.errors.remove(key);
                }
                Invalidation::Resource(resource) => {
                    debug!(?resource, "Invalidating resource");
                    let resource = *resource;
                    self.invalidate_where(move |key| key.resource() == resource);
                }
            }
        }
    }

    /// Drop every key scoped to `user`.
    pub fn invalidate_user(&self, user: UserId) {
        debug!(user_id = %user, "Invalidating user keys");
        self.invalidate_where(move |key| key.user() == Some(user));
    }

    /// Drop everything.
    pub fn clear(&self) {
        self.inner.entries.invalidate_all();
        self.inner.errors.clear();
    }

    fn invalidate_where<P>(&self, predicate: P)
    where
        P: Fn(&CacheKey) -> bool + Send + Sync + Clone + 'static,
    {
        let matches = predicate.clone();
        if let Err(err) = self
            .inner
            .entries
            .invalidate_entries_if(move |key, _| matches(key))
        {
            // Only possible when closures were not enabled at build time.
            warn!(error = %err, "Falling back to clearing the whole cache");
            self.inner.entries.invalidate_all();
        }
        self.inner.errors.retain(|key, _| !predicate(key));
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::backend::{ApiError, Table};

    fn cache() -> QueryCache {
        QueryCache::new(&CacheConfig {
            ttl: Duration::from_secs(300),
            capacity: 100,
        })
    }

    fn failure() -> BackendError {
        BackendError::api(Table::CartItems, ApiError::new(500, "boom"))
    }

    async fn counted(
        calls: &AtomicUsize,
        value: Option<Profile>,
    ) -> Result<Option<Profile>, BackendError> {
        calls.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(20)).await;
        Ok(value)
    }

    #[tokio::test]
    async fn test_concurrent_fetches_share_one_call() {
        let cache = cache();
        let calls = AtomicUsize::new(0);
        let key = CacheKey::Profile(UserId::random());

        let (a, b) = tokio::join!(
            cache.fetch(key.clone(), counted(&calls, None)),
            cache.fetch(key.clone(), counted(&calls, None)),
        );
        assert!(a.unwrap().is_none());
        assert!(b.unwrap().is_none());
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        // Served from cache afterwards.
        cache.fetch(key, counted(&calls, None)).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failure_is_reported_not_cached() {
        let cache = cache();
        let key = CacheKey::CartItems(UserId::random());

        let err = cache
            .fetch::<Vec<CartItem>, _>(key.clone(), async { Err(failure()) })
            .await
            .unwrap_err();
        assert_eq!(err, failure());

        let state: QueryState<Vec<CartItem>> = cache.snapshot(&key).await;
        assert!(state.data.is_none());
        assert!(!state.is_loading);
        assert_eq!(state.error, Some(failure()));

        // A later successful fetch runs again and clears the error.
        let items: Vec<CartItem> = cache.fetch(key.clone(), async { Ok(Vec::new()) }).await.unwrap();
        assert!(items.is_empty());
        let state: QueryState<Vec<CartItem>> = cache.snapshot(&key).await;
        assert_eq!(state.data, Some(Vec::new()));
        assert!(state.error.is_none());
    }

    /// Records the level of every event.
    #[derive(Clone, Default)]
    struct Levels(Arc<std::sync::Mutex<Vec<tracing::Level>>>);

    impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for Levels {
        fn on_event(
            &self,
            event: &tracing::Event<'_>,
            _ctx: tracing_subscriber::layer::Context<'_, S>,
        ) {
            self.0.lock().unwrap().push(*event.metadata().level());
        }
    }

    #[tokio::test]
    async fn test_failed_fetch_logs_at_error() {
        use tracing_subscriber::layer::SubscriberExt;

        let levels = Levels::default();
        let _guard =
            tracing::subscriber::set_default(tracing_subscriber::registry().with(levels.clone()));

        let cache = cache();
        cache
            .fetch::<Vec<CartItem>, _>(CacheKey::Products, async { Err(failure()) })
            .await
            .unwrap_err();

        let levels = levels.0.lock().unwrap();
        assert!(levels.contains(&tracing::Level::ERROR));
        assert!(!levels.contains(&tracing::Level::WARN));
    }

    #[tokio::test]
    async fn test_is_loading_during_fetch() {
        let cache = cache();
        let key = CacheKey::Users;
        let probe = cache.clone();
        let probe_key = key.clone();

        let fetch = async move {
            assert!(probe.is_loading(&probe_key));
            Ok::<Vec<UserWithRole>, BackendError>(Vec::new())
        };
        cache.fetch(key.clone(), fetch).await.unwrap();
        assert!(!cache.is_loading(&key));
    }

    #[tokio::test]
    async fn test_mutate_invalidates_only_on_success() {
        let cache = cache();
        let user = UserId::random();
        let key = CacheKey::CartItems(user);
        let invalidations = [Invalidation::Key(key.clone())];

        let _: Vec<CartItem> = cache.fetch(key.clone(), async { Ok(Vec::new()) }).await.unwrap();

        let failed: Result<(), BackendError> =
            cache.mutate(&invalidations, async { Err(failure()) }).await;
        assert!(failed.is_err());
        assert!(cache.peek::<Vec<CartItem>>(&key).await.is_some());

        cache
            .mutate(&invalidations, async { Ok::<_, BackendError>(()) })
            .await
            .unwrap();
        assert!(cache.peek::<Vec<CartItem>>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_resource_and_user_invalidation() {
        let cache = cache();
        let alice = UserId::random();
        let bob = UserId::random();

        for user in [alice, bob] {
            let _: Vec<Order> = cache
                .fetch(CacheKey::Orders(Some(user)), async { Ok(Vec::new()) })
                .await
                .unwrap();
            let _: Option<Profile> = cache
                .fetch(CacheKey::Profile(user), async { Ok(None) })
                .await
                .unwrap();
        }

        cache
            .invalidate(&[Invalidation::Resource(Resource::Orders)])
            .await;
        assert!(cache.peek::<Vec<Order>>(&CacheKey::Orders(Some(alice))).await.is_none());
        assert!(cache.peek::<Vec<Order>>(&CacheKey::Orders(Some(bob))).await.is_none());
        assert!(cache.peek::<Option<Profile>>(&CacheKey::Profile(alice)).await.is_some());

        cache.invalidate_user(alice);
        assert!(cache.peek::<Option<Profile>>(&CacheKey::Profile(alice)).await.is_none());
        assert!(cache.peek::<Option<Profile>>(&CacheKey::Profile(bob)).await.is_some());
    }

    #[test]
    fn test_key_scope() {
        let user = UserId::random();
        assert_eq!(CacheKey::CartItems(user).user(), Some(user));
        assert_eq!(CacheKey::Orders(None).user(), None);
        assert_eq!(CacheKey::Orders(Some(user)).resource(), Resource::Orders);
        assert_eq!(CacheKey::SalesStats.user(), None);
    }
}
