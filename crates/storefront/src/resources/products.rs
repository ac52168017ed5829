//! Catalog products.

use tracing::{info, instrument};

use voltline_core::ProductId;

use super::DataContext;
use crate::cache::{CacheKey, Invalidation, QueryState};
use crate::error::StorefrontError;
use crate::models::{NewProduct, Product, StockUpdate};

/// Product accessor and admin writes.
#[derive(Clone)]
pub struct ProductsResource {
    ctx: DataContext,
}

impl ProductsResource {
    #[must_use]
    pub const fn new(ctx: DataContext) -> Self {
        Self { ctx }
    }

    /// Every product, newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Product>, StorefrontError> {
        let store = self.ctx.store();
        Ok(self
            .ctx
            .cache()
            .fetch(CacheKey::Products, store.list_products())
            .await?)
    }

    /// Current state of the product list.
    pub async fn state(&self) -> QueryState<Vec<Product>> {
        self.ctx.cache().snapshot(&CacheKey::Products).await
    }

    /// One product, `None` if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn get(&self, id: ProductId) -> Result<Option<Product>, StorefrontError> {
        let store = self.ctx.store();
        Ok(self
            .ctx
            .cache()
            .fetch(CacheKey::Product(id), store.get_product(id))
            .await?)
    }

    /// Add a product to the catalog.
    ///
    /// # Errors
    ///
    /// Returns error if the remote insert fails.
    #[instrument(skip(self, product), fields(name = %product.name))]
    pub async fn create(&self, product: NewProduct) -> Result<Product, StorefrontError> {
        let product = product.normalized();
        let invalidations = [
            Invalidation::Key(CacheKey::Products),
            Invalidation::Key(CacheKey::SalesStats),
        ];
        let created = self
            .ctx
            .cache()
            .mutate(&invalidations, self.ctx.store().insert_product(&product))
            .await?;
        info!(product_id = %created.id, "Product created");
        Ok(created)
    }

    /// Set a product's inventory fields.
    ///
    /// # Errors
    ///
    /// Returns error if the remote update fails.
    #[instrument(skip(self), fields(product_id = %id))]
    pub async fn update_stock(
        &self,
        id: ProductId,
        update: StockUpdate,
    ) -> Result<Product, StorefrontError> {
        let invalidations = [
            Invalidation::Key(CacheKey::Products),
            Invalidation::Key(CacheKey::Product(id)),
            Invalidation::Key(CacheKey::SalesStats),
        ];
        Ok(self
            .ctx
            .cache()
            .mutate(
                &invalidations,
                self.ctx.store().update_product_stock(id, &update),
            )
            .await?)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use voltline_core::Price;

    use super::*;
    use crate::auth::SessionSlot;
    use crate::backend::{InMemoryStore, StoreCall};
    use crate::cache::QueryCache;
    use crate::config::CacheConfig;

    fn resource(store: &InMemoryStore) -> ProductsResource {
        let cache = QueryCache::new(&CacheConfig {
            ttl: Duration::from_secs(300),
            capacity: 100,
        });
        ProductsResource::new(DataContext::new(
            Arc::new(store.clone()),
            cache,
            SessionSlot::new(),
        ))
    }

    #[tokio::test]
    async fn test_list_is_cached_until_create() {
        let store = InMemoryStore::new();
        let products = resource(&store);

        assert!(products.list().await.unwrap().is_empty());
        assert!(products.list().await.unwrap().is_empty());
        assert_eq!(store.count(StoreCall::ListProducts), 1);

        let mut new = NewProduct::new(
            "Disjoncteur C60N",
            "Schneider",
            "disjoncteurs",
            Price::from_cents(18990),
        );
        new.features = vec!["63A".into(), " ".into()];
        let created = products.create(new).await.unwrap();
        assert_eq!(created.features, vec!["63A".to_string()]);

        let listed = products.list().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(store.count(StoreCall::ListProducts), 2);
        assert_eq!(products.state().await.data.map(|p| p.len()), Some(1));
    }

    #[tokio::test]
    async fn test_update_stock_refreshes_detail() {
        let store = InMemoryStore::new();
        let products = resource(&store);
        let created = products
            .create(NewProduct::new("Armoire", "Legrand", "armoires", Price::from_cents(74990)))
            .await
            .unwrap();

        let before = products.get(created.id).await.unwrap().unwrap();
        assert_eq!(before.stock_quantity, 0);

        products
            .update_stock(
                created.id,
                StockUpdate {
                    stock_quantity: 3,
                    in_stock: true,
                    low_stock_threshold: Some(2),
                },
            )
            .await
            .unwrap();

        let after = products.get(created.id).await.unwrap().unwrap();
        assert_eq!(after.stock_quantity, 3);
        assert!(!after.is_low_stock());
        assert_eq!(store.count(StoreCall::GetProduct), 2);
    }
}
