//! Analytics events and back-office sales figures.

use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::DataContext;
use crate::backend::BackendError;
use crate::cache::{CacheKey, Invalidation, Resource};
use crate::error::StorefrontError;
use crate::models::{AnalyticsEvent, DateRange, NewAnalyticsEvent, SalesStats};

/// Analytics accessor, event writes and the sales summary.
#[derive(Clone)]
pub struct AnalyticsResource {
    ctx: DataContext,
}

impl AnalyticsResource {
    #[must_use]
    pub const fn new(ctx: DataContext) -> Self {
        Self { ctx }
    }

    /// Events in `range` (all of them for `None`), newest first.
    ///
    /// # Errors
    ///
    /// Returns error if the remote read fails.
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        range: Option<DateRange>,
    ) -> Result<Vec<AnalyticsEvent>, StorefrontError> {
        let store = self.ctx.store();
        Ok(self
            .ctx
            .cache()
            .fetch(CacheKey::Analytics(range), store.list_analytics_events(range))
            .await?)
    }

    /// Append an event and wait for the write.
    ///
    /// # Errors
    ///
    /// Returns error if the remote insert fails.
    #[instrument(skip(self, event), fields(event_type = %event.event_type))]
    pub async fn track(
        &self,
        event: NewAnalyticsEvent,
    ) -> Result<AnalyticsEvent, StorefrontError> {
        let invalidations = [Invalidation::Resource(Resource::Analytics)];
        Ok(self
            .ctx
            .cache()
            .mutate(
                &invalidations,
                self.ctx.store().insert_analytics_event(&event),
            )
            .await?)
    }

    /// Append an event in the background.
    ///
    /// Best-effort and at most once: the caller does not wait, and a failed
    /// insert is logged and dropped. The handle is only for callers that want
    /// to observe completion; dropping it does not cancel the write.
    pub fn emit(&self, event: NewAnalyticsEvent) -> JoinHandle<()> {
        let store = self.ctx.store_handle();
        let cache = self.ctx.cache().clone();
        tokio::spawn(async move {
            match store.insert_analytics_event(&event).await {
                Ok(row) => {
                    debug!(
                        event_id = %row.id,
                        event_type = %row.event_type,
                        "Analytics event stored"
                    );
                    cache
                        .invalidate(&[Invalidation::Resource(Resource::Analytics)])
                        .await;
                }
                Err(err) => {
                    warn!(
                        event_type = %event.event_type,
                        error = %err,
                        "Analytics event dropped"
                    );
                }
            }
        })
    }

    /// Dashboard figures over every order and product.
    ///
    /// # Errors
    ///
    /// Returns error if either remote read fails.
    #[instrument(skip(self))]
    pub async fn sales_stats(&self) -> Result<SalesStats, StorefrontError> {
        let store = self.ctx.store();
        let fetch = async {
            let (orders, products) =
                tokio::try_join!(store.list_orders(None), store.list_products())?;
            Ok::<_, BackendError>(SalesStats::compute(&orders, &products))
        };
        Ok(self.ctx.cache().fetch(CacheKey::SalesStats, fetch).await?)
    }
}
