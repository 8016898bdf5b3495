use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use super::{orders_by_product_key, CacheStore};
use crate::context::RequestContext;
use crate::domain::Order;
use crate::error::CacheError;

/// Derived view of "all orders for a product, newest first".
///
/// Entries are deleted, never patched, when an order for the product is created.
#[derive(Clone)]
pub struct ListCache {
    cache: Arc<dyn CacheStore>,
    ttl: Duration,
}

impl ListCache {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

    pub fn new(cache: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }

    /// Returns the cached listing, or `None` on a miss. An undecodable entry counts as a miss.
    #[instrument(skip(self, ctx))]
    pub async fn get(&self, ctx: &RequestContext, product_id: &str) -> Result<Option<Vec<Order>>, CacheError> {
        let Some(raw) = self.cache.get(ctx, &orders_by_product_key(product_id)).await? else {
            return Ok(None);
        };
        match serde_json::from_str::<Vec<Order>>(&raw) {
            Ok(orders) => {
                debug!(count = orders.len(), "Order list cache hit");
                Ok(Some(orders))
            }
            Err(e) => {
                warn!(error = %e, "Discarding undecodable order list cache entry");
                Ok(None)
            }
        }
    }

    #[instrument(skip(self, ctx, orders), fields(count = orders.len()))]
    pub async fn put(&self, ctx: &RequestContext, product_id: &str, orders: &[Order]) -> Result<(), CacheError> {
        let raw = serde_json::to_string(orders).map_err(|e| CacheError::Encode(e.to_string()))?;
        self.cache
            .set(ctx, &orders_by_product_key(product_id), raw, self.ttl)
            .await
    }

    #[instrument(skip(self, ctx))]
    pub async fn invalidate(&self, ctx: &RequestContext, product_id: &str) -> Result<(), CacheError> {
        let removed = self.cache.delete(ctx, &orders_by_product_key(product_id)).await?;
        debug!(removed, "Order list cache invalidated");
        Ok(())
    }
}
