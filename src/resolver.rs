use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, instrument, warn};

use crate::cache::{product_key, CacheStore};
use crate::clients::Catalog;
use crate::context::RequestContext;
use crate::domain::ProductSnapshot;
use crate::error::{CacheError, ProductError};

/// Cache-aside product lookup: `product:{id}` first, the catalog on a miss.
#[derive(Clone)]
pub struct ProductResolver {
    cache: Arc<dyn CacheStore>,
    catalog: Arc<dyn Catalog>,
    ttl: Duration,
}

impl ProductResolver {
    pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

    pub fn new(cache: Arc<dyn CacheStore>, catalog: Arc<dyn Catalog>, ttl: Duration) -> Self {
        Self { cache, catalog, ttl }
    }

    /// # Errors
    /// - [`ProductError::NotFound`] when the catalog is unreachable or answers non-2xx
    /// - [`ProductError::Decode`] for a malformed catalog body
    /// - [`ProductError::InvalidPrice`] when the catalog price is not numeric
    /// - [`ProductError::Canceled`] when `ctx` is canceled
    #[instrument(skip(self, ctx))]
    pub async fn resolve(&self, ctx: &RequestContext, product_id: &str) -> Result<ProductSnapshot, ProductError> {
        let key = product_key(product_id);

        if let Some(product) = self.cached(ctx, &key).await? {
            debug!("Product cache hit");
            return Ok(product);
        }

        let product = self.catalog.fetch_product(ctx, product_id).await?;
        debug!(name = %product.name, "Product fetched from catalog");

        if let Err(e) = self.cache.set(ctx, &key, product.to_json(), self.ttl).await {
            warn!(error = %e, "Failed to cache product snapshot");
        }
        Ok(product)
    }

    /// Cache read errors and undecodable entries both fall through to the catalog;
    /// only cancellation is surfaced.
    async fn cached(&self, ctx: &RequestContext, key: &str) -> Result<Option<ProductSnapshot>, ProductError> {
        let raw = match self.cache.get(ctx, key).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(CacheError::Canceled) => return Err(ProductError::Canceled),
            Err(e) => {
                warn!(error = %e, "Product cache unavailable, falling back to catalog");
                return Ok(None);
            }
        };
        match ProductSnapshot::from_json(raw.as_bytes()) {
            Ok(product) => Ok(Some(product)),
            Err(e) => {
                warn!(error = %e, "Discarding undecodable product cache entry");
                Ok(None)
            }
        }
    }
}
