//! Disposable projections: cached product snapshots and per-product order listings.
//! Losing an entry only costs a rebuild from the authoritative source.

pub mod actor;
pub mod list_cache;

use std::time::Duration;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::CacheError;

pub use actor::{CacheActor, CacheClient};
pub use list_cache::ListCache;

/// Key/value store with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// `Ok(None)` on a miss or an expired entry.
    async fn get(&self, ctx: &RequestContext, key: &str) -> Result<Option<String>, CacheError>;

    async fn set(&self, ctx: &RequestContext, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Returns whether a live entry was removed.
    async fn delete(&self, ctx: &RequestContext, key: &str) -> Result<bool, CacheError>;
}

pub fn product_key(product_id: &str) -> String {
    format!("product:{product_id}")
}

pub fn orders_by_product_key(product_id: &str) -> String {
    format!("orders:product:{product_id}")
}
