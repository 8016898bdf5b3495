//! Durable order storage.
//!
//! [`OrderStore`] is the single persistence seam. [`PgOrderStore`] is the Postgres
//! adapter; [`OrderStoreActor`] keeps orders in process for local runs and tests.

pub mod actor;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::context::RequestContext;
use crate::domain::{NewOrder, Order, OrderStatus};
use crate::error::StoreError;

pub use actor::{OrderStoreActor, OrderStoreClient};
pub use postgres::{PgOrderStore, PostgresConfig};

/// Reads race the caller's [`RequestContext`]. Writes only check it before they are
/// issued: once sent, a write completes so the caller never sees `Canceled` for a
/// committed change.
#[async_trait]
pub trait OrderStore: Send + Sync {
    /// Persists a new order; the store stamps `created_at`/`updated_at`.
    async fn insert(&self, ctx: &RequestContext, order: NewOrder) -> Result<Order, StoreError>;

    /// # Errors
    /// [`StoreError::NotFound`] when no order has this id.
    async fn get_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<Order, StoreError>;

    /// All orders, most recent first.
    async fn list_all(&self, ctx: &RequestContext) -> Result<Vec<Order>, StoreError>;

    /// Orders for one product, most recent first.
    async fn list_by_product(&self, ctx: &RequestContext, product_id: &str) -> Result<Vec<Order>, StoreError>;

    /// Sets the status and bumps `updated_at`. Setting the current status is a no-op
    /// that returns the stored order unchanged.
    async fn update_status(&self, ctx: &RequestContext, id: Uuid, status: OrderStatus) -> Result<Order, StoreError>;

    /// # Errors
    /// [`StoreError::NotFound`] when no order has this id; deletes are not idempotent.
    async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError>;
}
