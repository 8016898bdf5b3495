use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, info_span, instrument, warn, Instrument};
use uuid::Uuid;

use crate::broker::EventNotifier;
use crate::cache::ListCache;
use crate::context::RequestContext;
use crate::domain::{NewOrder, Order, OrderCreated, OrderStatus};
use crate::error::{CacheError, OrderError, StoreError};
use crate::resolver::ProductResolver;
use crate::store::OrderStore;

/// Orchestrates order creation and the order read paths.
///
/// Creation is resolve → validate → insert → respond. Cache invalidation and the
/// `order.created` event run afterwards as detached work with their own timeout;
/// their failures are logged and never reach the caller.
pub struct OrderService {
    resolver: ProductResolver,
    store: Arc<dyn OrderStore>,
    list_cache: ListCache,
    notifier: EventNotifier,
    background_timeout: Duration,
    background: TaskTracker,
}

impl OrderService {
    pub const DEFAULT_BACKGROUND_TIMEOUT: Duration = Duration::from_secs(5);

    pub fn new(
        resolver: ProductResolver,
        store: Arc<dyn OrderStore>,
        list_cache: ListCache,
        notifier: EventNotifier,
        background_timeout: Duration,
    ) -> Self {
        Self {
            resolver,
            store,
            list_cache,
            notifier,
            background_timeout,
            background: TaskTracker::new(),
        }
    }

    /// Places an order for `quantity` units of `product_id` at the catalog's current price.
    ///
    /// The stock check is point-in-time: concurrent orders for the same product can both
    /// pass it against the same `available_qty`.
    ///
    /// Cancellation is honored up to the insert. Once the insert is sent it runs to
    /// completion, so a committed order is always returned and always followed by the
    /// post-commit step.
    #[instrument(skip(self, ctx))]
    pub async fn create_order(&self, ctx: &RequestContext, product_id: &str, quantity: i64) -> Result<Order, OrderError> {
        validate_product_id(product_id)?;
        let requested = validate_quantity(quantity)?;

        let product = self.resolver.resolve(ctx, product_id).await?;

        if requested > product.available_qty {
            warn!(available = product.available_qty, requested, "Insufficient stock");
            return Err(OrderError::InsufficientStock {
                available: product.available_qty,
                requested,
            });
        }

        let total_price = product
            .unit_price
            .checked_mul(Decimal::from(requested))
            .ok_or_else(|| {
                warn!(unit_price = %product.unit_price, requested, "Order total overflows");
                OrderError::InvalidPrice {
                    product_id: product_id.to_string(),
                    price: product.unit_price.to_string(),
                }
            })?;

        ctx.check()?;
        let new_order = NewOrder {
            id: Uuid::new_v4(),
            product_id: product_id.to_string(),
            quantity: requested,
            total_price,
            status: OrderStatus::Created,
        };
        let order = self.store.insert(ctx, new_order).await.map_err(|e| match e {
            StoreError::Canceled => OrderError::Canceled,
            other => {
                error!(error = %other, "Failed to insert order");
                OrderError::Persistence(other.to_string())
            }
        })?;

        info!(order_id = %order.id, total_price = %order.total_price, "Order created");
        self.after_commit(&order, Some(OrderCreated::from(&order)));
        Ok(order)
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_order_by_id(&self, ctx: &RequestContext, id: &str) -> Result<Order, OrderError> {
        let id = parse_order_id(id)?;
        Ok(self.store.get_by_id(ctx, id).await?)
    }

    /// Orders for `product_id`, newest first. Served from the list cache when present;
    /// otherwise read from the store and cached in the background.
    #[instrument(skip(self, ctx))]
    pub async fn get_orders_by_product_id(&self, ctx: &RequestContext, product_id: &str) -> Result<Vec<Order>, OrderError> {
        validate_product_id(product_id)?;

        match self.list_cache.get(ctx, product_id).await {
            Ok(Some(orders)) => return Ok(orders),
            Ok(None) => debug!("Order list cache miss"),
            Err(CacheError::Canceled) => return Err(OrderError::Canceled),
            Err(e) => warn!(error = %e, "Order list cache unavailable, reading from store"),
        }

        let orders = self.store.list_by_product(ctx, product_id).await?;
        self.populate_list_cache(product_id, orders.clone());
        Ok(orders)
    }

    #[instrument(skip(self, ctx))]
    pub async fn get_all_orders(&self, ctx: &RequestContext) -> Result<Vec<Order>, OrderError> {
        Ok(self.store.list_all(ctx).await?)
    }

    /// Sets the order status. Repeating the current status returns the order unchanged.
    #[instrument(skip(self, ctx))]
    pub async fn update_order(&self, ctx: &RequestContext, id: &str, status: &str) -> Result<Order, OrderError> {
        let id = parse_order_id(id)?;
        let status: OrderStatus = status.parse().map_err(OrderError::InvalidInput)?;

        let order = self.store.update_status(ctx, id, status).await?;
        info!(order_id = %order.id, status = %order.status, "Order status updated");
        self.after_commit(&order, None);
        Ok(order)
    }

    /// Deletes an order.
    ///
    /// # Errors
    /// [`OrderError::NotFound`] when the order does not exist, including on a repeated delete.
    #[instrument(skip(self, ctx))]
    pub async fn delete_order(&self, ctx: &RequestContext, id: &str) -> Result<(), OrderError> {
        let id = parse_order_id(id)?;
        let order = self.store.get_by_id(ctx, id).await?;
        self.store.delete(ctx, id).await?;
        info!(order_id = %id, "Order deleted");
        self.after_commit(&order, None);
        Ok(())
    }

    /// Waits for detached work spawned so far. New work may still be spawned afterwards.
    pub async fn flush_background(&self) {
        self.background.close();
        self.background.wait().await;
        self.background.reopen();
    }

    /// Stops accepting detached work and waits for what is in flight.
    pub async fn shutdown(&self) {
        self.background.close();
        self.background.wait().await;
    }

    /// Detached post-commit step: drop the product's order listing, then publish `event`.
    /// Runs under a fresh context; the caller's cancellation no longer applies.
    fn after_commit(&self, order: &Order, event: Option<OrderCreated>) {
        let list_cache = self.list_cache.clone();
        let notifier = self.notifier.clone();
        let timeout = self.background_timeout;
        let order_id = order.id;
        let product_id = order.product_id.clone();
        let span = info_span!("order_post_commit", order_id = %order_id, product_id = %product_id);

        self.background.spawn(
            async move {
                let ctx = RequestContext::with_timeout(timeout);
                if let Err(e) = list_cache.invalidate(&ctx, &product_id).await {
                    warn!(%order_id, %product_id, error = %e, "Failed to invalidate order list cache");
                }
                if let Some(event) = event {
                    if let Err(e) = notifier.order_created(&ctx, &event).await {
                        error!(%order_id, %product_id, error = %e, "Failed to publish order.created event");
                    }
                }
            }
            .instrument(span),
        );
    }

    fn populate_list_cache(&self, product_id: &str, orders: Vec<Order>) {
        let list_cache = self.list_cache.clone();
        let timeout = self.background_timeout;
        let product_id = product_id.to_string();
        let span = info_span!("order_list_populate", product_id = %product_id);

        self.background.spawn(
            async move {
                let ctx = RequestContext::with_timeout(timeout);
                if let Err(e) = list_cache.put(&ctx, &product_id, &orders).await {
                    warn!(%product_id, error = %e, "Failed to populate order list cache");
                }
            }
            .instrument(span),
        );
    }
}

fn validate_product_id(product_id: &str) -> Result<(), OrderError> {
    let well_formed = !product_id.is_empty()
        && product_id.len() <= 128
        && product_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | ':'));
    if well_formed {
        Ok(())
    } else {
        Err(OrderError::InvalidInput(format!("malformed product id: {product_id:?}")))
    }
}

fn validate_quantity(quantity: i64) -> Result<u32, OrderError> {
    match u32::try_from(quantity) {
        Ok(q) if q > 0 => Ok(q),
        _ => Err(OrderError::InvalidQuantity(quantity)),
    }
}

fn parse_order_id(id: &str) -> Result<Uuid, OrderError> {
    Uuid::parse_str(id.trim()).map_err(|_| OrderError::InvalidInput(format!("malformed order id: {id:?}")))
}
