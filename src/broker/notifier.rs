use std::sync::Arc;

use tracing::{debug, instrument};

use super::{EventPublisher, CONTENT_TYPE_JSON};
use crate::context::RequestContext;
use crate::domain::OrderCreated;
use crate::error::PublishError;

/// Publishes order domain events. At most once: no retries, no acknowledgement wait.
#[derive(Clone)]
pub struct EventNotifier {
    publisher: Arc<dyn EventPublisher>,
}

impl EventNotifier {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// Serializes `payload` as JSON and publishes it under `topic`.
    pub async fn publish<T: serde::Serialize + Sync>(
        &self,
        ctx: &RequestContext,
        topic: &str,
        payload: &T,
    ) -> Result<(), PublishError> {
        let body = serde_json::to_vec(payload).map_err(|e| PublishError::Encode(e.to_string()))?;
        self.publisher.publish(ctx, topic, CONTENT_TYPE_JSON, body).await
    }

    #[instrument(skip(self, ctx, event), fields(order_id = %event.order_id, product_id = %event.product_id))]
    pub async fn order_created(&self, ctx: &RequestContext, event: &OrderCreated) -> Result<(), PublishError> {
        self.publish(ctx, OrderCreated::ROUTING_KEY, event).await?;
        debug!("order.created published");
        Ok(())
    }
}
