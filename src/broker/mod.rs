//! Topic-style event publication.

pub mod exchange;
pub mod notifier;

use async_trait::async_trait;

use crate::context::RequestContext;
use crate::error::PublishError;

pub use exchange::{Delivery, Subscription, TopicExchange};
pub use notifier::EventNotifier;

pub const EVENTS_EXCHANGE: &str = "events";
pub const CONTENT_TYPE_JSON: &str = "application/json";

/// Fire-and-forget publisher. A successful return means the broker accepted the
/// message, not that any consumer received it.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(
        &self,
        ctx: &RequestContext,
        routing_key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), PublishError>;
}
