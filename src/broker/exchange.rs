use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::{debug, instrument, warn};

use super::EventPublisher;
use crate::context::RequestContext;
use crate::error::PublishError;

/// A message routed to a subscriber.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub exchange: String,
    pub routing_key: String,
    pub content_type: String,
    pub body: Vec<u8>,
}

struct Binding {
    pattern: Vec<String>,
    sender: mpsc::UnboundedSender<Delivery>,
}

/// In-process topic exchange with AMQP binding semantics:
/// `*` matches exactly one dot-separated word, `#` matches zero or more.
///
/// Messages matching no binding are dropped.
#[derive(Clone)]
pub struct TopicExchange {
    name: String,
    bindings: Arc<RwLock<Vec<Binding>>>,
}

/// Receiving end of a binding. Dropping it removes the binding on the next publish.
pub struct Subscription {
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

impl Subscription {
    pub async fn recv(&mut self) -> Option<Delivery> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<Delivery> {
        self.receiver.try_recv().ok()
    }
}

impl TopicExchange {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bindings: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn bind(&self, pattern: &str) -> Subscription {
        let (sender, receiver) = mpsc::unbounded_channel();
        let binding = Binding {
            pattern: pattern.split('.').map(str::to_string).collect(),
            sender,
        };
        match self.bindings.write() {
            Ok(mut bindings) => bindings.push(binding),
            Err(poisoned) => poisoned.into_inner().push(binding),
        }
        debug!(exchange = %self.name, pattern, "Queue bound");
        Subscription { receiver }
    }

    /// Routes to every matching binding and returns how many received the message.
    fn route(&self, delivery: Delivery) -> usize {
        let key: Vec<&str> = delivery.routing_key.split('.').collect();
        let mut bindings = match self.bindings.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        bindings.retain(|b| !b.sender.is_closed());

        let mut delivered = 0;
        for binding in bindings.iter().filter(|b| topic_matches(&b.pattern, &key)) {
            if binding.sender.send(delivery.clone()).is_ok() {
                delivered += 1;
            }
        }
        delivered
    }
}

fn topic_matches(pattern: &[String], key: &[&str]) -> bool {
    match pattern.split_first() {
        None => key.is_empty(),
        Some((word, rest)) if word == "#" => {
            (0..=key.len()).any(|skip| topic_matches(rest, &key[skip..]))
        }
        Some((word, rest)) => match key.split_first() {
            Some((head, tail)) => (word == "*" || word == head) && topic_matches(rest, tail),
            None => false,
        },
    }
}

#[async_trait]
impl EventPublisher for TopicExchange {
    #[instrument(name = "exchange.publish", skip(self, ctx, body), fields(exchange = %self.name))]
    async fn publish(
        &self,
        ctx: &RequestContext,
        routing_key: &str,
        content_type: &str,
        body: Vec<u8>,
    ) -> Result<(), PublishError> {
        ctx.check()?;
        let delivered = self.route(Delivery {
            exchange: self.name.clone(),
            routing_key: routing_key.to_string(),
            content_type: content_type.to_string(),
            body,
        });
        if delivered == 0 {
            warn!("Message unroutable, dropped");
        } else {
            debug!(delivered, "Message routed");
        }
        Ok(())
    }
}
