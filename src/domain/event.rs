use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Order;

/// Published on `order.created` once an order is durably stored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderCreated {
    pub order_id: Uuid,
    pub product_id: String,
    pub qty: u32,
}

impl OrderCreated {
    pub const ROUTING_KEY: &'static str = "order.created";
}

impl From<&Order> for OrderCreated {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.id,
            product_id: order.product_id.clone(),
            qty: order.quantity,
        }
    }
}
