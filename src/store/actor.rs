use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::OrderStore;
use crate::context::RequestContext;
use crate::domain::{NewOrder, Order, OrderStatus};
use crate::error::StoreError;
use crate::messages::{ServiceResponse, StoreRequest};

struct StoredOrder {
    seq: u64,
    order: Order,
}

/// In-process order store. Owns the order map and serves [`StoreRequest`]s one at a time.
pub struct OrderStoreActor {
    receiver: mpsc::Receiver<StoreRequest>,
    orders: HashMap<Uuid, StoredOrder>,
    next_seq: u64,
}

impl OrderStoreActor {
    pub fn new(buffer_size: usize) -> (Self, OrderStoreClient) {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let actor = Self {
            receiver,
            orders: HashMap::new(),
            next_seq: 0,
        };
        (actor, OrderStoreClient::new(sender))
    }

    #[instrument(name = "order_store", skip(self))]
    pub async fn run(mut self) {
        info!("OrderStore starting");
        while let Some(msg) = self.receiver.recv().await {
            match msg {
                StoreRequest::Insert { order, respond_to } => self.handle_insert(order, respond_to),
                StoreRequest::GetById { id, respond_to } => {
                    let _ = respond_to.send(self.find(id).cloned());
                }
                StoreRequest::ListAll { respond_to } => {
                    let _ = respond_to.send(Ok(self.newest_first(|_| true)));
                }
                StoreRequest::ListByProduct { product_id, respond_to } => {
                    let orders = self.newest_first(|o| o.product_id == product_id);
                    let _ = respond_to.send(Ok(orders));
                }
                StoreRequest::UpdateStatus { id, status, respond_to } => {
                    self.handle_update_status(id, status, respond_to)
                }
                StoreRequest::Delete { id, respond_to } => {
                    let result = match self.orders.remove(&id) {
                        Some(_) => Ok(()),
                        None => Err(StoreError::NotFound(id.to_string())),
                    };
                    let _ = respond_to.send(result);
                }
            }
        }
        info!("OrderStore stopped");
    }

    fn find(&self, id: Uuid) -> Result<&Order, StoreError> {
        self.orders
            .get(&id)
            .map(|stored| &stored.order)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    fn newest_first(&self, keep: impl Fn(&Order) -> bool) -> Vec<Order> {
        let mut matching: Vec<&StoredOrder> = self.orders.values().filter(|s| keep(&s.order)).collect();
        matching.sort_by(|a, b| {
            b.order
                .created_at
                .cmp(&a.order.created_at)
                .then_with(|| b.seq.cmp(&a.seq))
        });
        matching.into_iter().map(|s| s.order.clone()).collect()
    }

    #[instrument(fields(order_id = %order.id, product_id = %order.product_id), skip(self, order, respond_to))]
    fn handle_insert(&mut self, order: NewOrder, respond_to: ServiceResponse<Order, StoreError>) {
        if self.orders.contains_key(&order.id) {
            let _ = respond_to.send(Err(StoreError::Backend(format!("duplicate order id {}", order.id))));
            return;
        }
        let order = order.into_order(Utc::now());
        self.next_seq += 1;
        self.orders.insert(
            order.id,
            StoredOrder {
                seq: self.next_seq,
                order: order.clone(),
            },
        );
        debug!("Order stored");
        let _ = respond_to.send(Ok(order));
    }

    #[instrument(fields(order_id = %id, status = %status), skip(self, respond_to))]
    fn handle_update_status(&mut self, id: Uuid, status: OrderStatus, respond_to: ServiceResponse<Order, StoreError>) {
        let result = match self.orders.get_mut(&id) {
            Some(stored) if stored.order.status == status => Ok(stored.order.clone()),
            Some(stored) => {
                stored.order.status = status;
                stored.order.updated_at = Utc::now();
                Ok(stored.order.clone())
            }
            None => Err(StoreError::NotFound(id.to_string())),
        };
        let _ = respond_to.send(result);
    }
}

/// Handle to an [`OrderStoreActor`].
#[derive(Clone)]
pub struct OrderStoreClient {
    sender: mpsc::Sender<StoreRequest>,
}

impl OrderStoreClient {
    pub fn new(sender: mpsc::Sender<StoreRequest>) -> Self {
        Self { sender }
    }
}

client_method!(OrderStoreClient => fn insert_order(order: NewOrder) -> Order as StoreRequest::Insert, Error = StoreError);
client_method!(OrderStoreClient => fn get_order(id: Uuid) -> Order as StoreRequest::GetById, Error = StoreError);
client_method!(OrderStoreClient => fn list_orders() -> Vec<Order> as StoreRequest::ListAll, Error = StoreError);
client_method!(OrderStoreClient => fn list_orders_by_product(product_id: String) -> Vec<Order> as StoreRequest::ListByProduct, Error = StoreError);
client_method!(OrderStoreClient => fn update_order_status(id: Uuid, status: OrderStatus) -> Order as StoreRequest::UpdateStatus, Error = StoreError);
client_method!(OrderStoreClient => fn delete_order(id: Uuid) -> () as StoreRequest::Delete, Error = StoreError);

#[async_trait]
impl OrderStore for OrderStoreClient {
    async fn insert(&self, ctx: &RequestContext, order: NewOrder) -> Result<Order, StoreError> {
        ctx.check()?;
        self.insert_order(order).await
    }

    async fn get_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<Order, StoreError> {
        ctx.run(self.get_order(id)).await?
    }

    async fn list_all(&self, ctx: &RequestContext) -> Result<Vec<Order>, StoreError> {
        ctx.run(self.list_orders()).await?
    }

    async fn list_by_product(&self, ctx: &RequestContext, product_id: &str) -> Result<Vec<Order>, StoreError> {
        ctx.run(self.list_orders_by_product(product_id.to_string())).await?
    }

    async fn update_status(&self, ctx: &RequestContext, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        ctx.check()?;
        self.update_order_status(id, status).await
    }

    async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        ctx.check()?;
        self.delete_order(id).await
    }
}
