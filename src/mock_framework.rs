//! # Mock Framework
//!
//! Test doubles for the collaborators of [`OrderService`](crate::service::OrderService).
//!
//! [`create_mock_catalog`] returns a catalog and a receiver: every `fetch_product` call
//! shows up on the receiver with a responder, so a test decides each answer (success,
//! failure, delay) and can assert which calls were made. The `Failing*` types fail
//! every operation, `SlowAckStore` delays insert acknowledgements, and the
//! `StubCatalog` answers from a fixed table.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use crate::broker::EventPublisher;
use crate::cache::CacheStore;
use crate::clients::Catalog;
use crate::context::RequestContext;
use crate::domain::{NewOrder, Order, OrderStatus, ProductSnapshot};
use crate::error::{CacheError, ProductError, PublishError, StoreError};
use crate::store::OrderStore;

pub type FetchResponder = oneshot::Sender<Result<ProductSnapshot, ProductError>>;

pub struct CatalogCall {
    pub product_id: String,
    pub respond_to: FetchResponder,
}

/// Catalog whose answers are supplied by the test through the paired receiver.
pub struct MockCatalog {
    sender: mpsc::Sender<CatalogCall>,
}

pub fn create_mock_catalog(buffer_size: usize) -> (MockCatalog, mpsc::Receiver<CatalogCall>) {
    let (sender, receiver) = mpsc::channel(buffer_size);
    (MockCatalog { sender }, receiver)
}

/// Waits for the next catalog call.
pub async fn expect_fetch(receiver: &mut mpsc::Receiver<CatalogCall>) -> Option<(String, FetchResponder)> {
    receiver.recv().await.map(|call| (call.product_id, call.respond_to))
}

#[async_trait]
impl Catalog for MockCatalog {
    async fn fetch_product(&self, ctx: &RequestContext, product_id: &str) -> Result<ProductSnapshot, ProductError> {
        let (respond_to, response) = oneshot::channel();
        let call = CatalogCall {
            product_id: product_id.to_string(),
            respond_to,
        };
        let outcome = async {
            if self.sender.send(call).await.is_err() {
                return Err(ProductError::NotFound(product_id.to_string()));
            }
            response
                .await
                .unwrap_or_else(|_| Err(ProductError::NotFound(product_id.to_string())))
        };
        ctx.run(outcome).await?
    }
}

/// Catalog answering from a fixed table of raw JSON bodies; unknown ids are not found.
#[derive(Default)]
pub struct StubCatalog {
    bodies: HashMap<String, String>,
    calls: AtomicUsize,
}

impl StubCatalog {
    pub fn with_product(mut self, product_id: &str, body: &str) -> Self {
        self.bodies.insert(product_id.to_string(), body.to_string());
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Catalog for StubCatalog {
    async fn fetch_product(&self, ctx: &RequestContext, product_id: &str) -> Result<ProductSnapshot, ProductError> {
        ctx.check()?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.bodies.get(product_id) {
            Some(body) => ProductSnapshot::from_json(body.as_bytes()),
            None => Err(ProductError::NotFound(product_id.to_string())),
        }
    }
}

pub struct FailingCache;

#[async_trait]
impl CacheStore for FailingCache {
    async fn get(&self, _ctx: &RequestContext, _key: &str) -> Result<Option<String>, CacheError> {
        Err(CacheError::Unavailable("cache down".into()))
    }

    async fn set(&self, _ctx: &RequestContext, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Err(CacheError::Unavailable("cache down".into()))
    }

    async fn delete(&self, _ctx: &RequestContext, _key: &str) -> Result<bool, CacheError> {
        Err(CacheError::Unavailable("cache down".into()))
    }
}

/// Store that fails every call and counts how many it received.
#[derive(Default)]
pub struct FailingStore {
    calls: AtomicUsize,
}

impl FailingStore {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn fail<T>(&self) -> Result<T, StoreError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(StoreError::Backend("database down".into()))
    }
}

#[async_trait]
impl OrderStore for FailingStore {
    async fn insert(&self, _ctx: &RequestContext, _order: NewOrder) -> Result<Order, StoreError> {
        self.fail()
    }

    async fn get_by_id(&self, _ctx: &RequestContext, _id: Uuid) -> Result<Order, StoreError> {
        self.fail()
    }

    async fn list_all(&self, _ctx: &RequestContext) -> Result<Vec<Order>, StoreError> {
        self.fail()
    }

    async fn list_by_product(&self, _ctx: &RequestContext, _product_id: &str) -> Result<Vec<Order>, StoreError> {
        self.fail()
    }

    async fn update_status(&self, _ctx: &RequestContext, _id: Uuid, _status: OrderStatus) -> Result<Order, StoreError> {
        self.fail()
    }

    async fn delete(&self, _ctx: &RequestContext, _id: Uuid) -> Result<(), StoreError> {
        self.fail()
    }
}

/// Store whose inserts commit through `inner` and then take `delay` to acknowledge.
pub struct SlowAckStore {
    pub inner: Arc<dyn OrderStore>,
    pub delay: Duration,
}

#[async_trait]
impl OrderStore for SlowAckStore {
    async fn insert(&self, ctx: &RequestContext, order: NewOrder) -> Result<Order, StoreError> {
        let order = self.inner.insert(ctx, order).await?;
        tokio::time::sleep(self.delay).await;
        Ok(order)
    }

    async fn get_by_id(&self, ctx: &RequestContext, id: Uuid) -> Result<Order, StoreError> {
        self.inner.get_by_id(ctx, id).await
    }

    async fn list_all(&self, ctx: &RequestContext) -> Result<Vec<Order>, StoreError> {
        self.inner.list_all(ctx).await
    }

    async fn list_by_product(&self, ctx: &RequestContext, product_id: &str) -> Result<Vec<Order>, StoreError> {
        self.inner.list_by_product(ctx, product_id).await
    }

    async fn update_status(&self, ctx: &RequestContext, id: Uuid, status: OrderStatus) -> Result<Order, StoreError> {
        self.inner.update_status(ctx, id, status).await
    }

    async fn delete(&self, ctx: &RequestContext, id: Uuid) -> Result<(), StoreError> {
        self.inner.delete(ctx, id).await
    }
}

/// Publisher that rejects everything and counts attempts.
#[derive(Default)]
pub struct FailingPublisher {
    attempts: AtomicUsize,
}

impl FailingPublisher {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EventPublisher for FailingPublisher {
    async fn publish(
        &self,
        _ctx: &RequestContext,
        _routing_key: &str,
        _content_type: &str,
        _body: Vec<u8>,
    ) -> Result<(), PublishError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(PublishError::Unavailable("broker down".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_catalog() {
        let (catalog, mut calls) = create_mock_catalog(4);

        let task = tokio::spawn(async move { catalog.fetch_product(&RequestContext::new(), "p1").await });

        let (product_id, responder) = expect_fetch(&mut calls).await.expect("Expected catalog fetch");
        assert_eq!(product_id, "p1");
        responder.send(Err(ProductError::Decode("bad".into()))).unwrap();

        assert_eq!(task.await.unwrap(), Err(ProductError::Decode("bad".into())));
    }

    #[tokio::test]
    async fn stub_catalog_counts_calls() {
        let catalog = StubCatalog::default().with_product("p1", r#"{"id":"p1","name":"Lamp","price":"2","qty":1}"#);
        let ctx = RequestContext::new();
        assert!(catalog.fetch_product(&ctx, "p1").await.is_ok());
        assert_eq!(catalog.fetch_product(&ctx, "p2").await, Err(ProductError::NotFound("p2".into())));
        assert_eq!(catalog.calls(), 2);
    }
}
