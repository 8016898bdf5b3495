use std::time::Duration;

use tokio::sync::oneshot;
use uuid::Uuid;

use crate::domain::{NewOrder, Order, OrderStatus};
use crate::error::{CacheError, StoreError};

/// Generic type aliases for actor communication
pub type ServiceResult<T, E> = std::result::Result<T, E>;
pub type ServiceResponse<T, E> = oneshot::Sender<ServiceResult<T, E>>;

/// Typed message enums for actor communication. Each variant includes parameters
/// and a oneshot channel for responses.

#[derive(Debug)]
pub enum StoreRequest {
    Insert {
        order: NewOrder,
        respond_to: ServiceResponse<Order, StoreError>,
    },
    GetById {
        id: Uuid,
        respond_to: ServiceResponse<Order, StoreError>,
    },
    ListAll {
        respond_to: ServiceResponse<Vec<Order>, StoreError>,
    },
    ListByProduct {
        product_id: String,
        respond_to: ServiceResponse<Vec<Order>, StoreError>,
    },
    UpdateStatus {
        id: Uuid,
        status: OrderStatus,
        respond_to: ServiceResponse<Order, StoreError>,
    },
    Delete {
        id: Uuid,
        respond_to: ServiceResponse<(), StoreError>,
    },
}

#[derive(Debug)]
pub enum CacheRequest {
    Get {
        key: String,
        respond_to: ServiceResponse<Option<String>, CacheError>,
    },
    Set {
        key: String,
        value: String,
        ttl: Duration,
        respond_to: ServiceResponse<(), CacheError>,
    },
    Delete {
        key: String,
        respond_to: ServiceResponse<bool, CacheError>,
    },
    #[cfg(test)]
    Len {
        respond_to: ServiceResponse<usize, CacheError>,
    },
}
