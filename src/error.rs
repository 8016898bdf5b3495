use http::StatusCode;
use thiserror::Error;

use crate::context::Canceled;

/// Errors raised while resolving a product from the cache or the catalog.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ProductError {
    #[error("Product not found: {0}")]
    NotFound(String),
    #[error("Failed to decode product data: {0}")]
    Decode(String),
    #[error("Invalid product price {price:?} for product {product_id}")]
    InvalidPrice { product_id: String, price: String },
    #[error("Product lookup canceled")]
    Canceled,
}

/// Errors that can occur inside an order store adapter.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum StoreError {
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Store operation canceled")]
    Canceled,
    #[error("Order database error: {0}")]
    Backend(String),
    #[error("Store actor unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum CacheError {
    #[error("Cache operation canceled")]
    Canceled,
    #[error("Cache encoding error: {0}")]
    Encode(String),
    #[error("Cache actor unavailable: {0}")]
    Unavailable(String),
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum PublishError {
    #[error("Publish canceled")]
    Canceled,
    #[error("Event encoding error: {0}")]
    Encode(String),
    #[error("Broker unavailable: {0}")]
    Unavailable(String),
}

/// Errors returned across the service boundary.
///
/// The routing layer maps these to transport responses with [`OrderError::status_code`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum OrderError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(i64),
    #[error("Product not found: {0}")]
    ProductNotFound(String),
    #[error("Failed to decode product data: {0}")]
    ProductDecode(String),
    #[error("Invalid product price {price:?} for product {product_id}")]
    InvalidPrice { product_id: String, price: String },
    #[error("Insufficient stock: available {available}, requested {requested}")]
    InsufficientStock { available: u32, requested: u32 },
    #[error("Order persistence error: {0}")]
    Persistence(String),
    #[error("Order not found: {0}")]
    NotFound(String),
    #[error("Operation canceled")]
    Canceled,
}

impl OrderError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            OrderError::InvalidInput(_) | OrderError::InvalidQuantity(_) => StatusCode::BAD_REQUEST,
            OrderError::ProductNotFound(_) | OrderError::NotFound(_) => StatusCode::NOT_FOUND,
            OrderError::ProductDecode(_) | OrderError::InvalidPrice { .. } => StatusCode::BAD_GATEWAY,
            OrderError::InsufficientStock { .. } => StatusCode::CONFLICT,
            OrderError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            OrderError::Canceled => StatusCode::REQUEST_TIMEOUT,
        }
    }
}

impl From<ProductError> for OrderError {
    fn from(err: ProductError) -> Self {
        match err {
            ProductError::NotFound(id) => OrderError::ProductNotFound(id),
            ProductError::Decode(detail) => OrderError::ProductDecode(detail),
            ProductError::InvalidPrice { product_id, price } => {
                OrderError::InvalidPrice { product_id, price }
            }
            ProductError::Canceled => OrderError::Canceled,
        }
    }
}

impl From<StoreError> for OrderError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(id) => OrderError::NotFound(id),
            StoreError::Canceled => OrderError::Canceled,
            StoreError::Backend(detail) | StoreError::Unavailable(detail) => {
                OrderError::Persistence(detail)
            }
        }
    }
}

impl From<Canceled> for ProductError {
    fn from(_: Canceled) -> Self {
        ProductError::Canceled
    }
}

impl From<Canceled> for StoreError {
    fn from(_: Canceled) -> Self {
        StoreError::Canceled
    }
}

impl From<Canceled> for CacheError {
    fn from(_: Canceled) -> Self {
        CacheError::Canceled
    }
}

impl From<Canceled> for PublishError {
    fn from(_: Canceled) -> Self {
        PublishError::Canceled
    }
}

impl From<Canceled> for OrderError {
    fn from(_: Canceled) -> Self {
        OrderError::Canceled
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value: {value:?}")]
    Invalid { name: &'static str, value: String },
}
