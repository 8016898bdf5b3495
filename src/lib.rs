//! Order management core: product resolution, order persistence, list caching
//! and order events, wired together by [`OrderSystem`].
//!
//! A routing layer holds an [`OrderSystem`], takes a [`RequestContext`] per request
//! from [`OrderSystem::request_context`], calls the [`OrderService`] operations and
//! maps failures with [`OrderError::status_code`].

#[macro_use]
pub mod clients;

pub mod app_system;
pub mod broker;
pub mod cache;
pub mod config;
pub mod context;
pub mod domain;
pub mod error;
pub mod messages;
pub mod resolver;
pub mod service;
pub mod store;

#[cfg(test)]
mod mock_framework;

pub use app_system::order_system::SystemSettings;
pub use app_system::{setup_tracing, OrderSystem};
pub use config::Config;
pub use context::RequestContext;
pub use domain::{Order, OrderStatus};
pub use error::OrderError;
pub use service::OrderService;
