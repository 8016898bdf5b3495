//! Clients for the actors and services this one talks to.

#[macro_use]
mod macros;
pub mod catalog_client;

pub use catalog_client::{Catalog, HttpCatalog};
