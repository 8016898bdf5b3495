use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument, warn};

use crate::context::RequestContext;
use crate::domain::ProductSnapshot;
use crate::error::ProductError;

/// The authoritative product catalog.
#[async_trait]
pub trait Catalog: Send + Sync {
    async fn fetch_product(&self, ctx: &RequestContext, product_id: &str) -> Result<ProductSnapshot, ProductError>;
}

/// Catalog reached over HTTP at `GET {base_url}/products/{id}`.
#[derive(Clone)]
pub struct HttpCatalog {
    client: reqwest::Client,
    base_url: String,
}

impl HttpCatalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    fn product_url(&self, product_id: &str) -> String {
        format!("{}/products/{}", self.base_url, product_id)
    }
}

#[async_trait]
impl Catalog for HttpCatalog {
    #[instrument(skip(self, ctx))]
    async fn fetch_product(&self, ctx: &RequestContext, product_id: &str) -> Result<ProductSnapshot, ProductError> {
        let url = self.product_url(product_id);
        debug!(%url, "Fetching product from catalog");

        let response = match ctx.run(self.client.get(&url).send()).await? {
            Ok(resp) => resp,
            Err(e) => {
                warn!(error = %e, "Catalog request failed");
                return Err(ProductError::NotFound(product_id.to_string()));
            }
        };

        if !response.status().is_success() {
            warn!(status = %response.status(), "Catalog returned non-success status");
            return Err(ProductError::NotFound(product_id.to_string()));
        }

        let body = ctx
            .run(response.bytes())
            .await?
            .map_err(|e| ProductError::Decode(e.to_string()))?;

        ProductSnapshot::from_json(&body)
    }
}
