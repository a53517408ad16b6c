//! HTTP product catalog.

use std::time::Duration;

use async_trait::async_trait;
use domain::ProductId;
use reqwest::{StatusCode, Url, header};

use crate::catalog::{CatalogError, ProductCatalog, ProductSnapshot};

/// Fetches products from `GET {base}/api/v1/products/{id}`.
///
/// 404 means the product does not exist; any other non-200 status is an error.
#[derive(Debug, Clone)]
pub struct HttpProductCatalog {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpProductCatalog {
    /// Creates a catalog client whose requests give up after `timeout`.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, CatalogError> {
        let base_url = Url::parse(base_url).map_err(|e| CatalogError::InvalidUrl(e.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(CatalogError::InvalidUrl(base_url.to_string()));
        }
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("checkout-service/1.0")
            .build()
            .map_err(|e| CatalogError::Transport(e.to_string()))?;
        Ok(Self { client, base_url })
    }

    fn product_url(&self, product_id: &ProductId) -> Result<Url, CatalogError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CatalogError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(["api", "v1", "products", product_id.as_str()]);
        Ok(url)
    }
}

fn transport_error(error: reqwest::Error) -> CatalogError {
    if error.is_timeout() {
        CatalogError::Timeout
    } else {
        CatalogError::Transport(error.to_string())
    }
}

#[async_trait]
impl ProductCatalog for HttpProductCatalog {
    async fn get_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductSnapshot>, CatalogError> {
        let url = self.product_url(product_id)?;
        let response = self
            .client
            .get(url)
            .header(header::ACCEPT, "application/json")
            .send()
            .await
            .map_err(transport_error)?;

        match response.status() {
            StatusCode::OK => response
                .json::<ProductSnapshot>()
                .await
                .map(Some)
                .map_err(|e| CatalogError::Decode(e.to_string())),
            StatusCode::NOT_FOUND => {
                tracing::warn!(product_id = %product_id, "product not found");
                Ok(None)
            }
            status => Err(CatalogError::Status(status.as_u16())),
        }
    }
}
