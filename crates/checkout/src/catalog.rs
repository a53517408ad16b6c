//! Product catalog contract and in-memory catalog.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use async_trait::async_trait;
use common::ContextError;
use domain::{Money, ProductId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The product service's view of a product at validation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    pub product_id: ProductId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub price: f64,
    #[serde(default)]
    pub category: String,
    #[serde(default, alias = "inventoryCount")]
    pub stock_count: u32,
}

impl ProductSnapshot {
    /// Returns the price in cents.
    pub fn unit_price(&self) -> Money {
        Money::from_decimal(self.price)
    }
}

/// Errors from a single catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CatalogError {
    #[error("product service request timed out")]
    Timeout,

    #[error("product service returned status {0}")]
    Status(u16),

    #[error("product service request failed: {0}")]
    Transport(String),

    #[error("failed to decode product response: {0}")]
    Decode(String),

    #[error("invalid product service url: {0}")]
    InvalidUrl(String),

    #[error("product lookup cancelled: {0}")]
    Cancelled(ContextError),
}

/// Read access to the product service.
#[async_trait]
pub trait ProductCatalog: Send + Sync {
    /// Returns the product, or `None` if the service does not know it.
    async fn get_product(&self, product_id: &ProductId)
    -> Result<Option<ProductSnapshot>, CatalogError>;
}

#[async_trait]
impl<T: ProductCatalog + ?Sized> ProductCatalog for Arc<T> {
    async fn get_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductSnapshot>, CatalogError> {
        (**self).get_product(product_id).await
    }
}

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, ProductSnapshot>,
    failure: Option<CatalogError>,
    delay: Option<Duration>,
    calls: usize,
}

/// In-memory product catalog for tests and local runs.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProductCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryProductCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryCatalogState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryCatalogState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Adds or replaces a product.
    pub fn insert(&self, product: ProductSnapshot) {
        self.write()
            .products
            .insert(product.product_id.clone(), product);
    }

    /// Makes every lookup fail with `error` until cleared with `None`.
    pub fn set_failure(&self, error: Option<CatalogError>) {
        self.write().failure = error;
    }

    /// Delays every lookup by `delay`.
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.write().delay = delay;
    }

    /// Returns the number of lookups served or failed.
    pub fn calls(&self) -> usize {
        self.read().calls
    }
}

#[async_trait]
impl ProductCatalog for InMemoryProductCatalog {
    async fn get_product(
        &self,
        product_id: &ProductId,
    ) -> Result<Option<ProductSnapshot>, CatalogError> {
        let delay = {
            let mut state = self.write();
            state.calls += 1;
            state.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let state = self.read();
        if let Some(error) = &state.failure {
            return Err(error.clone());
        }
        Ok(state.products.get(product_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn widget(stock: u32) -> ProductSnapshot {
        ProductSnapshot {
            product_id: ProductId::new("SKU-001"),
            name: "Widget".to_string(),
            description: String::new(),
            price: 12.5,
            category: "tools".to_string(),
            stock_count: stock,
        }
    }

    #[test]
    fn test_snapshot_decodes_product_service_json() {
        let json = r#"{"productId":"SKU-001","name":"Widget","description":"d",
            "price":19.99,"category":"tools","stockCount":7}"#;
        let product: ProductSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(product.stock_count, 7);
        assert_eq!(product.unit_price(), Money::from_cents(1999));
    }

    #[test]
    fn test_snapshot_accepts_inventory_count() {
        let json = r#"{"productId":"SKU-001","name":"Widget","price":1.0,"inventoryCount":3}"#;
        let product: ProductSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(product.stock_count, 3);
        assert!(product.category.is_empty());
    }

    #[tokio::test]
    async fn test_in_memory_lookup_and_failure() {
        let catalog = InMemoryProductCatalog::new();
        catalog.insert(widget(4));

        let found = catalog.get_product(&ProductId::new("SKU-001")).await.unwrap();
        assert_eq!(found.map(|p| p.stock_count), Some(4));
        assert_eq!(catalog.get_product(&ProductId::new("nope")).await.unwrap(), None);

        catalog.set_failure(Some(CatalogError::Status(503)));
        assert_eq!(
            catalog.get_product(&ProductId::new("SKU-001")).await,
            Err(CatalogError::Status(503))
        );
        assert_eq!(catalog.calls(), 3);
    }
}
