//! Breaker-guarded product validation with a quantity-based fallback.

use std::sync::Arc;
use std::time::Duration;

use common::{ContextError, RequestContext};
use domain::ProductId;
use resilience::{BreakerError, CircuitBreaker};
use tokio::time::Instant;

use crate::catalog::{CatalogError, ProductCatalog, ProductSnapshot};

/// Validation client configuration.
#[derive(Debug, Clone)]
pub struct ValidationSettings {
    /// Upper bound on a single catalog lookup.
    pub request_timeout: Duration,
    /// Largest quantity accepted without checking stock while the catalog is unreachable.
    pub fallback_max_quantity: u32,
}

impl Default for ValidationSettings {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(5),
            fallback_max_quantity: 5,
        }
    }
}

/// The decision for one cart line.
#[derive(Debug)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    /// The catalog's snapshot, absent when not found or when the fallback decided.
    pub product: Option<ProductSnapshot>,
    /// Why the catalog could not be consulted, set when the fallback policy decided.
    pub fallback_cause: Option<BreakerError<CatalogError>>,
}

impl ValidationOutcome {
    /// Returns true if the fallback policy made this decision.
    pub fn used_fallback(&self) -> bool {
        self.fallback_cause.is_some()
    }
}

/// Checks stock availability through a circuit breaker.
///
/// Dependency failures never surface as errors: when the breaker rejects the
/// call or the lookup fails, small quantities are accepted and large ones
/// rejected. Only cancellation is returned as an error.
pub struct ProductValidationClient<P> {
    catalog: P,
    breaker: Arc<CircuitBreaker>,
    settings: ValidationSettings,
}

impl<P: ProductCatalog> ProductValidationClient<P> {
    /// Creates a new validation client.
    pub fn new(catalog: P, breaker: Arc<CircuitBreaker>, settings: ValidationSettings) -> Self {
        Self {
            catalog,
            breaker,
            settings,
        }
    }

    /// Returns the breaker guarding the catalog.
    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    /// Validates that `quantity` units of `product_id` are in stock.
    #[tracing::instrument(skip(self, ctx), fields(breaker = %self.breaker.name()))]
    pub async fn validate(
        &self,
        ctx: &RequestContext,
        product_id: &ProductId,
        quantity: u32,
    ) -> Result<ValidationOutcome, ContextError> {
        ctx.check()?;

        let metrics = self.breaker.metrics();
        metrics.record_request();
        let started = Instant::now();
        let result = self
            .breaker
            .execute(|| self.lookup(ctx, product_id))
            .await;
        let elapsed = started.elapsed();

        match result {
            Ok(Some(product)) => {
                metrics.record_success(elapsed);
                let is_valid = product.stock_count >= quantity;
                if !is_valid {
                    tracing::warn!(
                        requested = quantity,
                        available = product.stock_count,
                        "insufficient stock"
                    );
                }
                Ok(ValidationOutcome {
                    is_valid,
                    product: Some(product),
                    fallback_cause: None,
                })
            }
            Ok(None) => {
                metrics.record_success(elapsed);
                Ok(ValidationOutcome {
                    is_valid: false,
                    product: None,
                    fallback_cause: None,
                })
            }
            Err(BreakerError::Call(CatalogError::Cancelled(cause))) => {
                metrics.record_failure(elapsed);
                Err(cause)
            }
            Err(error) => {
                metrics.record_failure(elapsed);
                let is_valid = quantity <= self.settings.fallback_max_quantity;
                tracing::warn!(
                    requested = quantity,
                    fallback = is_valid,
                    %error,
                    "product service unavailable, using fallback validation"
                );
                Ok(ValidationOutcome {
                    is_valid,
                    product: None,
                    fallback_cause: Some(error),
                })
            }
        }
    }

    async fn lookup(
        &self,
        ctx: &RequestContext,
        product_id: &ProductId,
    ) -> Result<Option<ProductSnapshot>, CatalogError> {
        let lookup = tokio::time::timeout(
            self.settings.request_timeout,
            self.catalog.get_product(product_id),
        );
        tokio::select! {
            cause = ctx.done() => Err(CatalogError::Cancelled(cause)),
            result = lookup => result.unwrap_or(Err(CatalogError::Timeout)),
        }
    }
}

impl<P> std::fmt::Debug for ProductValidationClient<P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProductValidationClient")
            .field("breaker", &self.breaker)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
