//! Checkout HTTP server.
//!
//! Wires the order orchestrator to its collaborators and exposes it over a
//! thin REST surface, with structured logging (tracing) and Prometheus
//! metrics.

pub mod config;
pub mod error;
pub mod routes;

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::routing::{get, post, put};
use checkout::{
    HttpProductCatalog, InMemoryPaymentExecutor, InMemoryProductCatalog, OrderOrchestrator,
    ProductCatalog, ProductValidationClient,
};
use common::RequestContext;
use domain::{InMemoryCartStore, InMemoryOrderStore};
use events::{EventPublisher, EventTransport, InMemoryTransport, NatsTransport};
use metrics_exporter_prometheus::PrometheusHandle;
use resilience::{BreakerMetrics, CircuitBreaker};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;

/// The orchestrator as wired by this binary.
pub type Orchestrator = OrderOrchestrator<
    InMemoryCartStore,
    InMemoryOrderStore,
    Arc<dyn ProductCatalog>,
    InMemoryPaymentExecutor,
>;

/// Shared application state accessible from all handlers.
pub struct AppState {
    pub orchestrator: Orchestrator,
    pub carts: InMemoryCartStore,
    /// Cancelled on shutdown; every request context is a child of it.
    pub shutdown: CancellationToken,
    pub request_timeout: Duration,
}

impl AppState {
    /// Wires the orchestrator over the given catalog and transport.
    pub fn new(
        config: &Config,
        catalog: Arc<dyn ProductCatalog>,
        transport: Arc<dyn EventTransport>,
        shutdown: CancellationToken,
    ) -> Self {
        let breaker = Arc::new(CircuitBreaker::new(config.breaker.clone()).with_metrics(
            BreakerMetrics::new(
                config.breaker.name.clone(),
                config.service_name.clone(),
                "product-service",
            ),
        ));
        let validator =
            ProductValidationClient::new(catalog, breaker, config.validation.clone());
        let publisher = EventPublisher::new(transport, config.publisher.clone());
        let carts = InMemoryCartStore::new();

        let orchestrator = OrderOrchestrator::new(
            carts.clone(),
            InMemoryOrderStore::new(),
            validator,
            publisher,
            InMemoryPaymentExecutor::new(),
        );

        Self {
            orchestrator,
            carts,
            shutdown,
            request_timeout: config.request_timeout,
        }
    }

    /// Creates the context for one request: cancelled on shutdown and
    /// bounded by the request timeout.
    pub fn request_context(&self) -> RequestContext {
        RequestContext::from_token(self.shutdown.child_token()).child(Some(self.request_timeout))
    }
}

/// Errors raised while wiring external collaborators at startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("product catalog: {0}")]
    Catalog(#[from] checkout::CatalogError),

    #[error("event transport: {0}")]
    Transport(#[from] events::TransportError),
}

/// Builds the application state, connecting to the product service and
/// NATS when they are configured and falling back to in-memory
/// collaborators otherwise.
pub async fn connect(config: &Config, shutdown: CancellationToken) -> Result<AppState, StartupError> {
    let catalog: Arc<dyn ProductCatalog> = match &config.product_service_url {
        Some(url) => {
            tracing::info!(%url, "using HTTP product catalog");
            Arc::new(HttpProductCatalog::new(url, config.validation.request_timeout)?)
        }
        None => {
            tracing::warn!("PRODUCT_SERVICE_URL not set, using in-memory product catalog");
            Arc::new(InMemoryProductCatalog::new())
        }
    };

    let transport: Arc<dyn EventTransport> = match &config.nats_url {
        Some(url) => {
            tracing::info!(%url, subject = %config.events_subject, "connecting to NATS");
            Arc::new(NatsTransport::connect(url, config.events_subject.clone()).await?)
        }
        None => {
            tracing::warn!("NATS_URL not set, events are kept in memory");
            Arc::new(InMemoryTransport::new())
        }
    };

    Ok(AppState::new(config, catalog, transport, shutdown))
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(routes::system::metrics))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::system::health))
        .route("/circuit-breaker", get(routes::system::circuit_breaker))
        .route("/users/{user_id}/cart", put(routes::orders::put_cart))
        .route("/users/{user_id}/orders", get(routes::orders::list_for_user))
        .route("/orders", post(routes::orders::create))
        .route("/orders/{id}", get(routes::orders::get))
        .route("/orders/{id}/status", put(routes::orders::update_status))
        .route(
            "/orders/{id}/payment-status",
            put(routes::orders::update_payment_status),
        )
        .route("/orders/{id}/cancel", post(routes::orders::cancel))
        .route("/orders/{id}/payment", post(routes::orders::process_payment))
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
