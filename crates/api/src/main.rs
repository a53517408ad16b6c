//! Checkout server entry point.

use std::sync::Arc;

use api::config::{Config, LogFormat};
use resilience::MetricsUpdater;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Waits for a shutdown signal (SIGINT or SIGTERM).
async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("received SIGINT, starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("received SIGTERM, starting graceful shutdown");
        }
    }
    shutdown.cancel();
}

fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    // 1. Initialize tracing
    init_tracing(&config);

    // 2. Install Prometheus metrics recorder
    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // 3. Wire collaborators
    let shutdown = CancellationToken::new();
    let state = Arc::new(
        api::connect(&config, shutdown.clone())
            .await
            .expect("failed to initialize checkout service"),
    );

    // 4. Export breaker state until shutdown
    let updater = MetricsUpdater::new(config.metrics_update_interval)
        .watch(state.orchestrator.breaker().clone())
        .spawn(shutdown.clone());

    // 5. Build the application and start serving
    let app = api::create_app(state, metrics_handle);
    let addr = config.addr();
    tracing::info!(%addr, service = %config.service_name, "starting checkout server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("server error");

    shutdown.cancel();
    if let Err(error) = updater.await {
        tracing::warn!(%error, "metrics updater task failed");
    }
    tracing::info!("server shut down gracefully");
}
