//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use checkout::ValidationSettings;
use events::PublisherSettings;
use resilience::{BreakerSettings, TripPolicy};

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json,
}

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`, `PORT` (default `0.0.0.0:8082`)
/// - `RUST_LOG` (default `info`), `LOG_FORMAT` (`json` or text)
/// - `SERVICE_NAME` (default `checkout-service`)
/// - `PRODUCT_SERVICE_URL`; unset uses an in-memory catalog
/// - `PRODUCT_REQUEST_TIMEOUT_MS`, `FALLBACK_MAX_QUANTITY`
/// - `BREAKER_MAX_REQUESTS`, `BREAKER_INTERVAL_MS`, `BREAKER_TIMEOUT_MS`,
///   `BREAKER_MIN_REQUESTS`, `BREAKER_FAILURE_RATIO`
/// - `EVENTS_ENABLED`, `MAX_RETRY_ATTEMPTS`, `RETRY_DELAY_MS`, `EVENT_SOURCE`
/// - `NATS_URL`; unset uses an in-memory transport. `EVENTS_SUBJECT`
/// - `METRICS_UPDATE_INTERVAL_MS`, `REQUEST_TIMEOUT_MS`
///
/// Unparseable values fall back to their defaults.
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub log_format: LogFormat,
    pub service_name: String,
    pub product_service_url: Option<String>,
    pub nats_url: Option<String>,
    pub events_subject: String,
    pub metrics_update_interval: Duration,
    pub request_timeout: Duration,
    pub breaker: BreakerSettings,
    pub validation: ValidationSettings,
    pub publisher: PublisherSettings,
}

fn var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(key: &str, default: T) -> T {
    var(key).and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn millis(key: &str, default: Duration) -> Duration {
    var(key)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map_or(default, Duration::from_millis)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let breaker = BreakerSettings {
            name: defaults.breaker.name.clone(),
            max_requests: parsed("BREAKER_MAX_REQUESTS", defaults.breaker.max_requests),
            interval: millis("BREAKER_INTERVAL_MS", defaults.breaker.interval),
            timeout: millis("BREAKER_TIMEOUT_MS", defaults.breaker.timeout),
            trip: TripPolicy {
                min_requests: parsed("BREAKER_MIN_REQUESTS", defaults.breaker.trip.min_requests),
                failure_ratio: parsed(
                    "BREAKER_FAILURE_RATIO",
                    defaults.breaker.trip.failure_ratio,
                ),
            },
        };

        let validation = ValidationSettings {
            request_timeout: millis(
                "PRODUCT_REQUEST_TIMEOUT_MS",
                defaults.validation.request_timeout,
            ),
            fallback_max_quantity: parsed(
                "FALLBACK_MAX_QUANTITY",
                defaults.validation.fallback_max_quantity,
            ),
        };

        let service_name = var("SERVICE_NAME").unwrap_or(defaults.service_name);
        let publisher = PublisherSettings {
            enabled: parsed("EVENTS_ENABLED", defaults.publisher.enabled),
            max_attempts: parsed("MAX_RETRY_ATTEMPTS", defaults.publisher.max_attempts),
            base_delay: millis("RETRY_DELAY_MS", defaults.publisher.base_delay),
            source: var("EVENT_SOURCE").unwrap_or_else(|| service_name.clone()),
        };

        Self {
            host: var("HOST").unwrap_or(defaults.host),
            port: parsed("PORT", defaults.port),
            log_level: var("RUST_LOG").unwrap_or(defaults.log_level),
            log_format: match var("LOG_FORMAT").as_deref() {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Text,
            },
            service_name,
            product_service_url: var("PRODUCT_SERVICE_URL"),
            nats_url: var("NATS_URL"),
            events_subject: var("EVENTS_SUBJECT").unwrap_or(defaults.events_subject),
            metrics_update_interval: millis(
                "METRICS_UPDATE_INTERVAL_MS",
                defaults.metrics_update_interval,
            ),
            request_timeout: millis("REQUEST_TIMEOUT_MS", defaults.request_timeout),
            breaker,
            validation,
            publisher,
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8082,
            log_level: "info".to_string(),
            log_format: LogFormat::Text,
            service_name: "checkout-service".to_string(),
            product_service_url: None,
            nats_url: None,
            events_subject: "checkout.events".to_string(),
            metrics_update_interval: Duration::from_secs(5),
            request_timeout: Duration::from_secs(30),
            breaker: BreakerSettings::new("ProductService"),
            validation: ValidationSettings::default(),
            publisher: PublisherSettings::default(),
        }
    }
}
