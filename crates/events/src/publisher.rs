//! Retrying event publisher.

use std::sync::Arc;
use std::time::Duration;

use common::RequestContext;
use metrics::Label;

use crate::error::PublishError;
use crate::event::CheckoutEvent;
use crate::transport::EventTransport;

/// Publisher configuration.
#[derive(Debug, Clone)]
pub struct PublisherSettings {
    /// When false, publishing succeeds without touching the transport.
    pub enabled: bool,
    /// Total delivery attempts per event.
    pub max_attempts: u32,
    /// Backoff unit; the wait after attempt `n` is `n * base_delay`.
    pub base_delay: Duration,
    /// Value stamped into every event's `source` field.
    pub source: String,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            source: "checkout-service".to_string(),
        }
    }
}

/// Delivers events to an [`EventTransport`] with bounded linear backoff.
///
/// Delivery is at-least-once: a retried send may reach the broker twice and
/// consumers deduplicate on the event ID.
#[derive(Clone)]
pub struct EventPublisher {
    transport: Arc<dyn EventTransport>,
    settings: PublisherSettings,
}

impl EventPublisher {
    /// Creates a new publisher over the given transport.
    pub fn new(transport: Arc<dyn EventTransport>, settings: PublisherSettings) -> Self {
        Self {
            transport,
            settings,
        }
    }

    /// Returns the source name stamped into events.
    pub fn source(&self) -> &str {
        &self.settings.source
    }

    /// Publishes one event.
    ///
    /// Retries failed sends up to `max_attempts` times in total, waiting
    /// `attempt * base_delay` between attempts. Cancellation of `ctx` aborts
    /// both in-flight sends and backoff waits.
    #[tracing::instrument(
        skip(self, ctx, event),
        fields(event_id = %event.event_id(), event_type = %event.event_type())
    )]
    pub async fn publish(
        &self,
        ctx: &RequestContext,
        event: &CheckoutEvent,
    ) -> Result<(), PublishError> {
        if !self.settings.enabled {
            tracing::debug!("event publishing disabled, skipping");
            return Ok(());
        }
        ctx.check()
            .map_err(|cause| PublishError::Cancelled { attempts: 0, cause })?;

        let payload = serde_json::to_string(event)?;
        let attributes = event.attributes();
        let labels = vec![
            Label::new("event_type", event.event_type().as_str()),
            Label::new("category", event.category().as_str()),
        ];
        let max_attempts = self.settings.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            metrics::counter!("events_publish_attempts_total", labels.clone()).increment(1);

            let sent = tokio::select! {
                cause = ctx.done() => {
                    tracing::warn!(attempt, %cause, "event publish cancelled during send");
                    return Err(PublishError::Cancelled { attempts: attempt, cause });
                }
                sent = self.transport.send(payload.clone(), attributes.clone()) => sent,
            };

            match sent {
                Ok(message_id) => {
                    metrics::counter!("events_published_total", labels).increment(1);
                    tracing::debug!(attempt, %message_id, "event published");
                    return Ok(());
                }
                Err(error) if attempt >= max_attempts => {
                    metrics::counter!("events_publish_failures_total", labels).increment(1);
                    tracing::error!(attempts = attempt, %error, "event publish failed, giving up");
                    return Err(PublishError::Exhausted {
                        attempts: attempt,
                        source: error,
                    });
                }
                Err(error) => {
                    let delay = self.settings.base_delay * attempt;
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        %error,
                        "event publish failed, retrying"
                    );
                    tokio::select! {
                        cause = ctx.done() => {
                            return Err(PublishError::Cancelled { attempts: attempt, cause });
                        }
                        _ = tokio::time::sleep(delay) => {}
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Fails when publishing is disabled, otherwise asks the transport.
    pub async fn health_check(&self) -> Result<(), PublishError> {
        if !self.settings.enabled {
            return Err(PublishError::Disabled);
        }
        self.transport
            .health_check()
            .await
            .map_err(PublishError::Unhealthy)
    }
}

impl std::fmt::Debug for EventPublisher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPublisher")
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}
