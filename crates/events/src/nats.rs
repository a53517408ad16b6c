//! NATS JetStream transport.

use async_nats::connection::State;
use async_nats::{HeaderMap, jetstream};
use async_trait::async_trait;
use bytes::Bytes;

use crate::error::TransportError;
use crate::transport::{EventTransport, MessageAttributes};

const MESSAGE_ID_HEADER: &str = "Nats-Msg-Id";

/// Publishes events to a JetStream subject and waits for the stream ack.
///
/// Message attributes travel as headers. The event ID doubles as the
/// `Nats-Msg-Id` header so the stream drops retried duplicates inside its
/// deduplication window.
#[derive(Debug, Clone)]
pub struct NatsTransport {
    client: async_nats::Client,
    jetstream: jetstream::Context,
    subject: String,
}

impl NatsTransport {
    /// Connects to `url` and publishes to `subject`.
    pub async fn connect(url: &str, subject: impl Into<String>) -> Result<Self, TransportError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;
        Ok(Self::new(client, subject))
    }

    /// Wraps an existing client.
    pub fn new(client: async_nats::Client, subject: impl Into<String>) -> Self {
        let jetstream = jetstream::new(client.clone());
        Self {
            client,
            jetstream,
            subject: subject.into(),
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }
}

fn headers(attributes: &MessageAttributes) -> HeaderMap {
    let mut headers = HeaderMap::new();
    for (key, value) in attributes {
        headers.insert(key.as_str(), value.as_str());
    }
    if let Some(event_id) = attributes.get("eventId") {
        headers.insert(MESSAGE_ID_HEADER, event_id.as_str());
    }
    headers
}

#[async_trait]
impl EventTransport for NatsTransport {
    async fn send(
        &self,
        payload: String,
        attributes: MessageAttributes,
    ) -> Result<String, TransportError> {
        let ack = self
            .jetstream
            .publish_with_headers(self.subject.clone(), headers(&attributes), Bytes::from(payload))
            .await
            .map_err(|e| TransportError::Rejected(e.to_string()))?
            .await
            .map_err(|e| TransportError::Ack(e.to_string()))?;

        if ack.duplicate {
            tracing::debug!(stream = %ack.stream, sequence = ack.sequence, "broker dropped duplicate event");
        }
        Ok(format!("{}:{}", ack.stream, ack.sequence))
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        match self.client.connection_state() {
            State::Connected => Ok(()),
            state => Err(TransportError::Unavailable(format!(
                "nats connection is {state:?}"
            ))),
        }
    }
}
