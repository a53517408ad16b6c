//! Event transport contract and the in-memory transport.

use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::time::Instant;

use crate::error::TransportError;
use crate::event::CheckoutEvent;

/// String attributes sent alongside a message payload.
pub type MessageAttributes = BTreeMap<String, String>;

/// A durable message broker.
#[async_trait]
pub trait EventTransport: Send + Sync {
    /// Sends one message and returns the broker-assigned message ID.
    async fn send(
        &self,
        payload: String,
        attributes: MessageAttributes,
    ) -> Result<String, TransportError>;

    /// Checks that the broker is reachable.
    async fn health_check(&self) -> Result<(), TransportError>;
}

/// A message accepted by [`InMemoryTransport`].
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message_id: String,
    pub payload: String,
    pub attributes: MessageAttributes,
}

#[derive(Debug, Default)]
struct InMemoryTransportState {
    sent: Vec<SentMessage>,
    attempt_times: Vec<Instant>,
    fail_next: u32,
    fail_always: bool,
    hang: bool,
    unhealthy: bool,
}

/// In-memory transport that records every message.
///
/// Failure toggles let tests drive the publisher's retry loop.
#[derive(Debug, Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<RwLock<InMemoryTransportState>>,
}

impl InMemoryTransport {
    /// Creates a healthy transport.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, InMemoryTransportState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, InMemoryTransportState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fails the next `n` sends.
    pub fn fail_next(&self, n: u32) {
        self.write().fail_next = n;
    }

    /// Fails every send while set.
    pub fn set_fail_always(&self, fail: bool) {
        self.write().fail_always = fail;
    }

    /// Makes sends wait forever while set.
    pub fn set_hang(&self, hang: bool) {
        self.write().hang = hang;
    }

    /// Makes health checks fail while set.
    pub fn set_unhealthy(&self, unhealthy: bool) {
        self.write().unhealthy = unhealthy;
    }

    /// Returns the accepted messages in send order.
    pub fn messages(&self) -> Vec<SentMessage> {
        self.read().sent.clone()
    }

    /// Returns the accepted messages decoded back into events.
    pub fn events(&self) -> Vec<CheckoutEvent> {
        self.read()
            .sent
            .iter()
            .filter_map(|m| serde_json::from_str(&m.payload).ok())
            .collect()
    }

    /// Returns the number of send calls, successful or not.
    pub fn attempts(&self) -> usize {
        self.read().attempt_times.len()
    }

    /// Returns the instant of every send call.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.read().attempt_times.clone()
    }
}

#[async_trait]
impl EventTransport for InMemoryTransport {
    async fn send(
        &self,
        payload: String,
        attributes: MessageAttributes,
    ) -> Result<String, TransportError> {
        let hang = {
            let mut state = self.write();
            state.attempt_times.push(Instant::now());

            if state.fail_always {
                return Err(TransportError::Unavailable("injected failure".to_string()));
            }
            if state.fail_next > 0 {
                state.fail_next -= 1;
                return Err(TransportError::Unavailable("injected failure".to_string()));
            }
            state.hang
        };
        if hang {
            std::future::pending::<()>().await;
        }

        let mut state = self.write();
        let message_id = format!("mem-{:06}", state.sent.len() + 1);
        state.sent.push(SentMessage {
            message_id: message_id.clone(),
            payload,
            attributes,
        });
        Ok(message_id)
    }

    async fn health_check(&self) -> Result<(), TransportError> {
        if self.read().unhealthy {
            return Err(TransportError::Unavailable("injected failure".to_string()));
        }
        Ok(())
    }
}
