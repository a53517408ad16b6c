//! Checkout domain events and their delivery.
//!
//! This crate provides:
//! - [`CheckoutEvent`], the immutable event envelope, and its type vocabulary
//! - Payload builders for order, payment, cart and checkout events
//! - The [`EventTransport`] contract with in-memory and NATS JetStream transports
//! - [`EventPublisher`], which retries failed sends with linear backoff

pub mod error;
pub mod event;
pub mod nats;
pub mod payload;
pub mod publisher;
pub mod transport;

pub use error::{PublishError, TransportError};
pub use event::{CheckoutEvent, EventCategory, EventType};
pub use nats::NatsTransport;
pub use publisher::{EventPublisher, PublisherSettings};
pub use transport::{EventTransport, InMemoryTransport, MessageAttributes, SentMessage};
