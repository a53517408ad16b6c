//! The checkout domain event envelope and its type vocabulary.

use chrono::{DateTime, Utc};
use common::{EventId, OrderId};
use domain::UserId;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::transport::MessageAttributes;

/// Every event this service emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    CartItemAdded,
    CartItemUpdated,
    CartItemRemoved,
    CartCleared,
    OrderCreated,
    OrderConfirmed,
    OrderProcessing,
    OrderShipped,
    OrderDelivered,
    OrderCancelled,
    PaymentInitiated,
    PaymentCompleted,
    PaymentFailed,
    PaymentRefunded,
    CheckoutStarted,
    CheckoutCompleted,
    CheckoutAbandoned,
}

impl EventType {
    /// Returns the category this event type belongs to.
    pub fn category(&self) -> EventCategory {
        match self {
            EventType::CartItemAdded
            | EventType::CartItemUpdated
            | EventType::CartItemRemoved
            | EventType::CartCleared => EventCategory::Cart,
            EventType::OrderCreated
            | EventType::OrderConfirmed
            | EventType::OrderProcessing
            | EventType::OrderShipped
            | EventType::OrderDelivered
            | EventType::OrderCancelled => EventCategory::Order,
            EventType::PaymentInitiated
            | EventType::PaymentCompleted
            | EventType::PaymentFailed
            | EventType::PaymentRefunded => EventCategory::Payment,
            EventType::CheckoutStarted
            | EventType::CheckoutCompleted
            | EventType::CheckoutAbandoned => EventCategory::Checkout,
        }
    }

    /// Returns the wire name of the event type.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::CartItemAdded => "CART_ITEM_ADDED",
            EventType::CartItemUpdated => "CART_ITEM_UPDATED",
            EventType::CartItemRemoved => "CART_ITEM_REMOVED",
            EventType::CartCleared => "CART_CLEARED",
            EventType::OrderCreated => "ORDER_CREATED",
            EventType::OrderConfirmed => "ORDER_CONFIRMED",
            EventType::OrderProcessing => "ORDER_PROCESSING",
            EventType::OrderShipped => "ORDER_SHIPPED",
            EventType::OrderDelivered => "ORDER_DELIVERED",
            EventType::OrderCancelled => "ORDER_CANCELLED",
            EventType::PaymentInitiated => "PAYMENT_INITIATED",
            EventType::PaymentCompleted => "PAYMENT_COMPLETED",
            EventType::PaymentFailed => "PAYMENT_FAILED",
            EventType::PaymentRefunded => "PAYMENT_REFUNDED",
            EventType::CheckoutStarted => "CHECKOUT_STARTED",
            EventType::CheckoutCompleted => "CHECKOUT_COMPLETED",
            EventType::CheckoutAbandoned => "CHECKOUT_ABANDONED",
        }
    }

    pub fn is_cart_event(&self) -> bool {
        self.category() == EventCategory::Cart
    }

    pub fn is_order_event(&self) -> bool {
        self.category() == EventCategory::Order
    }

    pub fn is_payment_event(&self) -> bool {
        self.category() == EventCategory::Payment
    }

    pub fn is_checkout_event(&self) -> bool {
        self.category() == EventCategory::Checkout
    }
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Coarse grouping of event types, attached to every message for routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventCategory {
    Cart,
    Order,
    Payment,
    Checkout,
}

impl EventCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventCategory::Cart => "cart",
            EventCategory::Order => "order",
            EventCategory::Payment => "payment",
            EventCategory::Checkout => "checkout",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An immutable domain event.
///
/// Fields are private and set once at construction; consumers deduplicate
/// on `event_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutEvent {
    event_id: EventId,
    event_type: EventType,
    source: String,
    timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    user_id: Option<UserId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    order_id: Option<OrderId>,
    data: Map<String, Value>,
}

impl CheckoutEvent {
    /// Creates a user-scoped event stamped with a fresh ID and the current UTC time.
    pub fn new(
        event_type: EventType,
        source: impl Into<String>,
        user_id: Option<UserId>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            event_id: EventId::new(),
            event_type,
            source: source.into(),
            timestamp: Utc::now(),
            user_id,
            order_id: None,
            data,
        }
    }

    /// Creates an event about a specific order.
    pub fn for_order(
        event_type: EventType,
        source: impl Into<String>,
        user_id: UserId,
        order_id: OrderId,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            order_id: Some(order_id),
            ..Self::new(event_type, source, Some(user_id), data)
        }
    }

    pub fn event_id(&self) -> EventId {
        self.event_id
    }

    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    pub fn category(&self) -> EventCategory {
        self.event_type.category()
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    pub fn user_id(&self) -> Option<&UserId> {
        self.user_id.as_ref()
    }

    pub fn order_id(&self) -> Option<OrderId> {
        self.order_id
    }

    /// Returns the event payload.
    pub fn data(&self) -> &Map<String, Value> {
        &self.data
    }

    /// Returns the message attributes sent alongside the serialized event.
    pub fn attributes(&self) -> MessageAttributes {
        let mut attributes = MessageAttributes::new();
        attributes.insert("eventType".to_string(), self.event_type.to_string());
        attributes.insert("source".to_string(), self.source.clone());
        attributes.insert("eventCategory".to_string(), self.category().to_string());
        attributes.insert("eventId".to_string(), self.event_id.to_string());
        if let Some(user_id) = &self.user_id {
            attributes.insert("userId".to_string(), user_id.to_string());
        }
        if let Some(order_id) = self.order_id {
            attributes.insert("orderId".to_string(), order_id.to_string());
        }
        attributes
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_categories_cover_every_type() {
        assert_eq!(EventType::CartCleared.category(), EventCategory::Cart);
        assert_eq!(EventType::OrderShipped.category(), EventCategory::Order);
        assert_eq!(EventType::PaymentRefunded.category(), EventCategory::Payment);
        assert_eq!(EventType::CheckoutAbandoned.category(), EventCategory::Checkout);

        assert!(EventType::OrderCreated.is_order_event());
        assert!(!EventType::OrderCreated.is_payment_event());
        assert!(EventType::CartItemAdded.is_cart_event());
        assert!(EventType::CheckoutStarted.is_checkout_event());
    }

    #[test]
    fn test_wire_names_match_serde() {
        for event_type in [
            EventType::CartItemUpdated,
            EventType::OrderConfirmed,
            EventType::PaymentInitiated,
            EventType::CheckoutCompleted,
        ] {
            let json = serde_json::to_string(&event_type).unwrap();
            assert_eq!(json, format!("\"{}\"", event_type.as_str()));
        }
    }

    #[test]
    fn test_order_event_serializes_camel_case() {
        let order_id = OrderId::new();
        let event = CheckoutEvent::for_order(
            EventType::OrderCreated,
            "checkout-service",
            UserId::new("user-1"),
            order_id,
            Map::new(),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["eventType"], "ORDER_CREATED");
        assert_eq!(json["source"], "checkout-service");
        assert_eq!(json["userId"], "user-1");
        assert_eq!(json["orderId"], order_id.to_string());
        assert!(json["data"].as_object().unwrap().is_empty());
    }

    #[test]
    fn test_user_event_omits_order_id() {
        let event = CheckoutEvent::new(EventType::CartCleared, "checkout-service", None, Map::new());
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("orderId").is_none());
        assert!(json.get("userId").is_none());
    }

    #[test]
    fn test_attributes() {
        let order_id = OrderId::new();
        let event = CheckoutEvent::for_order(
            EventType::PaymentCompleted,
            "checkout-service",
            UserId::new("user-1"),
            order_id,
            Map::new(),
        );

        let attrs = event.attributes();
        assert_eq!(attrs["eventType"], "PAYMENT_COMPLETED");
        assert_eq!(attrs["eventCategory"], "payment");
        assert_eq!(attrs["source"], "checkout-service");
        assert_eq!(attrs["eventId"], event.event_id().to_string());
        assert_eq!(attrs["userId"], "user-1");
        assert_eq!(attrs["orderId"], order_id.to_string());
    }

    #[test]
    fn test_events_get_unique_ids() {
        let a = CheckoutEvent::new(EventType::CartCleared, "s", None, Map::new());
        let b = CheckoutEvent::new(EventType::CartCleared, "s", None, Map::new());
        assert_ne!(a.event_id(), b.event_id());
    }
}
