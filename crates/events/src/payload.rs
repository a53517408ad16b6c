//! Builders for the events emitted by the checkout flow.
//!
//! Payload keys are camelCase and amounts are decimals, matching what
//! downstream consumers of the checkout topic already parse.

use domain::{Order, OrderItem, OrderStatus, PaymentStatus};
use serde_json::{Map, Value, json};

use crate::event::{CheckoutEvent, EventType};

/// Maps a new order status to the event announcing it.
pub fn order_event_type(status: OrderStatus) -> EventType {
    match status {
        OrderStatus::Pending => EventType::OrderCreated,
        OrderStatus::Confirmed => EventType::OrderConfirmed,
        OrderStatus::Processing => EventType::OrderProcessing,
        OrderStatus::Shipped => EventType::OrderShipped,
        OrderStatus::Delivered => EventType::OrderDelivered,
        OrderStatus::Cancelled => EventType::OrderCancelled,
    }
}

/// Maps a new payment status to the event announcing it.
pub fn payment_event_type(status: PaymentStatus) -> EventType {
    match status {
        PaymentStatus::Pending => EventType::PaymentInitiated,
        PaymentStatus::Completed => EventType::PaymentCompleted,
        PaymentStatus::Failed => EventType::PaymentFailed,
        PaymentStatus::Refunded => EventType::PaymentRefunded,
    }
}

fn object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

fn items_data(items: &[OrderItem]) -> Value {
    items
        .iter()
        .map(|item| {
            json!({
                "productId": item.product_id,
                "productName": item.product_name,
                "price": item.unit_price.as_decimal(),
                "quantity": item.quantity,
                "category": item.category,
                "subtotal": item.subtotal().map(|m| m.as_decimal()),
            })
        })
        .collect()
}

fn order_event(source: &str, event_type: EventType, order: &Order, data: Value) -> CheckoutEvent {
    CheckoutEvent::for_order(
        event_type,
        source,
        order.user_id.clone(),
        order.order_id,
        object(data),
    )
}

pub fn order_created(source: &str, order: &Order) -> CheckoutEvent {
    order_event(
        source,
        EventType::OrderCreated,
        order,
        json!({
            "totalAmount": order.total_amount.as_decimal(),
            "itemsCount": order.items_count(),
            "status": order.status,
            "paymentStatus": order.payment_status,
            "paymentMethod": order.payment_method,
            "items": items_data(&order.items),
        }),
    )
}

/// Announces `order`'s current status; the event type follows the new status.
pub fn order_status_changed(source: &str, order: &Order, old_status: OrderStatus) -> CheckoutEvent {
    order_event(
        source,
        order_event_type(order.status),
        order,
        json!({
            "newStatus": order.status,
            "oldStatus": old_status,
            "totalAmount": order.total_amount.as_decimal(),
            "paymentStatus": order.payment_status,
            "itemsCount": order.items_count(),
        }),
    )
}

/// Announces `order`'s current payment status.
pub fn payment_status_changed(
    source: &str,
    order: &Order,
    old_payment_status: PaymentStatus,
) -> CheckoutEvent {
    order_event(
        source,
        payment_event_type(order.payment_status),
        order,
        json!({
            "newPaymentStatus": order.payment_status,
            "oldPaymentStatus": old_payment_status,
            "totalAmount": order.total_amount.as_decimal(),
            "paymentMethod": order.payment_method,
            "orderStatus": order.status,
        }),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{Money, UserId};

    fn order() -> Order {
        let items = vec![
            OrderItem::new("SKU-001", "Widget", Money::from_cents(1050), 2, "tools"),
            OrderItem::new("SKU-002", "Gadget", Money::from_cents(999), 1, "toys"),
        ];
        Order::place(UserId::new("user-1"), items, "credit_card").unwrap()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(order_event_type(OrderStatus::Pending), EventType::OrderCreated);
        assert_eq!(order_event_type(OrderStatus::Confirmed), EventType::OrderConfirmed);
        assert_eq!(order_event_type(OrderStatus::Cancelled), EventType::OrderCancelled);
        assert_eq!(payment_event_type(PaymentStatus::Pending), EventType::PaymentInitiated);
        assert_eq!(payment_event_type(PaymentStatus::Completed), EventType::PaymentCompleted);
        assert_eq!(payment_event_type(PaymentStatus::Failed), EventType::PaymentFailed);
        assert_eq!(payment_event_type(PaymentStatus::Refunded), EventType::PaymentRefunded);
    }

    #[test]
    fn test_order_created_payload() {
        let order = order();
        let event = order_created("checkout-service", &order);

        assert_eq!(event.event_type(), EventType::OrderCreated);
        assert_eq!(event.order_id(), Some(order.order_id));
        let data = event.data();
        assert_eq!(data["totalAmount"], 30.99);
        assert_eq!(data["itemsCount"], 2);
        assert_eq!(data["status"], "pending");
        assert_eq!(data["paymentStatus"], "pending");
        assert_eq!(data["paymentMethod"], "credit_card");
        assert_eq!(data["items"][0]["productId"], "SKU-001");
        assert_eq!(data["items"][0]["subtotal"], 21.0);
    }

    #[test]
    fn test_status_changed_uses_new_status() {
        let mut order = order();
        order.status = OrderStatus::Shipped;
        let event = order_status_changed("checkout-service", &order, OrderStatus::Processing);

        assert_eq!(event.event_type(), EventType::OrderShipped);
        assert_eq!(event.data()["newStatus"], "shipped");
        assert_eq!(event.data()["oldStatus"], "processing");
    }

    #[test]
    fn test_payment_changed_payload() {
        let mut order = order();
        order.payment_status = PaymentStatus::Failed;
        let event = payment_status_changed("checkout-service", &order, PaymentStatus::Pending);

        assert_eq!(event.event_type(), EventType::PaymentFailed);
        assert_eq!(event.data()["newPaymentStatus"], "failed");
        assert_eq!(event.data()["oldPaymentStatus"], "pending");
        assert_eq!(event.data()["orderStatus"], "pending");
    }
}
