//! Integration tests for the publisher's retry and cancellation behavior.

use std::sync::Arc;
use std::time::Duration;

use common::{ContextError, RequestContext};
use domain::{Money, Order, OrderItem, UserId};
use events::{EventPublisher, InMemoryTransport, PublishError, PublisherSettings, payload};

fn order() -> Order {
    let items = vec![OrderItem::new(
        "SKU-001",
        "Widget",
        Money::from_cents(1000),
        1,
        "tools",
    )];
    Order::place(UserId::new("user-1"), items, "credit_card").unwrap()
}

fn setup(settings: PublisherSettings) -> (EventPublisher, InMemoryTransport) {
    let transport = InMemoryTransport::new();
    let publisher = EventPublisher::new(Arc::new(transport.clone()), settings);
    (publisher, transport)
}

#[tokio::test(start_paused = true)]
async fn test_exhaustion_makes_max_attempts_with_linear_backoff() {
    let (publisher, transport) = setup(PublisherSettings::default());
    transport.set_fail_always(true);
    let event = payload::order_created(publisher.source(), &order());

    let err = publisher
        .publish(&RequestContext::new(), &event)
        .await
        .unwrap_err();

    assert!(matches!(err, PublishError::Exhausted { attempts: 3, .. }));
    assert_eq!(err.attempts(), 3);

    let times = transport.attempt_times();
    assert_eq!(times.len(), 3);
    assert_eq!(times[1] - times[0], Duration::from_secs(1));
    assert_eq!(times[2] - times[1], Duration::from_secs(2));
}

#[tokio::test(start_paused = true)]
async fn test_custom_attempts_and_delay() {
    let (publisher, transport) = setup(PublisherSettings {
        max_attempts: 5,
        base_delay: Duration::from_millis(100),
        ..PublisherSettings::default()
    });
    transport.set_fail_always(true);
    let event = payload::order_created(publisher.source(), &order());

    let err = publisher
        .publish(&RequestContext::new(), &event)
        .await
        .unwrap_err();
    assert_eq!(err.attempts(), 5);

    let gaps: Vec<Duration> = transport
        .attempt_times()
        .windows(2)
        .map(|w| w[1] - w[0])
        .collect();
    assert_eq!(
        gaps,
        vec![
            Duration::from_millis(100),
            Duration::from_millis(200),
            Duration::from_millis(300),
            Duration::from_millis(400),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_cancellation_during_backoff_stops_retrying() {
    let (publisher, transport) = setup(PublisherSettings::default());
    transport.set_fail_always(true);
    let event = payload::order_created(publisher.source(), &order());
    let ctx = RequestContext::new();

    let canceller = {
        let ctx = ctx.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(500)).await;
            ctx.cancel();
        })
    };

    let started = tokio::time::Instant::now();
    let err = publisher.publish(&ctx, &event).await.unwrap_err();
    canceller.await.unwrap();

    assert!(matches!(
        err,
        PublishError::Cancelled {
            attempts: 1,
            cause: ContextError::Cancelled
        }
    ));
    assert_eq!(transport.attempts(), 1);
    assert_eq!(started.elapsed(), Duration::from_millis(500));
}

#[tokio::test(start_paused = true)]
async fn test_deadline_aborts_hung_send() {
    let (publisher, transport) = setup(PublisherSettings::default());
    transport.set_hang(true);
    let event = payload::order_created(publisher.source(), &order());
    let ctx = RequestContext::with_timeout(Duration::from_secs(2));

    let err = publisher.publish(&ctx, &event).await.unwrap_err();

    assert!(matches!(
        err,
        PublishError::Cancelled {
            attempts: 1,
            cause: ContextError::DeadlineExceeded
        }
    ));
    assert!(transport.messages().is_empty());
}
