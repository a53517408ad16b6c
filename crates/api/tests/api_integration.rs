//! Integration tests for the checkout API server.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use api::AppState;
use api::config::Config;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use checkout::{CatalogError, InMemoryProductCatalog, ProductSnapshot};
use domain::ProductId;
use events::{EventType, InMemoryTransport};
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

struct TestApp {
    app: axum::Router,
    catalog: InMemoryProductCatalog,
    transport: InMemoryTransport,
}

fn setup() -> TestApp {
    let mut config = Config::default();
    config.publisher.base_delay = Duration::from_millis(1);

    let catalog = InMemoryProductCatalog::new();
    catalog.insert(ProductSnapshot {
        product_id: ProductId::new("SKU-001"),
        name: "Widget".to_string(),
        description: String::new(),
        price: 10.0,
        category: "tools".to_string(),
        stock_count: 10,
    });
    let transport = InMemoryTransport::new();

    let state = Arc::new(AppState::new(
        &config,
        Arc::new(catalog.clone()),
        Arc::new(transport.clone()),
        CancellationToken::new(),
    ));
    TestApp {
        app: api::create_app(state, get_metrics_handle()),
        catalog,
        transport,
    }
}

async fn send(app: &axum::Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn seed_cart(app: &axum::Router, user: &str, product: &str, quantity: u32) {
    let (status, _) = send(
        app,
        "PUT",
        &format!("/users/{user}/cart"),
        Some(json!({
            "items": [{
                "product_id": product,
                "product_name": "Cached",
                "quantity": quantity,
                "price_cents": 900
            }]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

async fn create_order(app: &axum::Router, user: &str) -> String {
    seed_cart(app, user, "SKU-001", 2).await;
    let (status, json) = send(
        app,
        "POST",
        "/orders",
        Some(json!({ "user_id": user, "payment_method": "credit_card" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    json["order_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health_check() {
    let t = setup();

    let (status, json) = send(&t.app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["product_service"], "closed");
}

#[tokio::test]
async fn test_health_reports_unhealthy_transport_without_degrading() {
    let t = setup();
    t.transport.set_unhealthy(true);

    let (status, json) = send(&t.app, "GET", "/health", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["events"], "unavailable");
}

#[tokio::test(start_paused = true)]
async fn test_health_degraded_only_while_breaker_open() {
    let t = setup();
    t.catalog.set_failure(Some(CatalogError::Status(503)));
    for user in ["user-1", "user-2", "user-3"] {
        create_order(&t.app, user).await;
    }

    let (status, json) = send(&t.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["product_service"], "open");

    tokio::time::advance(Duration::from_secs(21)).await;

    let (status, json) = send(&t.app, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["product_service"], "half_open");
}

#[tokio::test]
async fn test_create_and_get_order() {
    let t = setup();
    let order_id = create_order(&t.app, "user-1").await;

    let (status, json) = send(&t.app, "GET", &format!("/orders/{order_id}"), None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["user_id"], "user-1");
    assert_eq!(json["status"], "pending");
    assert_eq!(json["payment_status"], "pending");
    assert_eq!(json["total_cents"], 2000);
    assert_eq!(json["items"][0]["product_name"], "Widget");
    assert_eq!(t.transport.events()[0].event_type(), EventType::OrderCreated);
}

#[tokio::test]
async fn test_create_order_with_empty_cart() {
    let t = setup();

    let (status, json) = send(
        &t.app,
        "POST",
        "/orders",
        Some(json!({ "user_id": "nobody", "payment_method": "card" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["kind"], "validation");
}

#[tokio::test]
async fn test_create_order_with_insufficient_stock_lists_failures() {
    let t = setup();
    seed_cart(&t.app, "user-1", "SKU-001", 11).await;

    let (status, json) = send(
        &t.app,
        "POST",
        "/orders",
        Some(json!({ "user_id": "user-1", "payment_method": "card" })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["failures"][0]["product_id"], "SKU-001");
    assert_eq!(json["failures"][0]["reason"], "insufficient_stock");
    assert_eq!(json["failures"][0]["requested"], 11);
}

#[tokio::test]
async fn test_create_order_while_product_service_down() {
    let t = setup();
    t.catalog.set_failure(Some(CatalogError::Status(503)));
    seed_cart(&t.app, "user-1", "SKU-001", 3).await;

    let (status, json) = send(
        &t.app,
        "POST",
        "/orders",
        Some(json!({ "user_id": "user-1", "payment_method": "card" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["items"][0]["product_name"], "Cached");
    assert_eq!(json["total_cents"], 2700);
}

#[tokio::test]
async fn test_get_nonexistent_order() {
    let t = setup();
    let missing = common::OrderId::new();

    let (status, json) = send(&t.app, "GET", &format!("/orders/{missing}"), None).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["kind"], "not_found");
}

#[tokio::test]
async fn test_invalid_order_id_format() {
    let t = setup();

    let (status, _) = send(&t.app, "GET", "/orders/not-a-uuid", None).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_status_update_and_invalid_transition() {
    let t = setup();
    let order_id = create_order(&t.app, "user-1").await;

    let (status, _) = send(
        &t.app,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(json!({ "status": "delivered" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, json) = send(
        &t.app,
        "PUT",
        &format!("/orders/{order_id}/status"),
        Some(json!({ "status": "confirmed" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "confirmed");
}

#[tokio::test]
async fn test_payment_status_completed_confirms_order() {
    let t = setup();
    let order_id = create_order(&t.app, "user-1").await;

    let (status, json) = send(
        &t.app,
        "PUT",
        &format!("/orders/{order_id}/payment-status"),
        Some(json!({ "payment_status": "completed" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["payment_status"], "completed");
    assert_eq!(json["status"], "confirmed");
}

#[tokio::test]
async fn test_process_payment_then_reject_second_attempt() {
    let t = setup();
    let order_id = create_order(&t.app, "user-1").await;
    let uri = format!("/orders/{order_id}/payment");

    let (status, json) = send(&t.app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["payment_status"], "completed");

    let (status, json) = send(&t.app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["kind"], "conflict");
}

#[tokio::test]
async fn test_cancel_order() {
    let t = setup();
    let order_id = create_order(&t.app, "user-1").await;
    let uri = format!("/orders/{order_id}/cancel");

    let (status, json) = send(&t.app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "cancelled");

    let (status, _) = send(&t.app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
}

#[tokio::test]
async fn test_list_user_orders() {
    let t = setup();
    let first = create_order(&t.app, "user-1").await;
    let second = create_order(&t.app, "user-1").await;
    create_order(&t.app, "user-2").await;

    let (status, json) = send(&t.app, "GET", "/users/user-1/orders", None).await;

    assert_eq!(status, StatusCode::OK);
    let ids: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["order_id"].as_str().unwrap())
        .collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.as_str()));
    assert!(ids.contains(&second.as_str()));
}

#[tokio::test]
async fn test_circuit_breaker_status() {
    let t = setup();

    let (status, json) = send(&t.app, "GET", "/circuit-breaker", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["name"], "ProductService");
    assert_eq!(json["state"], "closed");
    assert_eq!(json["counts"]["requests"], 0);
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let t = setup();
    create_order(&t.app, "user-1").await;

    let response = t
        .app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("orders_created_total"));
}
