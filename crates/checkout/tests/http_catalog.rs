//! HTTP catalog tests against an in-process product service.

use std::net::SocketAddr;
use std::time::Duration;

use axum::extract::Path;
use axum::http::{HeaderMap, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use checkout::{CatalogError, HttpProductCatalog, ProductCatalog};
use domain::{Money, ProductId};
use serde_json::json;

async fn product(Path(id): Path<String>, headers: HeaderMap) -> Response {
    match id.as_str() {
        "SKU-1" => {
            let agent = headers
                .get(header::USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();
            Json(json!({
                "productId": "SKU-1",
                "name": "Widget",
                "description": agent,
                "price": 19.99,
                "category": "tools",
                "stockCount": 7,
            }))
            .into_response()
        }
        "LEGACY" => Json(json!({
            "productId": "LEGACY",
            "name": "Old Widget",
            "price": 5.0,
            "inventoryCount": 2,
        }))
        .into_response(),
        "BROKEN" => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        "GARBLED" => (StatusCode::OK, "not json").into_response(),
        "SLOW" => {
            tokio::time::sleep(Duration::from_secs(2)).await;
            StatusCode::OK.into_response()
        }
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

async fn serve() -> SocketAddr {
    let app = Router::new().route("/api/v1/products/{id}", get(product));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    addr
}

async fn catalog(timeout: Duration) -> HttpProductCatalog {
    let addr = serve().await;
    HttpProductCatalog::new(&format!("http://{addr}"), timeout).unwrap()
}

#[tokio::test]
async fn test_found_product_is_decoded() {
    let catalog = catalog(Duration::from_secs(5)).await;

    let product = catalog
        .get_product(&ProductId::new("SKU-1"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.name, "Widget");
    assert_eq!(product.stock_count, 7);
    assert_eq!(product.unit_price(), Money::from_cents(1999));
    assert_eq!(product.description, "checkout-service/1.0");
}

#[tokio::test]
async fn test_legacy_inventory_field_is_accepted() {
    let catalog = catalog(Duration::from_secs(5)).await;

    let product = catalog
        .get_product(&ProductId::new("LEGACY"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(product.stock_count, 2);
    assert_eq!(product.category, "");
}

#[tokio::test]
async fn test_not_found_is_none() {
    let catalog = catalog(Duration::from_secs(5)).await;

    let product = catalog.get_product(&ProductId::new("NOPE")).await.unwrap();
    assert!(product.is_none());
}

#[tokio::test]
async fn test_server_error_is_status_error() {
    let catalog = catalog(Duration::from_secs(5)).await;

    let err = catalog
        .get_product(&ProductId::new("BROKEN"))
        .await
        .unwrap_err();
    assert_eq!(err, CatalogError::Status(500));
}

#[tokio::test]
async fn test_bad_body_is_decode_error() {
    let catalog = catalog(Duration::from_secs(5)).await;

    let err = catalog
        .get_product(&ProductId::new("GARBLED"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Decode(_)));
}

#[tokio::test]
async fn test_slow_service_times_out() {
    let catalog = catalog(Duration::from_millis(100)).await;

    let err = catalog
        .get_product(&ProductId::new("SLOW"))
        .await
        .unwrap_err();
    assert_eq!(err, CatalogError::Timeout);
}

#[tokio::test]
async fn test_refused_connection_is_transport_error() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    let catalog = HttpProductCatalog::new(&format!("http://{addr}"), Duration::from_secs(1)).unwrap();

    let err = catalog
        .get_product(&ProductId::new("SKU-1"))
        .await
        .unwrap_err();
    assert!(matches!(err, CatalogError::Transport(_)));
}
