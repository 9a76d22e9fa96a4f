//! HTTP API tests
//!
//! Drives the full router against the in-memory store:
//! - Admin guard on back-office routes (401 / 403 / expired token)
//! - Public storefront checkout
//! - Reception, scan and ledger endpoints
//! - SSE stream registration and frame contents
//! - JSON error envelope for malformed input

mod common;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use boutique_backend::{create_app, AppState};
use http_body_util::BodyExt;
use common::{admin_token, test_config, token_for, Fixture, JWT_SECRET};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use uuid::Uuid;

async fn app() -> (Fixture, AppState, Router) {
    let fx = Fixture::new().await;
    let state = fx.state(test_config());
    let router = create_app(state.clone());
    (fx, state, router)
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(router: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn order_body() -> Value {
    json!({
        "customer_name": "Yacine Haddad",
        "customer_phone": "0661 22 33 44",
        "wilaya_code": 31,
        "commune": "Bir El Djir",
        "items": [
            { "reference": "TS001", "size": "S", "quantity": 1 },
            { "reference": "ACC-01", "quantity": 2 }
        ]
    })
}

#[tokio::test]
async fn test_health_is_public() {
    let (_fx, _state, router) = app().await;
    let (status, body) = send(&router, request(Method::GET, "/api/v1/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_admin_routes_require_token() {
    let (_fx, _state, router) = app().await;
    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/inventory/receptions", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert!(body["error"]["message_fr"].is_string());
}

#[tokio::test]
async fn test_non_admin_is_forbidden() {
    let (_fx, _state, router) = app().await;
    let token = token_for(Uuid::new_v4(), "staff", JWT_SECRET, 3600);
    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/products", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");
}

#[tokio::test]
async fn test_expired_and_foreign_tokens() {
    let (_fx, _state, router) = app().await;

    let expired = token_for(Uuid::new_v4(), "admin", JWT_SECRET, -3600);
    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/facilities", Some(&expired), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "TOKEN_EXPIRED");

    let foreign = token_for(Uuid::new_v4(), "admin", "another-secret", 3600);
    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/facilities", Some(&foreign), None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
}

#[tokio::test]
async fn test_reception_lifecycle() {
    let (fx, _state, router) = app().await;
    let token = admin_token();

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/inventory/receptions",
            Some(&token),
            Some(json!({
                "facility_id": fx.facility.id,
                "items": [
                    { "product_name": "T-shirt oversize", "reference": "TS001", "size": "M", "quantity": 5 },
                    { "product_name": "Inconnu", "reference": "NOPE", "quantity": 1 }
                ]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["stock"]["applied"], 1);
    assert_eq!(body["stock"]["failed"], 1);
    assert_eq!(body["stock"]["results"][0]["status"], "success");
    assert_eq!(body["stock"]["results"][1]["status"], "failed");
    assert_eq!(fx.size_stock("TS001", "M").await, 15);

    let id = body["reception"]["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/inventory/receptions/{}", id);

    let (status, body) = send(&router, request(Method::GET, &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 2);

    let (status, _) = send(&router, request(Method::DELETE, &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = send(&router, request(Method::GET, &uri, Some(&token), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_reception_validation_error_names_field() {
    let (fx, _state, router) = app().await;
    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/inventory/receptions",
            Some(&admin_token()),
            Some(json!({
                "facility_id": fx.facility.id,
                "items": [{ "product_name": "T-shirt oversize", "reference": "TS001", "size": "M", "quantity": 0 }]
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "items[0].quantity");
}

/// Bodies, queries and path segments serde cannot decode still get the JSON envelope
#[tokio::test]
async fn test_malformed_input_is_rejected_as_json() {
    let (fx, _state, router) = app().await;
    let token = admin_token();

    let malformed = [
        request(
            Method::POST,
            "/api/v1/products/scan",
            Some(&token),
            Some(json!({ "barcode": "TS001-S", "action": "explode" })),
        ),
        request(
            Method::POST,
            "/api/v1/inventory/receptions",
            Some(&token),
            Some(json!({
                "facility_id": fx.facility.id,
                "items": [{ "product_name": "T-shirt oversize", "reference": "TS001", "size": "M" }]
            })),
        ),
        request(
            Method::GET,
            "/api/v1/inventory/validate-tracking?tracking_number=YAL-1&type=vente",
            Some(&token),
            None,
        ),
        request(
            Method::GET,
            "/api/v1/inventory/movements?limit=beaucoup",
            Some(&token),
            None,
        ),
        request(
            Method::GET,
            "/api/v1/inventory/receptions/not-a-uuid",
            Some(&token),
            None,
        ),
    ];

    for req in malformed {
        let uri = req.uri().to_string();
        let response = router.clone().oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{}", uri);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("application/json"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR", "{}", uri);
        assert!(body["error"]["message_fr"].is_string());
    }
    assert_eq!(fx.size_stock("TS001", "S").await, 5);
}

#[tokio::test]
async fn test_body_without_json_content_type_is_rejected() {
    let (_fx, _state, router) = app().await;
    let req = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/orders")
        .body(Body::from(order_body().to_string()))
        .unwrap();

    let (status, body) = send(&router, req).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(body["error"]["field"], "body");
}

#[tokio::test]
async fn test_scan_endpoint() {
    let (fx, _state, router) = app().await;
    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/products/scan",
            Some(&admin_token()),
            Some(json!({ "barcode": "TS001-S", "action": "remove" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["old_stock"], 5);
    assert_eq!(body["new_stock"], 4);
    assert_eq!(body["product_stock"], 14);
    assert!(body.get("movement").is_none());
    assert_eq!(fx.size_stock("TS001", "S").await, 4);

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/products/scan",
            Some(&admin_token()),
            Some(json!({ "barcode": "TS001-L", "action": "remove" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "action");
}

#[tokio::test]
async fn test_tracking_endpoints() {
    let (_fx, _state, router) = app().await;
    let token = admin_token();

    let (status, _) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/inventory/movements",
            Some(&token),
            Some(json!({
                "direction": "out",
                "category": "sortie",
                "reference": "TS001",
                "size": "M",
                "quantity": 1,
                "tracking_number": "YAL-777001"
            })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = send(
        &router,
        request(
            Method::GET,
            "/api/v1/inventory/validate-tracking?tracking_number=yal-777001&type=sortie",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], false);

    let (_, body) = send(
        &router,
        request(
            Method::GET,
            "/api/v1/inventory/validate-tracking?tracking_number=YAL-777001&type=retour",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(body["valid"], true);

    let (status, body) = send(
        &router,
        request(
            Method::GET,
            "/api/v1/inventory/lookup-sortie-by-tracking?tracking_number=YAL-777001",
            Some(&token),
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["found"], true);
    assert_eq!(body["movements"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_storefront_order_is_public_but_listing_is_not() {
    let (_fx, state, router) = app().await;
    let mut admin = state.notifier.hub().register(Uuid::new_v4());
    admin.try_next_event();

    let (status, body) = send(
        &router,
        request(Method::POST, "/api/v1/orders", None, Some(order_body())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["order_number"], "CMD-000001");
    assert_eq!(body["status"], "pending");
    assert!(admin.try_next_event().is_some());

    let (status, _) = send(&router, request(Method::GET, "/api/v1/orders", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/orders", Some(&admin_token()), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_order_with_bad_phone_is_rejected() {
    let (_fx, _state, router) = app().await;
    let mut body = order_body();
    body["customer_phone"] = json!("12345");

    let (status, body) = send(&router, request(Method::POST, "/api/v1/orders", None, Some(body))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "customer_phone");
}

#[tokio::test]
async fn test_sse_rejects_bad_token() {
    let (_fx, state, router) = app().await;
    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/sse/notifications?token=garbage", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "INVALID_TOKEN");
    assert_eq!(state.notifier.hub().connection_count(), 0);
}

/// The stream stays registered while the response is held
#[tokio::test]
async fn test_sse_registers_stream_until_dropped() {
    let (_fx, state, router) = app().await;
    let uri = format!("/api/v1/sse/notifications?token={}", admin_token());

    let response = router
        .clone()
        .oneshot(request(Method::GET, &uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers()[header::CONTENT_TYPE]
        .to_str()
        .unwrap()
        .starts_with("text/event-stream"));
    assert_eq!(state.notifier.hub().connection_count(), 1);

    drop(response);
    assert_eq!(state.notifier.hub().connection_count(), 0);
}

/// Next `data:` payload on an open SSE body, skipping keep-alive comments
async fn next_sse_event(body: &mut Body) -> Value {
    let mut buffer = String::new();
    loop {
        let frame = tokio::time::timeout(Duration::from_secs(5), body.frame())
            .await
            .expect("timed out waiting for an SSE frame")
            .expect("SSE stream ended")
            .unwrap();
        let Ok(data) = frame.into_data() else {
            continue;
        };
        buffer.push_str(std::str::from_utf8(&data).unwrap());

        while let Some(end) = buffer.find("\n\n") {
            let block: String = buffer.drain(..end + 2).collect();
            let payload: Vec<&str> = block
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if !payload.is_empty() {
                return serde_json::from_str(&payload.join("\n")).unwrap();
            }
        }
    }
}

/// A connected admin receives the greeting then the checkout as JSON frames
#[tokio::test]
async fn test_sse_streams_connected_then_new_order() {
    let (_fx, _state, router) = app().await;
    let uri = format!("/api/v1/sse/notifications?token={}", admin_token());

    let response = router
        .clone()
        .oneshot(request(Method::GET, &uri, None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let mut body = response.into_body();

    let connected = next_sse_event(&mut body).await;
    assert_eq!(connected["type"], "connected");
    assert!(connected["connection_id"].is_string());

    let (status, order) = send(
        &router,
        request(Method::POST, "/api/v1/orders", None, Some(order_body())),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let event = next_sse_event(&mut body).await;
    assert_eq!(event["type"], "new_order");
    assert_eq!(event["order_number"], "CMD-000001");
    assert_eq!(event["order_id"], order["id"]);
    assert_eq!(event["customer_name"], "Yacine Haddad");
    assert_eq!(event["wilaya_code"], 31);
    assert_eq!(event["item_count"], 2);
}

#[tokio::test]
async fn test_sse_without_token_is_unauthorized() {
    let (_fx, state, router) = app().await;
    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/sse/notifications", None, None),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"]["code"], "UNAUTHORIZED");
    assert_eq!(state.notifier.hub().connection_count(), 0);
}

#[tokio::test]
async fn test_catalog_endpoints() {
    let (_fx, _state, router) = app().await;
    let token = admin_token();

    let (status, body) = send(&router, request(Method::GET, "/api/v1/products", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    let references: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .map(|p| p["reference"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(references, vec!["ACC-01", "TS001"]);

    let (status, body) = send(
        &router,
        request(Method::GET, "/api/v1/products/TS001", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["kind"], "sized");
    assert_eq!(body["stock"], 15);

    let (status, _) = send(
        &router,
        request(Method::GET, "/api/v1/products/NOPE", Some(&token), None),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_facility_endpoints() {
    let (_fx, _state, router) = app().await;
    let token = admin_token();

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/facilities",
            Some(&token),
            Some(json!({ "name": "Atelier Oran", "phone": "0770 11 22 33" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["name"], "Atelier Oran");

    let (status, body) = send(
        &router,
        request(
            Method::POST,
            "/api/v1/facilities",
            Some(&token),
            Some(json!({ "name": "Atelier Blida", "phone": "021 00 00 00" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["field"], "phone");

    let (status, body) = send(&router, request(Method::GET, "/api/v1/facilities", Some(&token), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body.as_array().unwrap().len(), 2);
}
