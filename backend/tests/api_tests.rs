//! HTTP API tests
//!
//! Drives the full router over the in-memory store: authentication, the
//! success and error body shapes, and permission checks.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Utc;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

use common::Harness;
use factory_ledger::config::{DatabaseConfig, JwtConfig, LedgerConfig, ServerConfig};
use factory_ledger::middleware::Claims;
use factory_ledger::{create_app, AppState, Config};
use shared::{BatchStatus, Location};

const SECRET: &str = "api-test-secret";

fn test_config() -> Config {
    Config {
        environment: "test".to_string(),
        server: ServerConfig {
            port: 0,
            host: "127.0.0.1".to_string(),
        },
        database: DatabaseConfig {
            url: "memory://".to_string(),
            max_connections: 1,
            min_connections: 1,
            lock_timeout_ms: 1000,
        },
        jwt: JwtConfig {
            secret: SECRET.to_string(),
        },
        ledger: LedgerConfig::default(),
    }
}

/// Router over the harness's store, so seeded rows are visible over HTTP
fn app(h: &Harness) -> Router {
    create_app(AppState::new(Arc::new(h.store.clone()), test_config()))
}

fn token(user_id: Uuid, permissions: &[&str]) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: user_id.to_string(),
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
        exp: now + 3600,
        iat: now,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET.as_bytes())).unwrap()
}

async fn send(app: &Router, method: Method, uri: &str, bearer: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(bearer) = bearer {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", bearer));
    }
    let request = match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, value)
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_is_public() {
        let h = Harness::new();
        let app = app(&h);

        for uri in ["/health", "/api/v1/health"] {
            let (status, body) = send(&app, Method::GET, uri, None, None).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(body["status"], "healthy");
            assert_eq!(body["store"], "connected");
        }
    }

    #[tokio::test]
    async fn test_protected_routes_require_a_valid_token() {
        let h = Harness::new();
        let app = app(&h);

        let (status, body) = send(&app, Method::GET, "/api/v1/batches", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "UNAUTHORIZED");

        let (status, _) = send(&app, Method::GET, "/api/v1/batches", Some("not-a-jwt"), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = send(&app, Method::GET, "/api/v1/batches", Some(&token(h.actor, &[])), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!([]));
    }

    #[tokio::test]
    async fn test_purchase_success_shape() {
        let h = Harness::new();
        let cotton = h.material("Cotton", "0").await;
        let fund = h.fund(h.actor, "500").await;
        let app = app(&h);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/purchases",
            Some(&token(h.actor, &[])),
            Some(json!({
                "material_id": cotton.id,
                "quantity": "4",
                "unit_price": "25",
                "vendor_name": "Textile Mills Ltd",
                "purchase_date": "2024-10-16",
                "fund_id": fund.id
            })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert!(body["purchase_id"].as_str().is_some());
        assert!(body.get("total_amount").is_some());

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/funds/{}", fund.id),
            Some(&token(h.actor, &[])),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "active");
    }

    #[tokio::test]
    async fn test_fund_usage_uses_type_field() {
        let h = Harness::new();
        let fund = h.fund(h.actor, "100").await;
        let app = app(&h);
        let bearer = token(h.actor, &[]);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/funds/usages",
            Some(&bearer),
            Some(json!({ "fund_id": fund.id, "amount": "100", "type": "expense" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);

        let (status, body) = send(&app, Method::GET, "/api/v1/funds/summary", Some(&bearer), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["depleted_funds"], 1);
    }

    #[tokio::test]
    async fn test_conflict_error_shape() {
        let h = Harness::new();
        let product = h.product("SHIRT-01").await;
        let batch = h.stocked_batch(product.id, 10).await;
        let app = app(&h);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/inventory/transfers",
            Some(&token(h.actor, &[])),
            Some(json!({
                "product_id": product.id,
                "batch_id": batch.id,
                "quantity": 25,
                "from_location": "manufacturing",
                "to_location": "transit"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_INVENTORY");
        assert_eq!(body["error"]["retryable"], false);
        assert!(body["error"].get("field").is_none());
        assert_eq!(h.quantity_at(product.id, Some(batch.id), Location::Manufacturing).await, 10);
    }

    #[tokio::test]
    async fn test_validation_error_names_the_field() {
        let h = Harness::new();
        let product = h.product("SHIRT-01").await;
        let app = app(&h);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/inventory/transfers",
            Some(&token(h.actor, &[])),
            Some(json!({
                "product_id": product.id,
                "quantity": 0,
                "from_location": "manufacturing",
                "to_location": "transit"
            })),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
        assert_eq!(body["error"]["field"], "quantity");
    }

    #[tokio::test]
    async fn test_duplicate_sku_is_409() {
        let h = Harness::new();
        h.product("SHIRT-01").await;
        let app = app(&h);

        let (status, body) = send(
            &app,
            Method::POST,
            "/api/v1/products",
            Some(&token(h.actor, &[])),
            Some(json!({ "name": "Shirt", "sku": "shirt-01" })),
        )
        .await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "DUPLICATE");
        assert_eq!(body["error"]["retryable"], false);
    }

    #[tokio::test]
    async fn test_status_advance_requires_permission() {
        let h = Harness::new();
        let product = h.product("SHIRT-01").await;
        let batch = h.batch_at(product.id, 10, BatchStatus::Pending).await;
        let app = app(&h);
        let uri = format!("/api/v1/batches/{}/status", batch.id);

        let (status, body) = send(
            &app,
            Method::POST,
            &uri,
            Some(&token(h.actor, &[])),
            Some(json!({ "new_status": "cutting" })),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
        assert_eq!(body["error"]["code"], "INSUFFICIENT_PERMISSIONS");

        let supervisor = token(h.actor, &["batches:advance"]);
        let (status, body) = send(
            &app,
            Method::POST,
            &uri,
            Some(&supervisor),
            Some(json!({ "new_status": "cutting" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["status"], "cutting");
        assert_eq!(body["completion_date"], Value::Null);

        let (status, body) = send(
            &app,
            Method::POST,
            &uri,
            Some(&supervisor),
            Some(json!({ "new_status": "packaging" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["error"]["code"], "INVALID_TRANSITION");

        let (status, body) = send(
            &app,
            Method::POST,
            &uri,
            Some(&supervisor),
            Some(json!({ "new_status": "dyeing" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["field"], "new_status");
    }

    #[tokio::test]
    async fn test_unknown_batch_is_404() {
        let h = Harness::new();
        let app = app(&h);

        let (status, body) = send(
            &app,
            Method::GET,
            &format!("/api/v1/batches/{}", Uuid::new_v4()),
            Some(&token(h.actor, &[])),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}
