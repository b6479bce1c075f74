//! HTTP tests that run the router in-process.
//!
//! Every request here is answered before any query reaches the database, so
//! no server is required.

mod helpers;

use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use helpers::*;
use hospital_backend::api;
use hospital_backend::auth::TokenType;
use serde_json::json;
use tower::ServiceExt;
use uuid::Uuid;

// ============================================================================
// System endpoints
// ============================================================================

#[tokio::test]
async fn test_root_reports_running() {
    let (app, _) = lazy_app();

    let response = app.oneshot(get("/", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body, json!({ "message": "Hospital backend is running" }));
}

#[tokio::test]
async fn test_health_without_database() {
    let (app, _) = lazy_app();

    let response = app.oneshot(get("/health", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "testing");
    assert_eq!(body["database"], false);
}

#[tokio::test]
async fn test_request_id_is_generated_and_propagated() {
    let (app, _) = lazy_app();

    let response = app.clone().oneshot(get("/", None)).await.unwrap();
    let generated = response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .expect("request id header");
    assert!(Uuid::parse_str(generated).is_ok());

    let request = Request::builder()
        .uri("/")
        .header("x-request-id", "trace-me-42")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.headers()["x-request-id"], "trace-me-42");
}

// ============================================================================
// Authentication guard
// ============================================================================

#[tokio::test]
async fn test_protected_requires_token() {
    let (app, _) = lazy_app();

    let response = app.oneshot(get("/protected", None)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()[header::WWW_AUTHENTICATE], "Bearer");
    let body = read_json(response).await;
    assert_eq!(body["code"], "UNAUTHORIZED");
    assert_eq!(body["detail"], "Invalid or expired token");
}

#[tokio::test]
async fn test_resource_routes_reject_garbage_tokens() {
    let (app, _) = lazy_app();

    for uri in [
        "/patients",
        "/billing",
        "/payroll",
        "/audit-logs",
        "/auth/me",
        "/shifts",
        "/schedules",
        "/prescriptions",
        "/medical-records",
    ] {
        let response = app
            .clone()
            .oneshot(get(uri, Some("Bearer not-a-jwt")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{}", uri);
    }
}

#[tokio::test]
async fn test_refresh_token_cannot_be_used_as_access_token() {
    let (app, state) = lazy_app();
    let refresh = state.tokens.issue(Uuid::new_v4(), TokenType::Refresh).unwrap();

    let response = app
        .oneshot(get("/protected", Some(&format!("Bearer {}", refresh))))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = read_json(response).await;
    assert_eq!(body["detail"], "Invalid token type");
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let (app, state) = lazy_app();
    let access = state.tokens.issue(Uuid::new_v4(), TokenType::Access).unwrap();

    let response = app
        .oneshot(send_json(
            "POST",
            "/auth/refresh",
            None,
            &json!({ "refresh_token": access }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

// ============================================================================
// Input validation
// ============================================================================

#[tokio::test]
async fn test_malformed_json_is_a_validation_error() {
    let (app, _) = lazy_app();

    let request = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{\"email\": "))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_missing_required_field_is_a_validation_error() {
    let (app, _) = lazy_app();

    let response = app
        .oneshot(send_json(
            "POST",
            "/auth/register",
            None,
            &json!({ "email": "new.user@example.com" }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = read_json(response).await;
    assert_eq!(body["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn test_register_rejects_bad_input_before_storage() {
    let (app, _) = lazy_app();

    let cases = [
        (
            json!({ "password": TEST_PASSWORD }),
            "Either email or phone is required",
        ),
        (
            json!({ "email": "not-an-email", "password": TEST_PASSWORD }),
            "Invalid email address: not-an-email",
        ),
        (
            json!({ "email": "new.user@example.com", "password": "short" }),
            "Password must be at least 8 characters long",
        ),
        (
            json!({ "email": "new.user@example.com", "password": TEST_PASSWORD, "role": "janitor" }),
            "Invalid role: janitor. Must be one of: user, admin, doctor, nurse, patient, staff",
        ),
    ];

    for (payload, detail) in cases {
        let response = app
            .clone()
            .oneshot(send_json("POST", "/auth/register", None, &payload))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = read_json(response).await;
        assert_eq!(body["detail"], detail);
    }
}

#[tokio::test]
async fn test_admin_self_registration_is_gated() {
    let (app, _) = lazy_app();
    let payload = json!({ "email": "root@example.com", "password": TEST_PASSWORD, "role": "Admin" });

    let response = app
        .oneshot(send_json("POST", "/auth/register", None, &payload))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    let body = read_json(response).await;
    assert_eq!(body["detail"], "Admin accounts cannot be self-registered");
}

#[tokio::test]
async fn test_login_requires_contact() {
    let (app, _) = lazy_app();

    let response = app
        .oneshot(send_json(
            "POST",
            "/auth/login",
            None,
            &json!({ "email": "  ", "password": TEST_PASSWORD }),
        ))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ============================================================================
// CORS
// ============================================================================

#[tokio::test]
async fn test_cors_preflight_allows_configured_frontend() {
    let mut config = test_config();
    config.frontend_url = Some("https://app.hospital.test".to_string());
    let app = api::router(lazy_state(config));

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/patients")
        .header(header::ORIGIN, "https://app.hospital.test")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://app.hospital.test"
    );
    assert_eq!(response.headers()[header::ACCESS_CONTROL_ALLOW_CREDENTIALS], "true");
}

#[tokio::test]
async fn test_cors_ignores_unknown_origin() {
    let (app, _) = lazy_app();

    let request = Request::builder()
        .uri("/")
        .header(header::ORIGIN, "https://evil.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .is_none());
}
