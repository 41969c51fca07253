//! End-to-end checks through the router: login, bearer extraction, permission
//! gating and the response envelope.

mod common;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use common::TestApp;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tower::util::ServiceExt;
use warehouse_api::{
    api_v1_routes,
    auth::{auth_routes, AuthConfig, AuthService},
    config::AppConfig,
    entities::user::UserRole,
    services::users::NewUser,
    AppState, events::EventSender,
};

const TEST_SECRET: &str =
    "an-integration-test-secret-that-is-definitely-at-least-64-characters-long!!";

fn test_config() -> AppConfig {
    // Deserialization path mirrors production config loading.
    let raw = json!({
        "database_url": "sqlite::memory:",
        "jwt_secret": TEST_SECRET,
        "environment": "development",
    });
    serde_json::from_value(raw).expect("test config")
}

async fn build_router(app: &TestApp) -> (Router, Arc<AuthService>) {
    let auth_service = Arc::new(AuthService::new(
        AuthConfig::new(
            TEST_SECRET.to_string(),
            Duration::from_secs(600),
            Duration::from_secs(3600),
        ),
        app.db.clone(),
    ));

    let (tx, _rx) = tokio::sync::mpsc::channel(8);
    let state = AppState {
        db: app.db.clone(),
        config: test_config(),
        event_sender: EventSender::new(tx),
        services: app.services.clone(),
    };

    let router = Router::new()
        .nest("/api/v1", api_v1_routes())
        .nest("/auth", auth_routes().with_state(auth_service.clone()))
        .layer(axum::middleware::from_fn_with_state(
            auth_service.clone(),
            |axum::extract::State(auth): axum::extract::State<Arc<AuthService>>,
             mut req: axum::http::Request<axum::body::Body>,
             next: axum::middleware::Next| async move {
                req.extensions_mut().insert(auth);
                next.run(req).await
            },
        ))
        .with_state(state);

    (router, auth_service)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&bytes).expect("json body")
}

async fn login(router: &Router, email: &str, password: &str) -> Value {
    let request = Request::builder()
        .method(Method::POST)
        .uri("/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({ "email": email, "password": password }).to_string(),
        ))
        .unwrap();
    let response = router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn unauthenticated_requests_are_rejected() {
    let app = TestApp::new().await;
    let (router, _) = build_router(&app).await;

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/inventory")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_token_passes_permission_gates() {
    let app = TestApp::new().await;
    app.services
        .users
        .create(NewUser {
            name: "Admin".into(),
            email: "admin@example.com".into(),
            password: "correct-horse-battery".into(),
            role: UserRole::Admin,
            permissions: vec![],
        })
        .await
        .unwrap();

    let (router, _) = build_router(&app).await;
    let tokens = login(&router, "admin@example.com", "correct-horse-battery").await;
    let access = tokens["access_token"].as_str().expect("access token");

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/inventory")
                .header(header::AUTHORIZATION, format!("Bearer {}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert!(body["data"]["items"].is_array());
}

#[tokio::test]
async fn missing_permission_is_forbidden() {
    let app = TestApp::new().await;
    app.services
        .users
        .create(NewUser {
            name: "Viewer".into(),
            email: "viewer@example.com".into(),
            password: "correct-horse-battery".into(),
            role: UserRole::User,
            permissions: vec!["deliveries:read".into()],
        })
        .await
        .unwrap();

    let (router, _) = build_router(&app).await;
    let tokens = login(&router, "viewer@example.com", "correct-horse-battery").await;
    let access = tokens["access_token"].as_str().expect("access token");

    // Granted scope works.
    let allowed = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/v1/deliveries")
                .header(header::AUTHORIZATION, format!("Bearer {}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(allowed.status(), StatusCode::OK);

    // Everything else is forbidden.
    let denied = router
        .oneshot(
            Request::builder()
                .uri("/api/v1/inventory")
                .header(header::AUTHORIZATION, format!("Bearer {}", access))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(denied.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn bad_credentials_do_not_issue_tokens() {
    let app = TestApp::new().await;
    app.services
        .users
        .create(NewUser {
            name: "User".into(),
            email: "user@example.com".into(),
            password: "correct-horse-battery".into(),
            role: UserRole::User,
            permissions: vec![],
        })
        .await
        .unwrap();

    let (router, _) = build_router(&app).await;

    let response = router
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri("/auth/login")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "user@example.com", "password": "wrong" }).to_string(),
                ))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}
