#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use sqlx::PgPool;
use tower::ServiceExt;

use crowdfund_api::auth::jwt::{generate_access_token, JwtConfig};
use crowdfund_api::auth::password::hash_password;
use crowdfund_api::config::ServerConfig;
use crowdfund_api::router::build_app_router;
use crowdfund_api::state::AppState;
use crowdfund_core::project_state::ProjectState;
use crowdfund_core::types::DbId;
use crowdfund_db::models::notification::ProjectNotification;
use crowdfund_db::models::project::{CreateProject, Project};
use crowdfund_db::models::user::{CreateUser, User};
use crowdfund_db::repositories::{ProjectNotificationRepo, ProjectRepo, UserRepo};
use crowdfund_events::{EventBus, NotificationDispatcher};

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 60,
        },
        project_finish_interval_secs: 300,
        notification_retry_interval_secs: 600,
    }
}

/// Build the full application router over `pool`, with an in-app
/// notification dispatcher listening on the event bus.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let event_bus = Arc::new(EventBus::default());

    let dispatcher = NotificationDispatcher::new(pool.clone(), None);
    let receiver = event_bus.subscribe();
    tokio::spawn(async move { dispatcher.run(receiver).await });

    let state = AppState::new(pool, config.clone(), event_bus);
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_vec(&json).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}

pub async fn get(app: Router, uri: &str) -> Response {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

/// Read a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// Assert the status and return the JSON body.
pub async fn expect_json(response: Response, status: StatusCode) -> serde_json::Value {
    assert_eq!(response.status(), status);
    body_json(response).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

pub const TEST_PASSWORD: &str = "test_password_123!";

/// Create a user directly in the database and return it with a valid token.
pub async fn create_user(pool: &PgPool, name: &str, role: &str) -> (User, String) {
    let input = CreateUser {
        name: name.to_string(),
        email: format!("{name}@test.com"),
        password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
        role: Some(role.to_string()),
    };
    let user = UserRepo::create(pool, &input)
        .await
        .expect("user creation should succeed");
    let token = generate_access_token(user.id, &user.role, &test_config().jwt)
        .expect("token generation should succeed");
    (user, token)
}

/// Create a project owned by `owner_id` and move it to `state`.
///
/// Launched states get an online date of now, so their window is open.
pub async fn create_project(
    pool: &PgPool,
    owner_id: DbId,
    goal: Decimal,
    state: ProjectState,
) -> Project {
    let input = CreateProject {
        name: "Community Garden".to_string(),
        headline: Some("Grow food together".to_string()),
        summary: Some("Raised beds for the neighborhood.".to_string()),
        goal,
        online_days: 30,
        location: Some("Porto Alegre, RS".to_string()),
        address_neighborhood: Some("Centro".to_string()),
        video_url: None,
        video_thumbnail_url: None,
        uploaded_image_url: None,
        organization_type: None,
    };
    let project = ProjectRepo::create(pool, owner_id, &input)
        .await
        .expect("project creation should succeed");
    if state == ProjectState::Draft {
        return project;
    }
    let online_date = state.is_launched().then(chrono::Utc::now);
    ProjectRepo::set_state(pool, project.id, ProjectState::Draft, state, online_date)
        .await
        .expect("state change should succeed")
        .expect("project should still be a draft")
}

/// Wait until the dispatcher has recorded the `project_success` ledger entry.
pub async fn wait_for_success_notification(
    pool: &PgPool,
    project_id: DbId,
) -> Option<ProjectNotification> {
    for _ in 0..50 {
        let entry =
            ProjectNotificationRepo::find_by_project_kind(pool, project_id, "project_success")
                .await
                .expect("ledger query should succeed");
        if entry.as_ref().is_some_and(|e| e.is_delivered()) {
            return entry;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    None
}
