use crate::auth::CurrentUser;
use crate::models::UserResponse;
use crate::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/protected", get(protected))
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Hospital backend is running" }))
}

/// Liveness plus a database round trip
async fn health(State(state): State<Arc<AppState>>) -> Json<Value> {
    let database = match state.database.ping().await {
        Ok(()) => true,
        Err(e) => {
            warn!("Health check could not reach the database: {}", e);
            false
        }
    };

    Json(json!({
        "status": "ok",
        "environment": state.config.environment,
        "database": database,
    }))
}

async fn protected(user: CurrentUser) -> Json<Value> {
    Json(json!({
        "message": format!("Hello, {}", user.user().display_name()),
        "user": UserResponse::from(user.user()),
    }))
}
