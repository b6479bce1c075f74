use super::ApiJson;
use crate::auth::{CurrentUser, TokenPair};
use crate::error::AppResult;
use crate::models::UserResponse;
use crate::services::auth_service::{
    AccessTokenResponse, ContactRequest, LoginRequest, LoginResponse, MessageResponse,
    RefreshRequest, RegisterRequest, RegisterResponse, VerifyOtpRequest,
};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;

/// Mounted under `/auth`
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/verify-otp", post(verify_otp))
        .route("/verify-account", post(verify_account))
        .route("/refresh", post(refresh))
        .route("/resend-otp", post(resend_otp))
        .route("/me", get(me))
}

async fn register(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<RegisterResponse>)> {
    let response = state.auth.register(request).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

async fn login(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    Ok(Json(state.auth.login(request).await?))
}

async fn verify_otp(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<VerifyOtpRequest>,
) -> AppResult<Json<TokenPair>> {
    Ok(Json(state.auth.verify_otp(request).await?))
}

async fn verify_account(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<VerifyOtpRequest>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(state.auth.verify_account(request).await?))
}

async fn refresh(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<RefreshRequest>,
) -> AppResult<Json<AccessTokenResponse>> {
    Ok(Json(state.auth.refresh(request).await?))
}

async fn resend_otp(
    State(state): State<Arc<AppState>>,
    ApiJson(request): ApiJson<ContactRequest>,
) -> AppResult<Json<MessageResponse>> {
    Ok(Json(state.auth.resend_otp(request).await?))
}

async fn me(user: CurrentUser) -> Json<UserResponse> {
    Json(UserResponse::from(user.user()))
}
