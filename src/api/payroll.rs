use super::{ApiJson, ApiPath, ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{
    ApprovePayroll, GeneratePayroll, PayPayroll, Payroll, PayrollFilter, PayrollPeriod,
    PayrollSummary,
};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

/// Admin only
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/payroll", get(list_payrolls).post(generate_payroll))
        .route("/payroll/summary", get(summary))
        .route("/payroll/:id", get(get_payroll))
        .route("/payroll/:id/approve", post(approve))
        .route("/payroll/:id/pay", post(pay))
        .route("/payroll/:id/hold", post(hold))
        .route("/payroll/:id/resume", post(resume))
        .route("/payroll/:id/cancel", post(cancel))
}

async fn generate_payroll(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<GeneratePayroll>,
) -> AppResult<(StatusCode, Json<Payroll>)> {
    user.require_role(&[])?;
    let payroll = state.payroll.generate(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(payroll)))
}

async fn list_payrolls(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<PayrollFilter>,
) -> AppResult<Json<Vec<Payroll>>> {
    user.require_role(&[])?;
    let page = pagination.page(&state.config);
    Ok(Json(state.payroll.list(filter, page).await?))
}

async fn summary(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiQuery(period): ApiQuery<PayrollPeriod>,
) -> AppResult<Json<PayrollSummary>> {
    user.require_role(&[])?;
    Ok(Json(state.payroll.summary(period.month, period.year).await?))
}

async fn get_payroll(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Payroll>> {
    user.require_role(&[])?;
    Ok(Json(state.payroll.get(id).await?))
}

/// Approver defaults to the caller's display name
async fn approve(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<ApprovePayroll>>,
) -> AppResult<Json<Payroll>> {
    user.require_role(&[])?;
    let approved_by = body
        .and_then(|ApiJson(request)| request.approved_by)
        .filter(|name| !name.trim().is_empty())
        .unwrap_or_else(|| user.user().display_name());
    Ok(Json(state.payroll.approve(id, approved_by, user.id()).await?))
}

async fn pay(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<PayPayroll>,
) -> AppResult<Json<Payroll>> {
    user.require_role(&[])?;
    Ok(Json(state.payroll.pay(id, request, user.id()).await?))
}

async fn hold(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Payroll>> {
    user.require_role(&[])?;
    Ok(Json(state.payroll.hold(id, user.id()).await?))
}

async fn resume(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Payroll>> {
    user.require_role(&[])?;
    Ok(Json(state.payroll.resume(id, user.id()).await?))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Payroll>> {
    user.require_role(&[])?;
    Ok(Json(state.payroll.cancel(id, user.id()).await?))
}
