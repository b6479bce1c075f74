use super::{ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{AuditFilter, AuditLog};
use crate::AppState;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/audit-logs", get(list_audit_logs))
}

async fn list_audit_logs(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<AuditFilter>,
) -> AppResult<Json<Vec<AuditLog>>> {
    user.require_role(&[])?;
    let page = pagination.page(&state.config);
    Ok(Json(state.audit.list(&filter, page).await?))
}
