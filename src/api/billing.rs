use super::{ApiJson, ApiPath, ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{
    CreateInvoice, Invoice, InvoiceDetail, InvoiceFilter, Payment, RecordPayment, RefundPayment,
    UserRole,
};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

/// Billing is restricted to admins and front-office staff
const BILLING: &[UserRole] = &[UserRole::Staff];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/billing", get(list_invoices).post(create_invoice))
        .route("/billing/:id", get(get_invoice))
        .route("/billing/:id/cancel", post(cancel_invoice))
        .route("/billing/:id/payments", post(record_payment))
        .route("/payments/:id", get(get_payment))
        .route("/payments/:id/refund", post(refund_payment))
}

async fn create_invoice(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateInvoice>,
) -> AppResult<(StatusCode, Json<InvoiceDetail>)> {
    user.require_role(BILLING)?;
    let invoice = state.billing.create_invoice(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(invoice)))
}

async fn list_invoices(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<InvoiceFilter>,
) -> AppResult<Json<Vec<Invoice>>> {
    user.require_role(BILLING)?;
    let page = pagination.page(&state.config);
    Ok(Json(state.billing.list_invoices(filter, page).await?))
}

async fn get_invoice(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<InvoiceDetail>> {
    user.require_role(BILLING)?;
    Ok(Json(state.billing.get_invoice(id).await?))
}

async fn cancel_invoice(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Invoice>> {
    user.require_role(BILLING)?;
    Ok(Json(state.billing.cancel_invoice(id, user.id()).await?))
}

async fn record_payment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(input): ApiJson<RecordPayment>,
) -> AppResult<(StatusCode, Json<Payment>)> {
    user.require_role(BILLING)?;
    let payment = state
        .billing
        .record_payment(id, input, user.user().display_name(), user.id())
        .await?;
    Ok((StatusCode::CREATED, Json(payment)))
}

async fn get_payment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Payment>> {
    user.require_role(BILLING)?;
    Ok(Json(state.billing.get_payment(id).await?))
}

async fn refund_payment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RefundPayment>,
) -> AppResult<Json<Payment>> {
    user.require_role(BILLING)?;
    Ok(Json(
        state.billing.refund_payment(id, request, user.id()).await?,
    ))
}
