use super::{ApiJson, ApiPath, ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{
    CreateMedicine, Dispensation, DispensationFilter, DispenseRequest, MedicineFilter,
    MedicineResponse, ReturnDispensation, StockAdjustment, UpdateMedicine, UserRole,
};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

const PHARMACY: &[UserRole] = &[UserRole::Staff];

#[derive(Debug, Clone, Deserialize)]
pub struct ExpiringQuery {
    #[serde(default = "default_expiry_days")]
    pub days: i64,
}

fn default_expiry_days() -> i64 {
    30
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/medicines", get(list_medicines).post(create_medicine))
        .route("/medicines/low-stock", get(low_stock))
        .route("/medicines/expiring", get(expiring))
        .route(
            "/medicines/:id",
            get(get_medicine).put(update_medicine).delete(delete_medicine),
        )
        .route("/medicines/:id/stock", post(adjust_stock))
        .route("/pharmacy", get(list_dispensations).post(dispense))
        .route("/pharmacy/:id", get(get_dispensation))
        .route("/pharmacy/:id/return", post(return_dispensation))
}

// Medicines

async fn list_medicines(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<MedicineFilter>,
) -> AppResult<Json<Vec<MedicineResponse>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.pharmacy.list_medicines(filter, page).await?))
}

async fn create_medicine(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateMedicine>,
) -> AppResult<(StatusCode, Json<MedicineResponse>)> {
    user.require_role(PHARMACY)?;
    let medicine = state.pharmacy.create_medicine(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(medicine)))
}

async fn low_stock(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
) -> AppResult<Json<Vec<MedicineResponse>>> {
    Ok(Json(state.pharmacy.low_stock().await?))
}

async fn expiring(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(query): ApiQuery<ExpiringQuery>,
) -> AppResult<Json<Vec<MedicineResponse>>> {
    Ok(Json(state.pharmacy.expiring_within(query.days).await?))
}

async fn get_medicine(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MedicineResponse>> {
    Ok(Json(state.pharmacy.get_medicine(id).await?))
}

async fn update_medicine(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateMedicine>,
) -> AppResult<Json<MedicineResponse>> {
    user.require_role(PHARMACY)?;
    Ok(Json(
        state.pharmacy.update_medicine(id, update, user.id()).await?,
    ))
}

async fn delete_medicine(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(PHARMACY)?;
    state.pharmacy.delete_medicine(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn adjust_stock(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(adjustment): ApiJson<StockAdjustment>,
) -> AppResult<Json<MedicineResponse>> {
    user.require_role(PHARMACY)?;
    Ok(Json(
        state.pharmacy.adjust_stock(id, adjustment, user.id()).await?,
    ))
}

// Dispensations

async fn dispense(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(request): ApiJson<DispenseRequest>,
) -> AppResult<(StatusCode, Json<Dispensation>)> {
    user.require_role(PHARMACY)?;
    let dispensation = state
        .pharmacy
        .dispense(request, user.user().display_name(), user.id())
        .await?;
    Ok((StatusCode::CREATED, Json(dispensation)))
}

async fn list_dispensations(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<DispensationFilter>,
) -> AppResult<Json<Vec<Dispensation>>> {
    user.require_role(PHARMACY)?;
    let page = pagination.page(&state.config);
    Ok(Json(state.pharmacy.list_dispensations(filter, page).await?))
}

async fn get_dispensation(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Dispensation>> {
    user.require_role(PHARMACY)?;
    Ok(Json(state.pharmacy.get_dispensation(id).await?))
}

async fn return_dispensation(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<ReturnDispensation>,
) -> AppResult<Json<Dispensation>> {
    user.require_role(PHARMACY)?;
    Ok(Json(
        state
            .pharmacy
            .return_dispensation(id, &request.reason, user.id())
            .await?,
    ))
}
