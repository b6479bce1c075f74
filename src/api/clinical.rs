use super::{ApiJson, ApiPath, ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{
    CreateMedicalRecord, CreatePrescription, MedicalRecord, MedicalRecordFilter, Prescription,
    PrescriptionDetail, PrescriptionFilter, UpdateMedicalRecord, UpdatePrescription, UserRole,
};
use crate::services::clinical_service::DispenseRequest;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

const PRESCRIBERS: &[UserRole] = &[UserRole::Doctor];
const DISPENSERS: &[UserRole] = &[UserRole::Staff];
const CLINICIANS: &[UserRole] = &[UserRole::Doctor, UserRole::Nurse];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/prescriptions", get(list_prescriptions).post(create_prescription))
        .route(
            "/prescriptions/:id",
            get(get_prescription)
                .put(update_prescription)
                .delete(delete_prescription),
        )
        .route("/prescriptions/:id/dispensed", post(mark_dispensed))
        .route("/medical-records", get(list_records).post(create_record))
        .route(
            "/medical-records/:id",
            get(get_record).put(update_record).delete(delete_record),
        )
}

// Prescriptions

async fn list_prescriptions(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<PrescriptionFilter>,
) -> AppResult<Json<Vec<Prescription>>> {
    user.require_role(&[UserRole::Doctor, UserRole::Nurse, UserRole::Staff])?;
    let page = pagination.page(&state.config);
    Ok(Json(state.clinical.list_prescriptions(filter, page).await?))
}

async fn create_prescription(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreatePrescription>,
) -> AppResult<(StatusCode, Json<PrescriptionDetail>)> {
    user.require_role(PRESCRIBERS)?;
    let prescription = state.clinical.create_prescription(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(prescription)))
}

async fn get_prescription(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<PrescriptionDetail>> {
    user.require_role(&[UserRole::Doctor, UserRole::Nurse, UserRole::Staff])?;
    Ok(Json(state.clinical.get_prescription(id).await?))
}

async fn update_prescription(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdatePrescription>,
) -> AppResult<Json<PrescriptionDetail>> {
    user.require_role(PRESCRIBERS)?;
    Ok(Json(state.clinical.update_prescription(id, update, user.id()).await?))
}

async fn delete_prescription(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(&[])?;
    state.clinical.delete_prescription(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn mark_dispensed(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<DispenseRequest>,
) -> AppResult<Json<PrescriptionDetail>> {
    user.require_role(DISPENSERS)?;
    Ok(Json(state.clinical.mark_dispensed(id, request, user.user()).await?))
}

// Medical records

async fn list_records(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<MedicalRecordFilter>,
) -> AppResult<Json<Vec<MedicalRecord>>> {
    user.require_role(CLINICIANS)?;
    let page = pagination.page(&state.config);
    Ok(Json(state.clinical.list_records(filter, user.role(), page).await?))
}

async fn create_record(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateMedicalRecord>,
) -> AppResult<(StatusCode, Json<MedicalRecord>)> {
    user.require_role(CLINICIANS)?;
    let record = state.clinical.create_record(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn get_record(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<MedicalRecord>> {
    user.require_role(CLINICIANS)?;
    Ok(Json(state.clinical.get_record(id, user.role()).await?))
}

async fn update_record(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateMedicalRecord>,
) -> AppResult<Json<MedicalRecord>> {
    user.require_role(CLINICIANS)?;
    Ok(Json(
        state
            .clinical
            .update_record(id, update, user.role(), user.id())
            .await?,
    ))
}

async fn delete_record(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(&[])?;
    state.clinical.delete_record(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
