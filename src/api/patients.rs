use super::{ApiJson, ApiPath, ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{CreatePatient, PatientResponse, UpdatePatient, UserRole};
use crate::repositories::PatientFilter;
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

/// Clinical and front-desk roles may change patient records
const WRITERS: &[UserRole] = &[UserRole::Doctor, UserRole::Nurse, UserRole::Staff];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/patients", get(list_patients).post(create_patient))
        .route(
            "/patients/:id",
            get(get_patient).put(update_patient).delete(delete_patient),
        )
        .route("/patients/:id/discharge", post(discharge_patient))
}

async fn list_patients(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<PatientFilter>,
) -> AppResult<Json<Vec<PatientResponse>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.patients.list(&filter, page).await?))
}

async fn create_patient(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreatePatient>,
) -> AppResult<(StatusCode, Json<PatientResponse>)> {
    user.require_role(WRITERS)?;
    let patient = state.patients.create(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(patient)))
}

async fn get_patient(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<PatientResponse>> {
    Ok(Json(state.patients.get(id).await?))
}

async fn update_patient(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdatePatient>,
) -> AppResult<Json<PatientResponse>> {
    user.require_role(WRITERS)?;
    Ok(Json(state.patients.update(id, update, user.id()).await?))
}

async fn delete_patient(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(WRITERS)?;
    state.patients.delete(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn discharge_patient(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<PatientResponse>> {
    user.require_role(WRITERS)?;
    Ok(Json(state.patients.discharge(id, user.id()).await?))
}
