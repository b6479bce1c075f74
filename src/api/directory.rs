use super::{ApiJson, ApiPath, ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{
    CreateDepartment, CreateDoctor, CreateStaff, Department, Doctor, DoctorFilter, Staff,
    StaffFilter, UpdateDepartment, UpdateDoctor, UpdateStaff,
};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, put};
use axum::{Json, Router};
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepartmentQuery {
    pub status: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityRequest {
    pub is_available: bool,
}

/// Departments, doctors and staff; only admins may change them
pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/departments", get(list_departments).post(create_department))
        .route(
            "/departments/:id",
            get(get_department)
                .put(update_department)
                .delete(delete_department),
        )
        .route("/doctors", get(list_doctors).post(create_doctor))
        .route(
            "/doctors/:id",
            get(get_doctor).put(update_doctor).delete(delete_doctor),
        )
        .route("/doctors/:id/availability", put(set_availability))
        .route("/staff", get(list_staff).post(create_staff))
        .route(
            "/staff/:id",
            get(get_staff).put(update_staff).delete(delete_staff),
        )
}

// Departments

async fn list_departments(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(query): ApiQuery<DepartmentQuery>,
) -> AppResult<Json<Vec<Department>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.directory.list_departments(query.status, page).await?))
}

async fn create_department(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateDepartment>,
) -> AppResult<(StatusCode, Json<Department>)> {
    user.require_role(&[])?;
    let department = state.directory.create_department(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(department)))
}

async fn get_department(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Department>> {
    Ok(Json(state.directory.get_department(id).await?))
}

async fn update_department(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateDepartment>,
) -> AppResult<Json<Department>> {
    user.require_role(&[])?;
    Ok(Json(
        state.directory.update_department(id, update, user.id()).await?,
    ))
}

async fn delete_department(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(&[])?;
    state.directory.delete_department(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Doctors

async fn list_doctors(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<DoctorFilter>,
) -> AppResult<Json<Vec<Doctor>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.directory.list_doctors(&filter, page).await?))
}

async fn create_doctor(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateDoctor>,
) -> AppResult<(StatusCode, Json<Doctor>)> {
    user.require_role(&[])?;
    let doctor = state.directory.create_doctor(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(doctor)))
}

async fn get_doctor(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Doctor>> {
    Ok(Json(state.directory.get_doctor(id).await?))
}

async fn update_doctor(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateDoctor>,
) -> AppResult<Json<Doctor>> {
    user.require_role(&[])?;
    Ok(Json(state.directory.update_doctor(id, update, user.id()).await?))
}

async fn set_availability(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AvailabilityRequest>,
) -> AppResult<Json<Doctor>> {
    user.require_role(&[])?;
    Ok(Json(
        state
            .directory
            .set_doctor_availability(id, request.is_available, user.id())
            .await?,
    ))
}

async fn delete_doctor(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(&[])?;
    state.directory.delete_doctor(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Staff

async fn list_staff(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<StaffFilter>,
) -> AppResult<Json<Vec<Staff>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.directory.list_staff(&filter, page).await?))
}

async fn create_staff(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateStaff>,
) -> AppResult<(StatusCode, Json<Staff>)> {
    user.require_role(&[])?;
    let staff = state.directory.create_staff(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(staff)))
}

async fn get_staff(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Staff>> {
    Ok(Json(state.directory.get_staff(id).await?))
}

async fn update_staff(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateStaff>,
) -> AppResult<Json<Staff>> {
    user.require_role(&[])?;
    Ok(Json(state.directory.update_staff(id, update, user.id()).await?))
}

async fn delete_staff(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(&[])?;
    state.directory.delete_staff(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}
