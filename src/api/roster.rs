use super::{ApiJson, ApiPath, ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{
    CreateSchedule, CreateShift, ScheduleDetail, ScheduleFilter, UpdateSchedule, UpdateShift,
    WorkShift,
};
use crate::services::roster_service::{RosterRange, ShiftFilter};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/shifts", get(list_shifts).post(create_shift))
        .route(
            "/shifts/:id",
            get(get_shift).put(update_shift).delete(delete_shift),
        )
        .route("/schedules", get(list_schedules).post(create_schedule))
        .route(
            "/schedules/:id",
            get(get_schedule).put(update_schedule).delete(delete_schedule),
        )
        .route("/doctors/:id/roster", get(doctor_roster))
}

// Shifts

async fn list_shifts(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<ShiftFilter>,
) -> AppResult<Json<Vec<WorkShift>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.roster.list_shifts(filter, page).await?))
}

async fn create_shift(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateShift>,
) -> AppResult<(StatusCode, Json<WorkShift>)> {
    user.require_role(&[])?;
    let shift = state.roster.create_shift(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(shift)))
}

async fn get_shift(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<WorkShift>> {
    Ok(Json(state.roster.get_shift(id).await?))
}

async fn update_shift(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateShift>,
) -> AppResult<Json<WorkShift>> {
    user.require_role(&[])?;
    Ok(Json(state.roster.update_shift(id, update, user.id()).await?))
}

async fn delete_shift(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(&[])?;
    state.roster.delete_shift(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Schedules

async fn list_schedules(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<ScheduleFilter>,
) -> AppResult<Json<Vec<ScheduleDetail>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.roster.list_schedules(filter, page).await?))
}

async fn create_schedule(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateSchedule>,
) -> AppResult<(StatusCode, Json<ScheduleDetail>)> {
    user.require_role(&[])?;
    let schedule = state.roster.create_schedule(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(schedule)))
}

async fn get_schedule(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<ScheduleDetail>> {
    Ok(Json(state.roster.get_schedule(id).await?))
}

async fn update_schedule(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateSchedule>,
) -> AppResult<Json<ScheduleDetail>> {
    user.require_role(&[])?;
    Ok(Json(state.roster.update_schedule(id, update, user.id()).await?))
}

async fn delete_schedule(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(&[])?;
    state.roster.delete_schedule(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn doctor_roster(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(range): ApiQuery<RosterRange>,
) -> AppResult<Json<Vec<ScheduleDetail>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.roster.doctor_roster(id, range, page).await?))
}
