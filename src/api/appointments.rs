use super::{ApiJson, ApiPath, ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{
    Appointment, AppointmentFilter, BookAppointment, CancelAppointment, CompleteAppointment,
    RescheduleAppointment, UserRole,
};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::NaiveDate;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct ScheduleQuery {
    pub date: NaiveDate,
}

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/appointments", get(list_appointments).post(book_appointment))
        .route("/appointments/:id", get(get_appointment))
        .route("/appointments/:id/confirm", post(confirm))
        .route("/appointments/:id/check-in", post(check_in))
        .route("/appointments/:id/start", post(start))
        .route("/appointments/:id/complete", post(complete))
        .route("/appointments/:id/cancel", post(cancel))
        .route("/appointments/:id/reschedule", post(reschedule))
        .route("/doctors/:id/schedule", get(doctor_schedule))
}

async fn list_appointments(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<AppointmentFilter>,
) -> AppResult<Json<Vec<Appointment>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.appointments.list(filter, page).await?))
}

async fn book_appointment(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<BookAppointment>,
) -> AppResult<(StatusCode, Json<Appointment>)> {
    let appointment = state.appointments.book(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(appointment)))
}

async fn get_appointment(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(state.appointments.get(id).await?))
}

async fn confirm(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(state.appointments.confirm(id, user.id()).await?))
}

async fn check_in(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(state.appointments.check_in(id, user.id()).await?))
}

async fn start(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(state.appointments.start(id, user.id()).await?))
}

/// Notes are optional, so an empty body is accepted
async fn complete(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<CompleteAppointment>>,
) -> AppResult<Json<Appointment>> {
    user.require_role(&[UserRole::Doctor])?;
    let ApiJson(request) = body.unwrap_or(ApiJson(CompleteAppointment::default()));
    Ok(Json(
        state
            .appointments
            .complete(id, request.doctor_notes, user.id())
            .await?,
    ))
}

async fn cancel(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    body: Option<ApiJson<CancelAppointment>>,
) -> AppResult<Json<Appointment>> {
    let reason = body.and_then(|ApiJson(request)| request.reason);
    Ok(Json(
        state
            .appointments
            .cancel(id, reason, user.role().as_str(), user.id())
            .await?,
    ))
}

async fn reschedule(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<RescheduleAppointment>,
) -> AppResult<Json<Appointment>> {
    Ok(Json(
        state.appointments.reschedule(id, request, user.id()).await?,
    ))
}

async fn doctor_schedule(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<ScheduleQuery>,
) -> AppResult<Json<Vec<Appointment>>> {
    Ok(Json(state.appointments.day_schedule(id, query.date).await?))
}
