use super::{ApiJson, ApiPath, ApiQuery, Pagination};
use crate::auth::CurrentUser;
use crate::error::AppResult;
use crate::models::{
    Bed, BedFilter, CreateBed, CreateFloor, CreateWard, Floor, UpdateFloor, UpdateWard, UserRole,
    Ward, WardOccupancy,
};
use crate::services::facility_service::{AssignBedRequest, BedStatusRequest, WardFilter};
use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use std::sync::Arc;
use uuid::Uuid;

const WRITERS: &[UserRole] = &[UserRole::Nurse, UserRole::Staff];

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/floors", get(list_floors).post(create_floor))
        .route(
            "/floors/:id",
            get(get_floor).put(update_floor).delete(delete_floor),
        )
        .route("/wards", get(list_wards).post(create_ward))
        .route(
            "/wards/:id",
            get(get_ward).put(update_ward).delete(delete_ward),
        )
        .route("/wards/:id/occupancy", get(ward_occupancy))
        .route("/beds", get(list_beds).post(create_bed))
        .route("/beds/:id", get(get_bed).delete(delete_bed))
        .route("/beds/:id/assign", post(assign_bed))
        .route("/beds/:id/release", post(release_bed))
        .route("/beds/:id/status", put(set_bed_status))
}

// Floors

async fn list_floors(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
) -> AppResult<Json<Vec<Floor>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.facilities.list_floors(page).await?))
}

async fn create_floor(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateFloor>,
) -> AppResult<(StatusCode, Json<Floor>)> {
    user.require_role(WRITERS)?;
    let floor = state.facilities.create_floor(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(floor)))
}

async fn get_floor(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Floor>> {
    Ok(Json(state.facilities.get_floor(id).await?))
}

async fn update_floor(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateFloor>,
) -> AppResult<Json<Floor>> {
    user.require_role(WRITERS)?;
    Ok(Json(state.facilities.update_floor(id, update, user.id()).await?))
}

async fn delete_floor(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(WRITERS)?;
    state.facilities.delete_floor(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Wards

async fn list_wards(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<WardFilter>,
) -> AppResult<Json<Vec<Ward>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.facilities.list_wards(filter, page).await?))
}

async fn create_ward(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateWard>,
) -> AppResult<(StatusCode, Json<Ward>)> {
    user.require_role(WRITERS)?;
    let ward = state.facilities.create_ward(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(ward)))
}

async fn get_ward(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Ward>> {
    Ok(Json(state.facilities.get_ward(id).await?))
}

async fn ward_occupancy(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<WardOccupancy>> {
    Ok(Json(state.facilities.ward_occupancy(id).await?))
}

async fn update_ward(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(update): ApiJson<UpdateWard>,
) -> AppResult<Json<Ward>> {
    user.require_role(WRITERS)?;
    Ok(Json(state.facilities.update_ward(id, update, user.id()).await?))
}

async fn delete_ward(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(WRITERS)?;
    state.facilities.delete_ward(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

// Beds

async fn list_beds(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiQuery(pagination): ApiQuery<Pagination>,
    ApiQuery(filter): ApiQuery<BedFilter>,
) -> AppResult<Json<Vec<Bed>>> {
    let page = pagination.page(&state.config);
    Ok(Json(state.facilities.list_beds(filter, page).await?))
}

async fn create_bed(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiJson(input): ApiJson<CreateBed>,
) -> AppResult<(StatusCode, Json<Bed>)> {
    user.require_role(WRITERS)?;
    let bed = state.facilities.create_bed(input, user.id()).await?;
    Ok((StatusCode::CREATED, Json(bed)))
}

async fn get_bed(
    State(state): State<Arc<AppState>>,
    _user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Bed>> {
    Ok(Json(state.facilities.get_bed(id).await?))
}

async fn delete_bed(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<StatusCode> {
    user.require_role(WRITERS)?;
    state.facilities.delete_bed(id, user.id()).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn assign_bed(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<AssignBedRequest>,
) -> AppResult<Json<Bed>> {
    user.require_role(WRITERS)?;
    Ok(Json(
        state
            .facilities
            .assign_bed(id, request.patient_id, user.id())
            .await?,
    ))
}

async fn release_bed(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
) -> AppResult<Json<Bed>> {
    user.require_role(WRITERS)?;
    Ok(Json(state.facilities.release_bed(id, user.id()).await?))
}

async fn set_bed_status(
    State(state): State<Arc<AppState>>,
    user: CurrentUser,
    ApiPath(id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<BedStatusRequest>,
) -> AppResult<Json<Bed>> {
    user.require_role(WRITERS)?;
    Ok(Json(
        state
            .facilities
            .set_bed_status(id, &request.status, user.id())
            .await?,
    ))
}
