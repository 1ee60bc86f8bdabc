use axum::extract::{Path, Query, State};
use std::sync::Arc;
use tracing::instrument;

use super::{models::RoomModel, service::RoomService, types::RoomRequest};
use crate::shared::{parse_id, ApiResponse, AppError, AppState, ListParams, ListQuery, ValidJson};

fn service(state: &AppState) -> RoomService {
    RoomService::new(Arc::clone(&state.room_repository))
}

/// GET /api/{admin,client}/all-rooms
#[instrument(name = "list_rooms", skip(state))]
pub async fn list_rooms(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<RoomModel>>, AppError> {
    let params = ListParams::from(query);
    let page = service(&state).list_rooms(&params).await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

/// GET /api/{admin,client}/get-room/:id
#[instrument(name = "get_room", skip(state))]
pub async fn get_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RoomModel>, AppError> {
    let id = parse_id(&id, "room")?;
    Ok(ApiResponse::ok(service(&state).get_room(id).await?))
}

/// POST /api/admin/add-room
#[instrument(name = "add_room", skip(state, request))]
pub async fn add_room(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RoomRequest>,
) -> Result<ApiResponse<RoomModel>, AppError> {
    let room = service(&state).add_room(request).await?;
    Ok(ApiResponse::created(room).with_message("Room created successfully"))
}

/// PUT /api/admin/update-room/:id
#[instrument(name = "update_room", skip(state, request))]
pub async fn update_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<RoomRequest>,
) -> Result<ApiResponse<RoomModel>, AppError> {
    let id = parse_id(&id, "room")?;
    let room = service(&state).update_room(id, request).await?;
    Ok(ApiResponse::ok(room).with_message("Room updated successfully"))
}

/// DELETE /api/admin/delete-room/:id
#[instrument(name = "delete_room", skip(state))]
pub async fn delete_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let id = parse_id(&id, "room")?;
    service(&state).delete_room(id).await?;
    Ok(ApiResponse::message("Room deleted successfully"))
}

/// PUT /api/admin/lock-room/:id
#[instrument(name = "lock_room", skip(state))]
pub async fn lock_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RoomModel>, AppError> {
    let id = parse_id(&id, "room")?;
    let room = service(&state).toggle_lock(id).await?;
    Ok(ApiResponse::ok(room).with_message("Room status changed successfully"))
}

/// PUT /api/admin/maintain-room/:id
#[instrument(name = "maintain_room", skip(state))]
pub async fn maintain_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RoomModel>, AppError> {
    let id = parse_id(&id, "room")?;
    let room = service(&state).start_maintenance(id).await?;
    Ok(ApiResponse::ok(room).with_message("Room is now under maintenance"))
}

/// PUT /api/admin/unmaintain-room/:id
#[instrument(name = "unmaintain_room", skip(state))]
pub async fn unmaintain_room(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<RoomModel>, AppError> {
    let id = parse_id(&id, "room")?;
    let room = service(&state).end_maintenance(id).await?;
    Ok(ApiResponse::ok(room).with_message("Room maintenance lifted"))
}
