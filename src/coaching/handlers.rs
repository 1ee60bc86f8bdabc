use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension,
};
use tracing::instrument;

use super::{
    models::{ScheduleModel, ScheduleView, StudentModel, StudentView},
    repository::EnrollResult,
    service::CoachingService,
    types::AddScheduleRequest,
};
use crate::session::Principal;
use crate::shared::{parse_id, ApiResponse, AppError, AppState, ListParams, ListQuery, ValidJson};

/// POST /api/client/book-coach/:id
#[instrument(name = "book_coach", skip_all, fields(account_id = %principal.id))]
pub async fn book_coach(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<ApiResponse<StudentModel>, AppError> {
    let coach_id = parse_id(&id, "coach")?;
    let response = match CoachingService::from_state(&state)
        .book_coach(principal.id, coach_id)
        .await?
    {
        EnrollResult::Enrolled(student) => {
            ApiResponse::created(student).with_message("Coach booked successfully")
        }
        EnrollResult::AlreadyActive(existing) => ApiResponse::failure(
            StatusCode::BAD_REQUEST,
            "You already have an active coach. Complete or cancel it before booking another",
            existing,
        ),
    };
    Ok(response)
}

/// GET /api/client/my-schedules
#[instrument(name = "client_schedules", skip_all, fields(account_id = %principal.id))]
pub async fn client_schedules(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ApiResponse<Vec<ScheduleView>>, AppError> {
    let schedules = CoachingService::from_state(&state)
        .client_schedules(principal.id)
        .await?;
    Ok(ApiResponse::ok(schedules))
}

/// GET /api/coach/my-students
#[instrument(name = "my_students", skip_all, fields(account_id = %principal.id))]
pub async fn my_students(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<StudentView>>, AppError> {
    let params = ListParams::from(query);
    let page = CoachingService::from_state(&state)
        .my_students(principal.id, &params)
        .await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

/// POST /api/coach/add-schedule
#[instrument(name = "add_schedule", skip_all, fields(account_id = %principal.id))]
pub async fn add_schedule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidJson(request): ValidJson<AddScheduleRequest>,
) -> Result<ApiResponse<ScheduleModel>, AppError> {
    let schedule = CoachingService::from_state(&state)
        .add_schedule(principal.id, request)
        .await?;
    Ok(ApiResponse::created(schedule).with_message("Schedule added successfully"))
}

/// DELETE /api/coach/delete-schedule/:id
#[instrument(name = "delete_schedule", skip_all, fields(account_id = %principal.id))]
pub async fn delete_schedule(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let schedule_id = parse_id(&id, "schedule")?;
    CoachingService::from_state(&state)
        .delete_schedule(principal.id, schedule_id)
        .await?;
    Ok(ApiResponse::message("Schedule deleted successfully"))
}

/// GET /api/coach/my-schedules
#[instrument(name = "coach_schedules", skip_all, fields(account_id = %principal.id))]
pub async fn coach_schedules(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ApiResponse<Vec<ScheduleView>>, AppError> {
    let schedules = CoachingService::from_state(&state)
        .coach_schedules(principal.id)
        .await?;
    Ok(ApiResponse::ok(schedules))
}
