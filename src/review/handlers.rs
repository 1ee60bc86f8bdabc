use axum::{
    extract::{Path, Query, State},
    Extension,
};
use tracing::instrument;

use super::{
    models::{ReviewCheck, ReviewModel, ReviewView},
    service::ReviewService,
    types::ReviewRequest,
};
use crate::session::Principal;
use crate::shared::{parse_id, ApiResponse, AppError, AppState, ListParams, ListQuery, ValidJson};

/// POST /api/client/review-package
#[instrument(name = "review_package", skip_all, fields(account_id = %principal.id))]
pub async fn review_package(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidJson(request): ValidJson<ReviewRequest>,
) -> Result<ApiResponse<ReviewModel>, AppError> {
    let review = ReviewService::from_state(&state)
        .review_package(principal.id, request)
        .await?;
    Ok(ApiResponse::created(review)
        .with_message("Thank you! Your review will be visible once approved"))
}

/// GET /api/client/check-review/:id
#[instrument(name = "check_review", skip_all, fields(account_id = %principal.id))]
pub async fn check_review(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ReviewCheck>, AppError> {
    let package_id = parse_id(&id, "package")?;
    let check = ReviewService::from_state(&state)
        .check_review(principal.id, package_id)
        .await?;
    Ok(ApiResponse::ok(check))
}

/// GET /api/admin/package-reviews
#[instrument(name = "list_reviews", skip(state))]
pub async fn list_reviews(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<ReviewView>>, AppError> {
    let params = ListParams::from(query);
    let page = ReviewService::from_state(&state)
        .list_reviews(&params)
        .await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

/// PUT /api/admin/approve-review/:id
#[instrument(name = "approve_review", skip(state))]
pub async fn approve_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ReviewModel>, AppError> {
    let id = parse_id(&id, "review")?;
    let review = ReviewService::from_state(&state).approve_review(id).await?;
    Ok(ApiResponse::ok(review).with_message("Review approved"))
}

/// PUT /api/admin/reject-review/:id
#[instrument(name = "reject_review", skip(state))]
pub async fn reject_review(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<ReviewModel>, AppError> {
    let id = parse_id(&id, "review")?;
    let review = ReviewService::from_state(&state).reject_review(id).await?;
    Ok(ApiResponse::ok(review).with_message("Review rejected"))
}
