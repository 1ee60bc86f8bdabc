use axum::{
    extract::{Path, Query, State},
    Extension,
};
use tracing::instrument;

use super::{
    models::{PostModel, PostView},
    service::PostService,
    types::AddPostRequest,
};
use crate::session::Principal;
use crate::shared::{parse_id, ApiResponse, AppError, AppState, ListParams, ListQuery, ValidJson};

/// GET /api/client/all-post
#[instrument(name = "published_posts", skip(state))]
pub async fn published_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<PostView>>, AppError> {
    let params = ListParams::from(query);
    let page = PostService::from_state(&state)
        .list_published(&params)
        .await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

/// GET /api/admin/posts
#[instrument(name = "list_posts", skip(state))]
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<PostView>>, AppError> {
    let params = ListParams::from(query);
    let page = PostService::from_state(&state).list_posts(&params).await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

/// POST /api/admin/add-post
#[instrument(name = "add_post", skip_all, fields(account_id = %principal.id))]
pub async fn add_post(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidJson(request): ValidJson<AddPostRequest>,
) -> Result<ApiResponse<PostModel>, AppError> {
    let post = PostService::from_state(&state)
        .add_post(principal.id, request)
        .await?;
    Ok(ApiResponse::created(post).with_message("Post created successfully"))
}

/// DELETE /api/admin/delete-post/:id
#[instrument(name = "delete_post", skip(state))]
pub async fn delete_post(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let id = parse_id(&id, "post")?;
    PostService::from_state(&state).delete_post(id).await?;
    Ok(ApiResponse::message("Post deleted successfully"))
}
