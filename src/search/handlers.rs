use axum::extract::State;
use tracing::instrument;

use super::{
    service::SearchService,
    types::{SearchRequest, SearchResults},
};
use crate::shared::{ApiResponse, AppError, AppState, ValidJson};

/// POST /api/client/search
#[instrument(name = "search", skip_all)]
pub async fn search(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<SearchRequest>,
) -> Result<ApiResponse<SearchResults>, AppError> {
    let (results, params) = SearchService::from_state(&state).search(request).await?;
    let total = results.total();
    let pagination = params.pagination(results.widest());
    let message = format!(
        "Found {total} results for '{}'",
        params.search().unwrap_or_default()
    );
    Ok(ApiResponse::ok(results)
        .with_message(message)
        .with_pagination(pagination))
}
