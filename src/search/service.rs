use std::sync::Arc;
use tracing::{debug, instrument};

use super::types::{SearchGroup, SearchRequest, SearchResults};
use crate::account::{models::AccountResponse, AccountRepository};
use crate::catalog::{models::CatalogStatus, CatalogRepository};
use crate::post::{PostRepository, PostService, PostStatus};
use crate::room::{RoomRepository, RoomStatus};
use crate::shared::{AppError, AppState, ListParams};

/// Cross-resource search over what a client may browse: active packages,
/// available rooms, active coaches and published posts
pub struct SearchService {
    catalog: Arc<dyn CatalogRepository + Send + Sync>,
    rooms: Arc<dyn RoomRepository + Send + Sync>,
    accounts: Arc<dyn AccountRepository + Send + Sync>,
    posts: Arc<dyn PostRepository + Send + Sync>,
}

impl SearchService {
    pub fn new(
        catalog: Arc<dyn CatalogRepository + Send + Sync>,
        rooms: Arc<dyn RoomRepository + Send + Sync>,
        accounts: Arc<dyn AccountRepository + Send + Sync>,
        posts: Arc<dyn PostRepository + Send + Sync>,
    ) -> Self {
        Self {
            catalog,
            rooms,
            accounts,
            posts,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.catalog_repository),
            Arc::clone(&state.room_repository),
            Arc::clone(&state.account_repository),
            Arc::clone(&state.post_repository),
        )
    }

    /// Runs the four lookups concurrently. Returns the results together with
    /// the list parameters they were paged with.
    #[instrument(skip(self, request))]
    pub async fn search(
        &self,
        request: SearchRequest,
    ) -> Result<(SearchResults, ListParams), AppError> {
        let query = request
            .query
            .map(|q| q.trim().to_string())
            .filter(|q| !q.is_empty())
            .ok_or_else(|| AppError::Validation("Please provide a search query".to_string()))?;
        let params = ListParams::new(request.page.unwrap_or(1), request.limit.unwrap_or(0))
            .with_search(query);

        let (packages, rooms, coaches, posts) = futures::try_join!(
            self.catalog
                .list_packages(Some(CatalogStatus::Active), &params),
            self.rooms.list_rooms(Some(RoomStatus::Available), &params),
            self.accounts.search_coaches(&params),
            self.posts.list_posts(Some(PostStatus::Published), &params),
        )?;

        let posts = PostService::new(Arc::clone(&self.posts), Arc::clone(&self.accounts))
            .populate(posts)
            .await?;

        let results = SearchResults {
            packages: SearchGroup::from_page(packages, &params),
            rooms: SearchGroup::from_page(rooms, &params),
            coaches: SearchGroup::from_page(coaches.map(AccountResponse::from), &params),
            posts: SearchGroup::from_page(posts, &params),
        };
        debug!(total = results.total(), "Global search finished");
        Ok((results, params))
    }
}
