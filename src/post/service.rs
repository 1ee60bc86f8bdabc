use chrono::Utc;
use std::collections::HashMap;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{
        slugify, unique_slug, PostModel, PostStatus, PostView, DEFAULT_COVER_IMAGE,
        MAX_TITLE_CHARS,
    },
    repository::PostRepository,
    types::AddPostRequest,
};
use crate::account::{models::AccountSummary, AccountRepository};
use crate::shared::{require, AppError, AppState, ListParams, Page};

/// Slug candidates tried before giving up on concurrent writers
const SLUG_ATTEMPTS: usize = 3;

pub struct PostService {
    posts: Arc<dyn PostRepository + Send + Sync>,
    accounts: Arc<dyn AccountRepository + Send + Sync>,
}

impl PostService {
    pub fn new(
        posts: Arc<dyn PostRepository + Send + Sync>,
        accounts: Arc<dyn AccountRepository + Send + Sync>,
    ) -> Self {
        Self { posts, accounts }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.post_repository),
            Arc::clone(&state.account_repository),
        )
    }

    /// Creates a post authored by `author_id` with a slug derived from the title
    #[instrument(skip(self, request), fields(author_id = %author_id))]
    pub async fn add_post(
        &self,
        author_id: Uuid,
        request: AddPostRequest,
    ) -> Result<PostModel, AppError> {
        let title = request.title.unwrap_or_default().trim().to_string();
        let content = request.content.unwrap_or_default();
        require(&title, "title")?;
        require(&content, "content")?;
        if title.chars().count() > MAX_TITLE_CHARS {
            return Err(AppError::Validation(format!(
                "title must be at most {MAX_TITLE_CHARS} characters"
            )));
        }

        let status = match request.status.as_deref().map(str::trim) {
            None | Some("") => PostStatus::default(),
            Some(raw) => PostStatus::from_str(raw)
                .map_err(|_| AppError::Validation(format!("Invalid post status: {raw}")))?,
        };
        let tags: Vec<String> = request
            .tags
            .unwrap_or_default()
            .into_iter()
            .map(|tag| tag.trim().to_string())
            .filter(|tag| !tag.is_empty())
            .collect();
        let cover_image_url = request
            .cover_image_url
            .map(|url| url.trim().to_string())
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| DEFAULT_COVER_IMAGE.to_string());

        let mut base = slugify(&title);
        if base.is_empty() {
            base = "post".to_string();
        }

        let now = Utc::now();
        let mut post = PostModel {
            id: Uuid::new_v4(),
            title,
            content,
            author_id,
            status,
            slug: String::new(),
            tags,
            cover_image_url,
            created_at: now,
            updated_at: now,
        };

        for attempt in 1..=SLUG_ATTEMPTS {
            let taken = self.posts.slugs_like(&base).await?;
            post.slug = unique_slug(&base, &taken);
            match self.posts.create_post(&post).await {
                Ok(()) => {
                    info!(post_id = %post.id, slug = %post.slug, "Post created");
                    return Ok(post);
                }
                Err(AppError::Conflict(_)) if attempt < SLUG_ATTEMPTS => {
                    warn!(slug = %post.slug, attempt, "Slug taken concurrently, retrying");
                }
                Err(e) => return Err(e),
            }
        }
        Err(AppError::Conflict("Could not allocate a unique slug".to_string()))
    }

    /// Published posts for clients
    pub async fn list_published(&self, params: &ListParams) -> Result<Page<PostView>, AppError> {
        let page = self
            .posts
            .list_posts(Some(PostStatus::Published), params)
            .await?;
        self.populate(page).await
    }

    /// Every post, optionally filtered by `status`
    pub async fn list_posts(&self, params: &ListParams) -> Result<Page<PostView>, AppError> {
        let status = params.status_filter::<PostStatus>()?;
        let page = self.posts.list_posts(status, params).await?;
        self.populate(page).await
    }

    pub(crate) async fn populate(&self, page: Page<PostModel>) -> Result<Page<PostView>, AppError> {
        let mut author_ids: Vec<Uuid> = page.items.iter().map(|p| p.author_id).collect();
        author_ids.sort_unstable();
        author_ids.dedup();
        let authors: HashMap<Uuid, AccountSummary> = self
            .accounts
            .find_by_ids(&author_ids)
            .await?
            .iter()
            .map(|account| (account.id, AccountSummary::from(account)))
            .collect();

        Ok(page.map(|post| PostView {
            author_info: authors.get(&post.author_id).cloned(),
            post,
        }))
    }

    #[instrument(skip(self))]
    pub async fn delete_post(&self, id: Uuid) -> Result<(), AppError> {
        if !self.posts.delete_post(id).await? {
            return Err(AppError::NotFound("Post not found".to_string()));
        }
        info!(post_id = %id, "Post deleted");
        Ok(())
    }
}
