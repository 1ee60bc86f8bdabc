use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{PostModel, PostSortKey, PostStatus};
use crate::shared::{db_error, AppError, ListParams, Page};

const DUPLICATE_SLUG: &str = "Post slug already exists";

/// Trait for blog post storage
#[async_trait]
pub trait PostRepository {
    /// Inserts a post; a taken slug is a `Conflict`
    async fn create_post(&self, post: &PostModel) -> Result<(), AppError>;
    /// Slugs equal to `base` or of the form `base-<n>`
    async fn slugs_like(&self, base: &str) -> Result<Vec<String>, AppError>;
    async fn list_posts(
        &self,
        status: Option<PostStatus>,
        params: &ListParams,
    ) -> Result<Page<PostModel>, AppError>;
    async fn delete_post(&self, id: Uuid) -> Result<bool, AppError>;
}

fn post_matches(post: &PostModel, params: &ListParams) -> bool {
    let tags = post.tags.join(" ");
    params.matches(&[post.title.as_str(), post.content.as_str(), tags.as_str()])
}

fn is_numbered(slug: &str, base: &str) -> bool {
    slug == base
        || slug
            .strip_prefix(base)
            .and_then(|rest| rest.strip_prefix('-'))
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// In-memory implementation of PostRepository for development and testing
#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: RwLock<HashMap<Uuid, PostModel>>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    #[instrument(skip(self, post), fields(post_id = %post.id, slug = %post.slug))]
    async fn create_post(&self, post: &PostModel) -> Result<(), AppError> {
        let mut posts = self.posts.write().await;
        if posts.values().any(|p| p.slug == post.slug) {
            warn!("Slug already taken in memory");
            return Err(AppError::Conflict(DUPLICATE_SLUG.to_string()));
        }
        posts.insert(post.id, post.clone());
        debug!("Post stored in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn slugs_like(&self, base: &str) -> Result<Vec<String>, AppError> {
        Ok(self
            .posts
            .read()
            .await
            .values()
            .filter(|p| is_numbered(&p.slug, base))
            .map(|p| p.slug.clone())
            .collect())
    }

    #[instrument(skip(self, params))]
    async fn list_posts(
        &self,
        status: Option<PostStatus>,
        params: &ListParams,
    ) -> Result<Page<PostModel>, AppError> {
        let posts = self.posts.read().await;
        let mut matching: Vec<PostModel> = posts
            .values()
            .filter(|p| status.map_or(true, |status| p.status == status))
            .filter(|p| post_matches(p, params))
            .cloned()
            .collect();

        let key: PostSortKey = params.sort_key();
        matching.sort_by(|a, b| {
            let ordering = match key {
                PostSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                PostSortKey::Title => a.title.cmp(&b.title),
            };
            params.sort_order.apply(ordering)
        });
        Ok(params.paginate(matching))
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.posts.write().await.remove(&id).is_some())
    }
}

const POST_COLUMNS: &str =
    "id, title, content, author_id, status, slug, tags, cover_image_url, created_at, updated_at";

fn push_post_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    status: Option<PostStatus>,
    pattern: Option<String>,
) {
    builder.push(" WHERE TRUE");
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(pattern) = pattern {
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR content ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR array_to_string(tags, ' ') ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// PostgreSQL implementation of PostRepository
pub struct PostgresPostRepository {
    pool: PgPool,
}

impl PostgresPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PostRepository for PostgresPostRepository {
    #[instrument(skip(self, post), fields(post_id = %post.id, slug = %post.slug))]
    async fn create_post(&self, post: &PostModel) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO posts ({POST_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"
        ))
        .bind(post.id)
        .bind(&post.title)
        .bind(&post.content)
        .bind(post.author_id)
        .bind(post.status)
        .bind(&post.slug)
        .bind(&post.tags)
        .bind(&post.cover_image_url)
        .bind(post.created_at)
        .bind(post.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_SLUG))?;

        debug!("Post stored in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn slugs_like(&self, base: &str) -> Result<Vec<String>, AppError> {
        let slugs = sqlx::query_scalar::<_, String>(
            "SELECT slug FROM posts WHERE slug = $1 OR slug LIKE $1 || '-%'",
        )
        .bind(base)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Slug lookup failed"))?;

        Ok(slugs.into_iter().filter(|s| is_numbered(s, base)).collect())
    }

    #[instrument(skip(self, params))]
    async fn list_posts(
        &self,
        status: Option<PostStatus>,
        params: &ListParams,
    ) -> Result<Page<PostModel>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM posts");
        push_post_filters(&mut count, status, params.search_pattern());
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, "Post count failed"))?;

        let key: PostSortKey = params.sort_key();
        let mut query = QueryBuilder::<Postgres>::new(format!("SELECT {POST_COLUMNS} FROM posts"));
        push_post_filters(&mut query, status, params.search_pattern());
        query
            .push(format!(
                " ORDER BY {} {}",
                key.column(),
                params.sort_order.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset());

        let items = query
            .build_query_as::<PostModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, "Post listing failed"))?;

        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    async fn delete_post(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM posts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, "Post delete failed"))?;
        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn post(title: &str, slug: &str, status: PostStatus, tags: &[&str]) -> PostModel {
        let now = Utc::now();
        PostModel {
            id: Uuid::new_v4(),
            title: title.to_string(),
            content: "Body".to_string(),
            author_id: Uuid::new_v4(),
            status,
            slug: slug.to_string(),
            tags: tags.iter().map(|t| t.to_string()).collect(),
            cover_image_url: String::new(),
            created_at: now,
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn test_slug_is_unique() {
        let repo = InMemoryPostRepository::new();
        repo.create_post(&post("Leg day", "leg-day", PostStatus::Draft, &[]))
            .await
            .unwrap();
        let clash = repo
            .create_post(&post("Leg day", "leg-day", PostStatus::Draft, &[]))
            .await;
        assert!(matches!(clash, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_slugs_like_only_counts_numbered_variants() {
        let repo = InMemoryPostRepository::new();
        for slug in ["leg-day", "leg-day-1", "leg-day-plan", "arm-day"] {
            repo.create_post(&post("x", slug, PostStatus::Draft, &[]))
                .await
                .unwrap();
        }
        let mut slugs = repo.slugs_like("leg-day").await.unwrap();
        slugs.sort();
        assert_eq!(slugs, vec!["leg-day".to_string(), "leg-day-1".to_string()]);
    }

    #[tokio::test]
    async fn test_list_filters_status_and_searches_tags() {
        let repo = InMemoryPostRepository::new();
        repo.create_post(&post("Recovery", "recovery", PostStatus::Published, &["sleep"]))
            .await
            .unwrap();
        repo.create_post(&post("Draft", "draft", PostStatus::Draft, &["sleep"]))
            .await
            .unwrap();

        let page = repo
            .list_posts(
                Some(PostStatus::Published),
                &ListParams::default().with_search("SLEEP"),
            )
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].slug, "recovery");
    }
}
