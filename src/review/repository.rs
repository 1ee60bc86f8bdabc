use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{ReviewModel, ReviewSortKey, ReviewStatus};
use crate::shared::{db_error, AppError, ListParams, Page};

/// Filters for the admin review list. `matching` holds the client and
/// package ids a search resolved to; a review matches if either side does.
#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub status: Option<ReviewStatus>,
    pub matching: Option<(Vec<Uuid>, Vec<Uuid>)>,
}

impl ReviewFilter {
    fn matches(&self, review: &ReviewModel) -> bool {
        self.status.map_or(true, |status| review.status == status)
            && self.matching.as_ref().map_or(true, |(clients, packages)| {
                clients.contains(&review.client_id) || packages.contains(&review.package_id)
            })
    }
}

/// Result of a moderation attempt
#[derive(Debug, Clone)]
pub enum ModerationResult {
    Applied(ReviewModel),
    /// Review was already moderated
    Rejected(ReviewStatus),
    NotFound,
}

/// Trait for package review storage
#[async_trait]
pub trait ReviewRepository {
    /// Inserts a review; a second review for the same (package, client) is `DuplicateReview`
    async fn create_review(&self, review: &ReviewModel) -> Result<(), AppError>;
    async fn find_review(
        &self,
        client_id: Uuid,
        package_id: Uuid,
    ) -> Result<Option<ReviewModel>, AppError>;
    async fn list_reviews(
        &self,
        filter: &ReviewFilter,
        params: &ListParams,
    ) -> Result<Page<ReviewModel>, AppError>;

    /// pending -> `status`; anything else is rejected
    async fn moderate(&self, id: Uuid, status: ReviewStatus)
        -> Result<ModerationResult, AppError>;
}

/// In-memory implementation of ReviewRepository for development and testing
#[derive(Default)]
pub struct InMemoryReviewRepository {
    reviews: RwLock<HashMap<Uuid, ReviewModel>>,
}

impl InMemoryReviewRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ReviewRepository for InMemoryReviewRepository {
    #[instrument(skip(self, review), fields(review_id = %review.id))]
    async fn create_review(&self, review: &ReviewModel) -> Result<(), AppError> {
        let mut reviews = self.reviews.write().await;
        if reviews
            .values()
            .any(|r| r.client_id == review.client_id && r.package_id == review.package_id)
        {
            warn!("Review already exists in memory");
            return Err(AppError::DuplicateReview);
        }
        reviews.insert(review.id, review.clone());
        debug!("Review stored in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_review(
        &self,
        client_id: Uuid,
        package_id: Uuid,
    ) -> Result<Option<ReviewModel>, AppError> {
        Ok(self
            .reviews
            .read()
            .await
            .values()
            .find(|r| r.client_id == client_id && r.package_id == package_id)
            .cloned())
    }

    #[instrument(skip(self, filter, params))]
    async fn list_reviews(
        &self,
        filter: &ReviewFilter,
        params: &ListParams,
    ) -> Result<Page<ReviewModel>, AppError> {
        let reviews = self.reviews.read().await;
        let mut matching: Vec<ReviewModel> =
            reviews.values().filter(|r| filter.matches(r)).cloned().collect();

        let key: ReviewSortKey = params.sort_key();
        matching.sort_by(|a, b| {
            let ordering = match key {
                ReviewSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
                ReviewSortKey::Rating => a.rating.cmp(&b.rating),
            };
            params.sort_order.apply(ordering)
        });
        Ok(params.paginate(matching))
    }

    #[instrument(skip(self))]
    async fn moderate(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<ModerationResult, AppError> {
        let mut reviews = self.reviews.write().await;
        let Some(review) = reviews.get_mut(&id) else {
            return Ok(ModerationResult::NotFound);
        };
        if review.status != ReviewStatus::Pending {
            return Ok(ModerationResult::Rejected(review.status));
        }
        review.status = status;
        review.updated_at = Utc::now();
        Ok(ModerationResult::Applied(review.clone()))
    }
}

const REVIEW_COLUMNS: &str =
    "id, package_id, client_id, rating, comment, status, created_at, updated_at";

fn push_review_filters(builder: &mut QueryBuilder<'_, Postgres>, filter: &ReviewFilter) {
    builder.push(" WHERE TRUE");
    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some((clients, packages)) = &filter.matching {
        builder
            .push(" AND (client_id = ANY(")
            .push_bind(clients.clone())
            .push(") OR package_id = ANY(")
            .push_bind(packages.clone())
            .push("))");
    }
}

/// PostgreSQL implementation of ReviewRepository
pub struct PostgresReviewRepository {
    pool: PgPool,
}

impl PostgresReviewRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReviewRepository for PostgresReviewRepository {
    #[instrument(skip(self, review), fields(review_id = %review.id))]
    async fn create_review(&self, review: &ReviewModel) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO package_reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(review.id)
        .bind(review.package_id)
        .bind(review.client_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.status)
        .bind(review.created_at)
        .bind(review.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| match db_error(e, "Review already exists") {
            AppError::Conflict(_) => AppError::DuplicateReview,
            other => other,
        })?;

        debug!("Review stored in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_review(
        &self,
        client_id: Uuid,
        package_id: Uuid,
    ) -> Result<Option<ReviewModel>, AppError> {
        sqlx::query_as::<_, ReviewModel>(&format!(
            "SELECT {REVIEW_COLUMNS} FROM package_reviews WHERE client_id = $1 AND package_id = $2"
        ))
        .bind(client_id)
        .bind(package_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Review lookup failed"))
    }

    #[instrument(skip(self, filter, params))]
    async fn list_reviews(
        &self,
        filter: &ReviewFilter,
        params: &ListParams,
    ) -> Result<Page<ReviewModel>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM package_reviews");
        push_review_filters(&mut count, filter);
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, "Review count failed"))?;

        let key: ReviewSortKey = params.sort_key();
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {REVIEW_COLUMNS} FROM package_reviews"));
        push_review_filters(&mut query, filter);
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
            .build_query_as::<ReviewModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, "Review listing failed"))?;

        Ok(Page { items, total })
    }

    #[instrument(skip(self))]
    async fn moderate(
        &self,
        id: Uuid,
        status: ReviewStatus,
    ) -> Result<ModerationResult, AppError> {
        let updated = sqlx::query_as::<_, ReviewModel>(&format!(
            "UPDATE package_reviews SET status = $1, updated_at = NOW() \
             WHERE id = $2 AND status = $3 RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(status)
        .bind(id)
        .bind(ReviewStatus::Pending)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Review update failed"))?;

        if let Some(review) = updated {
            return Ok(ModerationResult::Applied(review));
        }

        let current = sqlx::query_scalar::<_, ReviewStatus>(
            "SELECT status FROM package_reviews WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Review lookup failed"))?;

        Ok(match current {
            Some(status) => ModerationResult::Rejected(status),
            None => ModerationResult::NotFound,
        })
    }
}
