use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    models::{check_rating, ReviewCheck, ReviewModel, ReviewStatus, ReviewView},
    repository::{ModerationResult, ReviewFilter, ReviewRepository},
    types::ReviewRequest,
};
use crate::account::{models::AccountSummary, AccountRepository, Role};
use crate::catalog::{models::PackageSummary, CatalogRepository};
use crate::order::OrderRepository;
use crate::shared::{parse_id, AppError, AppState, ListParams, Page};

/// Service for package reviews: submission by buyers and admin moderation
pub struct ReviewService {
    reviews: Arc<dyn ReviewRepository + Send + Sync>,
    orders: Arc<dyn OrderRepository + Send + Sync>,
    catalog: Arc<dyn CatalogRepository + Send + Sync>,
    accounts: Arc<dyn AccountRepository + Send + Sync>,
}

impl ReviewService {
    pub fn new(
        reviews: Arc<dyn ReviewRepository + Send + Sync>,
        orders: Arc<dyn OrderRepository + Send + Sync>,
        catalog: Arc<dyn CatalogRepository + Send + Sync>,
        accounts: Arc<dyn AccountRepository + Send + Sync>,
    ) -> Self {
        Self {
            reviews,
            orders,
            catalog,
            accounts,
        }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.review_repository),
            Arc::clone(&state.order_repository),
            Arc::clone(&state.catalog_repository),
            Arc::clone(&state.account_repository),
        )
    }

    /// Submits a pending review. Only clients with a completed order
    /// containing the package may review it, once.
    #[instrument(skip(self, request), fields(client_id = %client_id))]
    pub async fn review_package(
        &self,
        client_id: Uuid,
        request: ReviewRequest,
    ) -> Result<ReviewModel, AppError> {
        let raw_id = request
            .package_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| AppError::Validation("packageId is required".to_string()))?;
        let rating = check_rating(request.rating).ok_or_else(|| {
            AppError::Validation("Rating must be a number between 1 and 5".to_string())
        })?;
        let package_id = parse_id(&raw_id, "package")?;

        if self.catalog.get_package(package_id).await?.is_none() {
            return Err(AppError::NotFound("Package not found".to_string()));
        }

        if !self
            .orders
            .has_completed_purchase(client_id, package_id)
            .await?
        {
            warn!(%package_id, "Review refused without a completed purchase");
            return Err(AppError::Forbidden(
                "You can only review packages you have purchased".to_string(),
            ));
        }

        if self
            .reviews
            .find_review(client_id, package_id)
            .await?
            .is_some()
        {
            return Err(AppError::DuplicateReview);
        }

        let comment = request.comment.unwrap_or_default().trim().to_string();
        let review = ReviewModel::new(package_id, client_id, rating, comment);
        self.reviews.create_review(&review).await?;

        info!(review_id = %review.id, %package_id, rating, "Review submitted");
        Ok(review)
    }

    #[instrument(skip(self))]
    pub async fn check_review(
        &self,
        client_id: Uuid,
        package_id: Uuid,
    ) -> Result<ReviewCheck, AppError> {
        let review = self.reviews.find_review(client_id, package_id).await?;
        Ok(ReviewCheck {
            has_reviewed: review.is_some(),
            review,
        })
    }

    /// All reviews; `search` matches the client's fullname or the package name
    #[instrument(skip(self, params))]
    pub async fn list_reviews(&self, params: &ListParams) -> Result<Page<ReviewView>, AppError> {
        let matching = match params.search() {
            Some(term) => Some((
                self.accounts.search_ids(Role::Client, term).await?,
                self.catalog.search_package_ids(term).await?,
            )),
            None => None,
        };
        let filter = ReviewFilter {
            status: params.status_filter::<ReviewStatus>()?,
            matching,
        };
        let page = self.reviews.list_reviews(&filter, params).await?;
        self.populate(page).await
    }

    async fn populate(&self, page: Page<ReviewModel>) -> Result<Page<ReviewView>, AppError> {
        let mut client_ids: Vec<Uuid> = page.items.iter().map(|r| r.client_id).collect();
        client_ids.sort_unstable();
        client_ids.dedup();
        let mut package_ids: Vec<Uuid> = page.items.iter().map(|r| r.package_id).collect();
        package_ids.sort_unstable();
        package_ids.dedup();

        let clients: HashMap<Uuid, AccountSummary> = self
            .accounts
            .find_by_ids(&client_ids)
            .await?
            .iter()
            .map(|account| (account.id, AccountSummary::from(account)))
            .collect();
        let packages: HashMap<Uuid, PackageSummary> = self
            .catalog
            .find_packages(&package_ids)
            .await?
            .iter()
            .map(|package| (package.id, PackageSummary::from(package)))
            .collect();

        Ok(page.map(|review| ReviewView {
            client_info: clients.get(&review.client_id).cloned(),
            package_info: packages.get(&review.package_id).cloned(),
            review,
        }))
    }

    pub async fn approve_review(&self, id: Uuid) -> Result<ReviewModel, AppError> {
        self.moderate(id, ReviewStatus::Approved).await
    }

    pub async fn reject_review(&self, id: Uuid) -> Result<ReviewModel, AppError> {
        self.moderate(id, ReviewStatus::Rejected).await
    }

    #[instrument(skip(self))]
    async fn moderate(&self, id: Uuid, status: ReviewStatus) -> Result<ReviewModel, AppError> {
        match self.reviews.moderate(id, status).await? {
            ModerationResult::Applied(review) => {
                info!(review_id = %id, %status, "Review moderated");
                Ok(review)
            }
            ModerationResult::Rejected(current) => {
                warn!(review_id = %id, %current, "Review already moderated");
                Err(AppError::InvalidTransition(format!(
                    "Review is already {current}"
                )))
            }
            ModerationResult::NotFound => Err(AppError::NotFound("Review not found".to_string())),
        }
    }
}
