use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, warn};

pub mod extract;
pub mod listing;
pub mod response;

pub use extract::{nullable, parse_id, require, ValidJson};
pub use listing::{like_pattern, ListParams, ListQuery, Page, Pagination, SortOrder};
pub use response::ApiResponse;

use crate::account::{
    avatar::AvatarStore,
    repository::{AccountRepository, InMemoryAccountRepository, PostgresAccountRepository},
};
use crate::catalog::repository::{
    CatalogRepository, InMemoryCatalogRepository, PostgresCatalogRepository,
};
use crate::coaching::repository::{
    CoachingRepository, InMemoryCoachingRepository, PostgresCoachingRepository,
};
use crate::order::repository::{InMemoryOrderRepository, OrderRepository, PostgresOrderRepository};
use crate::post::repository::{InMemoryPostRepository, PostRepository, PostgresPostRepository};
use crate::review::repository::{
    InMemoryReviewRepository, PostgresReviewRepository, ReviewRepository,
};
use crate::room::repository::{InMemoryRoomRepository, PostgresRoomRepository, RoomRepository};
use crate::session::TokenConfig;

/// Shared application state containing all dependencies
#[derive(Clone)]
pub struct AppState {
    pub account_repository: Arc<dyn AccountRepository + Send + Sync>,
    pub catalog_repository: Arc<dyn CatalogRepository + Send + Sync>,
    pub room_repository: Arc<dyn RoomRepository + Send + Sync>,
    pub order_repository: Arc<dyn OrderRepository + Send + Sync>,
    pub coaching_repository: Arc<dyn CoachingRepository + Send + Sync>,
    pub review_repository: Arc<dyn ReviewRepository + Send + Sync>,
    pub post_repository: Arc<dyn PostRepository + Send + Sync>,
    pub token_config: TokenConfig,
    pub avatar_store: AvatarStore,
}

impl AppState {
    /// State backed entirely by in-memory repositories (development and tests)
    pub fn in_memory(token_config: TokenConfig, avatar_store: AvatarStore) -> Self {
        AppStateBuilder::new(token_config, avatar_store).build()
    }

    /// State backed by PostgreSQL repositories sharing one pool
    pub fn postgres(pool: PgPool, token_config: TokenConfig, avatar_store: AvatarStore) -> Self {
        Self {
            account_repository: Arc::new(PostgresAccountRepository::new(pool.clone())),
            catalog_repository: Arc::new(PostgresCatalogRepository::new(pool.clone())),
            room_repository: Arc::new(PostgresRoomRepository::new(pool.clone())),
            order_repository: Arc::new(PostgresOrderRepository::new(pool.clone())),
            coaching_repository: Arc::new(PostgresCoachingRepository::new(pool.clone())),
            review_repository: Arc::new(PostgresReviewRepository::new(pool.clone())),
            post_repository: Arc::new(PostgresPostRepository::new(pool)),
            token_config,
            avatar_store,
        }
    }
}

/// Builder for AppState; every repository not overridden is in-memory
pub struct AppStateBuilder {
    token_config: TokenConfig,
    avatar_store: AvatarStore,
    account_repository: Option<Arc<dyn AccountRepository + Send + Sync>>,
    catalog_repository: Option<Arc<dyn CatalogRepository + Send + Sync>>,
    room_repository: Option<Arc<dyn RoomRepository + Send + Sync>>,
    order_repository: Option<Arc<dyn OrderRepository + Send + Sync>>,
    coaching_repository: Option<Arc<dyn CoachingRepository + Send + Sync>>,
    review_repository: Option<Arc<dyn ReviewRepository + Send + Sync>>,
    post_repository: Option<Arc<dyn PostRepository + Send + Sync>>,
}

impl AppStateBuilder {
    pub fn new(token_config: TokenConfig, avatar_store: AvatarStore) -> Self {
        Self {
            token_config,
            avatar_store,
            account_repository: None,
            catalog_repository: None,
            room_repository: None,
            order_repository: None,
            coaching_repository: None,
            review_repository: None,
            post_repository: None,
        }
    }

    pub fn with_account_repository(
        mut self,
        repo: Arc<dyn AccountRepository + Send + Sync>,
    ) -> Self {
        self.account_repository = Some(repo);
        self
    }

    pub fn with_catalog_repository(
        mut self,
        repo: Arc<dyn CatalogRepository + Send + Sync>,
    ) -> Self {
        self.catalog_repository = Some(repo);
        self
    }

    pub fn with_room_repository(mut self, repo: Arc<dyn RoomRepository + Send + Sync>) -> Self {
        self.room_repository = Some(repo);
        self
    }

    pub fn with_order_repository(mut self, repo: Arc<dyn OrderRepository + Send + Sync>) -> Self {
        self.order_repository = Some(repo);
        self
    }

    pub fn with_coaching_repository(
        mut self,
        repo: Arc<dyn CoachingRepository + Send + Sync>,
    ) -> Self {
        self.coaching_repository = Some(repo);
        self
    }

    pub fn with_review_repository(
        mut self,
        repo: Arc<dyn ReviewRepository + Send + Sync>,
    ) -> Self {
        self.review_repository = Some(repo);
        self
    }

    pub fn with_post_repository(mut self, repo: Arc<dyn PostRepository + Send + Sync>) -> Self {
        self.post_repository = Some(repo);
        self
    }

    pub fn build(self) -> AppState {
        AppState {
            account_repository: self
                .account_repository
                .unwrap_or_else(|| Arc::new(InMemoryAccountRepository::new())),
            catalog_repository: self
                .catalog_repository
                .unwrap_or_else(|| Arc::new(InMemoryCatalogRepository::new())),
            room_repository: self
                .room_repository
                .unwrap_or_else(|| Arc::new(InMemoryRoomRepository::new())),
            order_repository: self
                .order_repository
                .unwrap_or_else(|| Arc::new(InMemoryOrderRepository::new())),
            coaching_repository: self
                .coaching_repository
                .unwrap_or_else(|| Arc::new(InMemoryCoachingRepository::new())),
            review_repository: self
                .review_repository
                .unwrap_or_else(|| Arc::new(InMemoryReviewRepository::new())),
            post_repository: self
                .post_repository
                .unwrap_or_else(|| Arc::new(InMemoryPostRepository::new())),
            token_config: self.token_config,
            avatar_store: self.avatar_store,
        }
    }
}

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is locked or not activated")]
    AccountLocked,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Token malformed")]
    TokenMalformed,

    #[error("JWT error: {0}")]
    JwtError(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Package already reviewed by this client")]
    DuplicateReview,

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Internal server error")]
    Internal,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::DuplicateReview
            | AppError::InvalidTransition(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidCredentials
            | AppError::Unauthorized(_)
            | AppError::TokenExpired
            | AppError::TokenMalformed => StatusCode::UNAUTHORIZED,
            AppError::AccountLocked | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::JwtError(_) | AppError::DatabaseError(_) | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let message = match self {
            AppError::Validation(msg)
            | AppError::Unauthorized(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Conflict(msg)
            | AppError::InvalidTransition(msg) => msg,
            AppError::InvalidCredentials => "Invalid email or password".to_string(),
            AppError::AccountLocked => {
                "Your account is locked or has not been activated".to_string()
            }
            AppError::TokenExpired => "Session has expired, please log in again".to_string(),
            AppError::TokenMalformed => "Invalid session token".to_string(),
            AppError::DuplicateReview => "You have already reviewed this package".to_string(),
            AppError::JwtError(detail) | AppError::DatabaseError(detail) => {
                error!(error = %detail, "Request failed with an internal error");
                "System error, please try again later".to_string()
            }
            AppError::Internal => "System error, please try again later".to_string(),
        };

        let body = Json(json!({
            "success": false,
            "message": message
        }));

        (status, body).into_response()
    }
}

/// Maps a sqlx error to an AppError; unique violations become `Conflict(conflict)`
pub(crate) fn db_error(error: sqlx::Error, conflict: &str) -> AppError {
    if let Some(db_error) = error.as_database_error() {
        if db_error.is_unique_violation() {
            warn!(error = %error, "Unique constraint violated");
            return AppError::Conflict(conflict.to_string());
        }
    }
    warn!(error = %error, "Database operation failed");
    AppError::DatabaseError(error.to_string())
}
