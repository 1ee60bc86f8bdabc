use async_trait::async_trait;
use chrono::Utc;
use sqlx::{PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use super::models::{CatalogStatus, CategoryModel, PackageModel, PackageSortKey};
use crate::shared::{db_error, like_pattern, AppError, ListParams, Page};

const DUPLICATE_PACKAGE: &str = "Package name already exists";
const DUPLICATE_CATEGORY: &str = "Package category already exists";

/// Trait for package and package-category storage
#[async_trait]
pub trait CatalogRepository {
    async fn create_category(&self, category: &CategoryModel) -> Result<(), AppError>;
    /// All categories ordered by display order then name
    async fn list_categories(&self) -> Result<Vec<CategoryModel>, AppError>;
    async fn get_category(&self, id: Uuid) -> Result<Option<CategoryModel>, AppError>;

    /// Inserts a package; a duplicate name (case-insensitive) is a `Conflict`
    async fn create_package(&self, package: &PackageModel) -> Result<(), AppError>;
    async fn get_package(&self, id: Uuid) -> Result<Option<PackageModel>, AppError>;
    async fn find_packages(&self, ids: &[Uuid]) -> Result<Vec<PackageModel>, AppError>;
    /// Ids of packages whose name contains `term`
    async fn search_package_ids(&self, term: &str) -> Result<Vec<Uuid>, AppError>;
    /// Search covers name, description and features
    async fn list_packages(
        &self,
        status: Option<CatalogStatus>,
        params: &ListParams,
    ) -> Result<Page<PackageModel>, AppError>;
    /// Overwrites every editable field; `NotFound` if the package is gone
    async fn update_package(&self, package: &PackageModel) -> Result<(), AppError>;
    async fn set_package_status(
        &self,
        id: Uuid,
        status: CatalogStatus,
    ) -> Result<Option<PackageModel>, AppError>;
    /// Returns false when there was nothing to delete
    async fn delete_package(&self, id: Uuid) -> Result<bool, AppError>;
}

fn sort_packages(packages: &mut [PackageModel], params: &ListParams) {
    let key: PackageSortKey = params.sort_key();
    packages.sort_by(|a, b| {
        let ordering = match key {
            PackageSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            PackageSortKey::PackageName => a.package_name.cmp(&b.package_name),
            PackageSortKey::Price => a.price.cmp(&b.price),
            PackageSortKey::DurationInDays => a.duration_in_days.cmp(&b.duration_in_days),
            PackageSortKey::DisplayOrder => a.display_order.cmp(&b.display_order),
        };
        params.sort_order.apply(ordering)
    });
}

fn package_matches(package: &PackageModel, params: &ListParams) -> bool {
    let mut fields = vec![package.package_name.as_str(), package.description.as_str()];
    fields.extend(package.features.iter().map(String::as_str));
    params.matches(&fields)
}

/// In-memory implementation of CatalogRepository for development and testing
pub struct InMemoryCatalogRepository {
    categories: RwLock<HashMap<Uuid, CategoryModel>>,
    packages: RwLock<HashMap<Uuid, PackageModel>>,
}

impl Default for InMemoryCatalogRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self {
            categories: RwLock::new(HashMap::new()),
            packages: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    #[instrument(skip(self, category), fields(category_id = %category.id))]
    async fn create_category(&self, category: &CategoryModel) -> Result<(), AppError> {
        let mut categories = self.categories.write().await;
        if categories
            .values()
            .any(|c| c.name.eq_ignore_ascii_case(&category.name))
        {
            warn!(name = %category.name, "Category already exists in memory");
            return Err(AppError::Conflict(DUPLICATE_CATEGORY.to_string()));
        }
        categories.insert(category.id, category.clone());
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<CategoryModel>, AppError> {
        let categories = self.categories.read().await;
        let mut list: Vec<CategoryModel> = categories.values().cloned().collect();
        list.sort_by(|a, b| {
            a.display_order
                .cmp(&b.display_order)
                .then_with(|| a.name.cmp(&b.name))
        });
        Ok(list)
    }

    #[instrument(skip(self))]
    async fn get_category(&self, id: Uuid) -> Result<Option<CategoryModel>, AppError> {
        Ok(self.categories.read().await.get(&id).cloned())
    }

    #[instrument(skip(self, package), fields(package_id = %package.id))]
    async fn create_package(&self, package: &PackageModel) -> Result<(), AppError> {
        let mut packages = self.packages.write().await;
        if packages
            .values()
            .any(|p| p.package_name.eq_ignore_ascii_case(&package.package_name))
        {
            warn!(name = %package.package_name, "Package already exists in memory");
            return Err(AppError::Conflict(DUPLICATE_PACKAGE.to_string()));
        }
        packages.insert(package.id, package.clone());

        debug!("Package created in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_package(&self, id: Uuid) -> Result<Option<PackageModel>, AppError> {
        Ok(self.packages.read().await.get(&id).cloned())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_packages(&self, ids: &[Uuid]) -> Result<Vec<PackageModel>, AppError> {
        let packages = self.packages.read().await;
        Ok(ids.iter().filter_map(|id| packages.get(id).cloned()).collect())
    }

    #[instrument(skip(self))]
    async fn search_package_ids(&self, term: &str) -> Result<Vec<Uuid>, AppError> {
        let needle = term.trim().to_lowercase();
        Ok(self
            .packages
            .read()
            .await
            .values()
            .filter(|p| p.package_name.to_lowercase().contains(&needle))
            .map(|p| p.id)
            .collect())
    }

    #[instrument(skip(self, params))]
    async fn list_packages(
        &self,
        status: Option<CatalogStatus>,
        params: &ListParams,
    ) -> Result<Page<PackageModel>, AppError> {
        let packages = self.packages.read().await;
        let mut matching: Vec<PackageModel> = packages
            .values()
            .filter(|p| status.map_or(true, |status| p.status == status))
            .filter(|p| package_matches(p, params))
            .cloned()
            .collect();
        sort_packages(&mut matching, params);
        Ok(params.paginate(matching))
    }

    #[instrument(skip(self, package), fields(package_id = %package.id))]
    async fn update_package(&self, package: &PackageModel) -> Result<(), AppError> {
        let mut packages = self.packages.write().await;
        if packages.values().any(|p| {
            p.id != package.id && p.package_name.eq_ignore_ascii_case(&package.package_name)
        }) {
            return Err(AppError::Conflict(DUPLICATE_PACKAGE.to_string()));
        }

        let stored = packages
            .get_mut(&package.id)
            .ok_or_else(|| AppError::NotFound("Package not found".to_string()))?;
        *stored = PackageModel {
            updated_at: Utc::now(),
            created_at: stored.created_at,
            ..package.clone()
        };
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_package_status(
        &self,
        id: Uuid,
        status: CatalogStatus,
    ) -> Result<Option<PackageModel>, AppError> {
        let mut packages = self.packages.write().await;
        Ok(packages.get_mut(&id).map(|package| {
            package.status = status;
            package.updated_at = Utc::now();
            package.clone()
        }))
    }

    #[instrument(skip(self))]
    async fn delete_package(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.packages.write().await.remove(&id).is_some())
    }
}

const PACKAGE_COLUMNS: &str = "id, package_name, description, price, duration_in_days, features, \
     category_id, status, display_order, created_at, updated_at";
const CATEGORY_COLUMNS: &str =
    "id, name, description, status, display_order, created_at, updated_at";

fn push_package_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    status: Option<CatalogStatus>,
    pattern: Option<String>,
) {
    builder.push(" WHERE TRUE");
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(pattern) = pattern {
        builder
            .push(" AND (package_name ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR array_to_string(features, ' ') ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// PostgreSQL implementation of CatalogRepository
pub struct PostgresCatalogRepository {
    pool: PgPool,
}

impl PostgresCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl CatalogRepository for PostgresCatalogRepository {
    #[instrument(skip(self, category), fields(category_id = %category.id))]
    async fn create_category(&self, category: &CategoryModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO package_categories (id, name, description, status, display_order, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7)",
        )
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.description)
        .bind(category.status)
        .bind(category.display_order)
        .bind(category.created_at)
        .bind(category.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_CATEGORY))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn list_categories(&self) -> Result<Vec<CategoryModel>, AppError> {
        sqlx::query_as::<_, CategoryModel>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM package_categories ORDER BY display_order ASC, name ASC"
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_CATEGORY))
    }

    #[instrument(skip(self))]
    async fn get_category(&self, id: Uuid) -> Result<Option<CategoryModel>, AppError> {
        sqlx::query_as::<_, CategoryModel>(&format!(
            "SELECT {CATEGORY_COLUMNS} FROM package_categories WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_CATEGORY))
    }

    #[instrument(skip(self, package), fields(package_id = %package.id))]
    async fn create_package(&self, package: &PackageModel) -> Result<(), AppError> {
        sqlx::query(&format!(
            "INSERT INTO packages ({PACKAGE_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)"
        ))
        .bind(package.id)
        .bind(&package.package_name)
        .bind(&package.description)
        .bind(package.price)
        .bind(package.duration_in_days)
        .bind(&package.features)
        .bind(package.category_id)
        .bind(package.status)
        .bind(package.display_order)
        .bind(package.created_at)
        .bind(package.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_PACKAGE))?;

        debug!("Package created in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_package(&self, id: Uuid) -> Result<Option<PackageModel>, AppError> {
        sqlx::query_as::<_, PackageModel>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_PACKAGE))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_packages(&self, ids: &[Uuid]) -> Result<Vec<PackageModel>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        sqlx::query_as::<_, PackageModel>(&format!(
            "SELECT {PACKAGE_COLUMNS} FROM packages WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_PACKAGE))
    }

    #[instrument(skip(self))]
    async fn search_package_ids(&self, term: &str) -> Result<Vec<Uuid>, AppError> {
        sqlx::query_scalar::<_, Uuid>("SELECT id FROM packages WHERE package_name ILIKE $1")
            .bind(like_pattern(term))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, DUPLICATE_PACKAGE))
    }

    #[instrument(skip(self, params))]
    async fn list_packages(
        &self,
        status: Option<CatalogStatus>,
        params: &ListParams,
    ) -> Result<Page<PackageModel>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM packages");
        push_package_filters(&mut count, status, params.search_pattern());
        let total = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, DUPLICATE_PACKAGE))?;

        let key: PackageSortKey = params.sort_key();
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {PACKAGE_COLUMNS} FROM packages"));
        push_package_filters(&mut query, status, params.search_pattern());
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
            .build_query_as::<PackageModel>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, DUPLICATE_PACKAGE))?;

        Ok(Page { items, total })
    }

    #[instrument(skip(self, package), fields(package_id = %package.id))]
    async fn update_package(&self, package: &PackageModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE packages SET package_name = $1, description = $2, price = $3, duration_in_days = $4, \
             features = $5, category_id = $6, status = $7, display_order = $8, updated_at = NOW() \
             WHERE id = $9",
        )
        .bind(&package.package_name)
        .bind(&package.description)
        .bind(package.price)
        .bind(package.duration_in_days)
        .bind(&package.features)
        .bind(package.category_id)
        .bind(package.status)
        .bind(package.display_order)
        .bind(package.id)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_PACKAGE))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Package not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn set_package_status(
        &self,
        id: Uuid,
        status: CatalogStatus,
    ) -> Result<Option<PackageModel>, AppError> {
        sqlx::query_as::<_, PackageModel>(&format!(
            "UPDATE packages SET status = $1, updated_at = NOW() WHERE id = $2 RETURNING {PACKAGE_COLUMNS}"
        ))
        .bind(status)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, DUPLICATE_PACKAGE))
    }

    #[instrument(skip(self))]
    async fn delete_package(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM packages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, DUPLICATE_PACKAGE))?;
        Ok(result.rows_affected() > 0)
    }
}
