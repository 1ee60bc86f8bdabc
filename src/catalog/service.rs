use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{
    models::{CatalogStatus, CategoryModel, PackageModel},
    repository::CatalogRepository,
    types::{AddCategoryRequest, ChangeStatusRequest, PackageRequest},
};
use crate::shared::{parse_id, require, AppError, ListParams, Page};

fn parse_status(raw: &str) -> Result<CatalogStatus, AppError> {
    CatalogStatus::from_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("Invalid status: {raw}")))
}

fn check_price(price: i64) -> Result<i64, AppError> {
    if price < 0 {
        return Err(AppError::Validation("price must not be negative".to_string()));
    }
    Ok(price)
}

fn check_duration(days: i32) -> Result<i32, AppError> {
    if days < 1 {
        return Err(AppError::Validation(
            "durationInDays must be at least 1".to_string(),
        ));
    }
    Ok(days)
}

fn clean_features(features: Vec<String>) -> Vec<String> {
    features
        .into_iter()
        .map(|feature| feature.trim().to_string())
        .filter(|feature| !feature.is_empty())
        .collect()
}

/// Service for membership packages and their categories
pub struct CatalogService {
    repository: Arc<dyn CatalogRepository + Send + Sync>,
}

impl CatalogService {
    pub fn new(repository: Arc<dyn CatalogRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    async fn existing_category(&self, raw: &str) -> Result<Uuid, AppError> {
        let id = parse_id(raw, "category")?;
        self.repository
            .get_category(id)
            .await?
            .map(|category| category.id)
            .ok_or_else(|| AppError::NotFound("Package category not found".to_string()))
    }

    pub async fn get_package(&self, id: Uuid) -> Result<PackageModel, AppError> {
        self.repository
            .get_package(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Package not found".to_string()))
    }

    #[instrument(skip(self, params))]
    pub async fn list_packages(&self, params: &ListParams) -> Result<Page<PackageModel>, AppError> {
        let status = params.status_filter::<CatalogStatus>()?;
        self.repository.list_packages(status, params).await
    }

    #[instrument(skip(self, request))]
    pub async fn add_package(&self, request: PackageRequest) -> Result<PackageModel, AppError> {
        let missing = || {
            AppError::Validation(
                "packageName, description, price, durationInDays and category are required"
                    .to_string(),
            )
        };
        let package_name = request
            .package_name
            .filter(|name| !name.trim().is_empty())
            .ok_or_else(missing)?;
        let description = request
            .description
            .filter(|text| !text.trim().is_empty())
            .ok_or_else(missing)?;
        let price = check_price(request.price.ok_or_else(missing)?)?;
        let duration_in_days = check_duration(request.duration_in_days.ok_or_else(missing)?)?;
        let category = request.category.ok_or_else(missing)?;
        let category_id = self.existing_category(&category).await?;
        let status = match request.status {
            Some(raw) => parse_status(&raw)?,
            None => CatalogStatus::default(),
        };

        let now = Utc::now();
        let package = PackageModel {
            id: Uuid::new_v4(),
            package_name: package_name.trim().to_string(),
            description: description.trim().to_string(),
            price,
            duration_in_days,
            features: clean_features(request.features.unwrap_or_default()),
            category_id,
            status,
            display_order: request.display_order.unwrap_or(0),
            created_at: now,
            updated_at: now,
        };
        self.repository.create_package(&package).await?;

        info!(package_id = %package.id, name = %package.package_name, "Package created");
        Ok(package)
    }

    /// Partial update: only the fields present in the request change
    #[instrument(skip(self, request))]
    pub async fn update_package(
        &self,
        id: Uuid,
        request: PackageRequest,
    ) -> Result<PackageModel, AppError> {
        let mut package = self.get_package(id).await?;

        if let Some(name) = request.package_name {
            require(&name, "packageName")?;
            package.package_name = name.trim().to_string();
        }
        if let Some(description) = request.description {
            require(&description, "description")?;
            package.description = description.trim().to_string();
        }
        if let Some(price) = request.price {
            package.price = check_price(price)?;
        }
        if let Some(days) = request.duration_in_days {
            package.duration_in_days = check_duration(days)?;
        }
        if let Some(features) = request.features {
            package.features = clean_features(features);
        }
        if let Some(category) = request.category {
            package.category_id = self.existing_category(&category).await?;
        }
        if let Some(status) = request.status {
            package.status = parse_status(&status)?;
        }
        if let Some(order) = request.display_order {
            package.display_order = order;
        }

        self.repository.update_package(&package).await?;
        info!(package_id = %id, "Package updated");
        self.get_package(id).await
    }

    #[instrument(skip(self, request))]
    pub async fn change_status(
        &self,
        id: Uuid,
        request: ChangeStatusRequest,
    ) -> Result<PackageModel, AppError> {
        let status = parse_status(&request.new_status)?;
        let package = self
            .repository
            .set_package_status(id, status)
            .await?
            .ok_or_else(|| AppError::NotFound("Package not found".to_string()))?;

        info!(package_id = %id, %status, "Package status changed");
        Ok(package)
    }

    #[instrument(skip(self))]
    pub async fn delete_package(&self, id: Uuid) -> Result<(), AppError> {
        if !self.repository.delete_package(id).await? {
            return Err(AppError::NotFound("Package not found".to_string()));
        }
        info!(package_id = %id, "Package deleted");
        Ok(())
    }

    pub async fn list_categories(&self) -> Result<Vec<CategoryModel>, AppError> {
        self.repository.list_categories().await
    }

    #[instrument(skip(self, request))]
    pub async fn add_category(&self, request: AddCategoryRequest) -> Result<CategoryModel, AppError> {
        require(&request.name, "name")?;

        let category = CategoryModel::new(
            request.name.trim().to_string(),
            request.description,
            request.display_order.unwrap_or(0),
        );
        self.repository.create_category(&category).await?;

        info!(category_id = %category.id, "Package category created");
        Ok(category)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::repository::InMemoryCatalogRepository;

    async fn service_with_category() -> (CatalogService, CategoryModel) {
        let service = CatalogService::new(Arc::new(InMemoryCatalogRepository::new()));
        let category = service
            .add_category(AddCategoryRequest {
                name: "Gym".into(),
                ..AddCategoryRequest::default()
            })
            .await
            .unwrap();
        (service, category)
    }

    fn gold(category: &CategoryModel) -> PackageRequest {
        PackageRequest {
            package_name: Some("Gold".into()),
            description: Some("Unlimited access".into()),
            price: Some(500),
            duration_in_days: Some(30),
            features: Some(vec!["sauna".into(), "  ".into()]),
            category: Some(category.id.to_string()),
            ..PackageRequest::default()
        }
    }

    #[tokio::test]
    async fn test_add_package_round_trip_with_default_status() {
        let (service, category) = service_with_category().await;
        let created = service.add_package(gold(&category)).await.unwrap();

        let fetched = service.get_package(created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(fetched.status, CatalogStatus::Active);
        assert_eq!(fetched.features, vec!["sauna".to_string()]);
        assert_eq!(fetched.category_id, category.id);
    }

    #[tokio::test]
    async fn test_add_package_validation() {
        let (service, category) = service_with_category().await;

        let mut missing = gold(&category);
        missing.price = None;
        assert!(matches!(
            service.add_package(missing).await,
            Err(AppError::Validation(_))
        ));

        let mut zero_days = gold(&category);
        zero_days.duration_in_days = Some(0);
        assert!(matches!(
            service.add_package(zero_days).await,
            Err(AppError::Validation(_))
        ));

        let mut unknown_category = gold(&category);
        unknown_category.category = Some(Uuid::new_v4().to_string());
        assert!(matches!(
            service.add_package(unknown_category).await,
            Err(AppError::NotFound(_))
        ));

        service.add_package(gold(&category)).await.unwrap();
        assert!(matches!(
            service.add_package(gold(&category)).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_partial_update_and_status_change() {
        let (service, category) = service_with_category().await;
        let created = service.add_package(gold(&category)).await.unwrap();

        let updated = service
            .update_package(
                created.id,
                PackageRequest {
                    price: Some(650),
                    ..PackageRequest::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.price, 650);
        assert_eq!(updated.package_name, "Gold");

        let changed = service
            .change_status(
                created.id,
                ChangeStatusRequest {
                    new_status: "inactive".into(),
                },
            )
            .await
            .unwrap();
        assert_eq!(changed.status, CatalogStatus::Inactive);

        let invalid = service
            .change_status(
                created.id,
                ChangeStatusRequest {
                    new_status: "archived".into(),
                },
            )
            .await;
        assert!(matches!(invalid, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_delete_missing_package() {
        let (service, _) = service_with_category().await;
        assert!(matches!(
            service.delete_package(Uuid::new_v4()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
