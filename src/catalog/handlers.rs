use axum::extract::{Path, Query, State};
use std::sync::Arc;
use tracing::instrument;

use super::{
    models::{CategoryModel, PackageModel},
    service::CatalogService,
    types::{AddCategoryRequest, ChangeStatusRequest, PackageRequest},
};
use crate::shared::{parse_id, ApiResponse, AppError, AppState, ListParams, ListQuery, ValidJson};

fn service(state: &AppState) -> CatalogService {
    CatalogService::new(Arc::clone(&state.catalog_repository))
}

/// GET /api/{admin,client}/packages
#[instrument(name = "list_packages", skip(state))]
pub async fn list_packages(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<PackageModel>>, AppError> {
    let params = ListParams::from(query);
    let page = service(&state).list_packages(&params).await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

/// POST /api/admin/add-package
#[instrument(name = "add_package", skip(state, request))]
pub async fn add_package(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<PackageRequest>,
) -> Result<ApiResponse<PackageModel>, AppError> {
    let package = service(&state).add_package(request).await?;
    Ok(ApiResponse::created(package).with_message("Package created successfully"))
}

/// PUT /api/admin/update-package/:id
#[instrument(name = "update_package", skip(state, request))]
pub async fn update_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<PackageRequest>,
) -> Result<ApiResponse<PackageModel>, AppError> {
    let id = parse_id(&id, "package")?;
    let package = service(&state).update_package(id, request).await?;
    Ok(ApiResponse::ok(package).with_message("Package updated successfully"))
}

/// PUT /api/admin/change-status-package/:id
#[instrument(name = "change_package_status", skip(state, request))]
pub async fn change_package_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidJson(request): ValidJson<ChangeStatusRequest>,
) -> Result<ApiResponse<PackageModel>, AppError> {
    let id = parse_id(&id, "package")?;
    let package = service(&state).change_status(id, request).await?;
    Ok(ApiResponse::ok(package).with_message("Package status changed successfully"))
}

/// DELETE /api/admin/delete-package/:id
#[instrument(name = "delete_package", skip(state))]
pub async fn delete_package(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<()>, AppError> {
    let id = parse_id(&id, "package")?;
    service(&state).delete_package(id).await?;
    Ok(ApiResponse::message("Package deleted successfully"))
}

/// GET /api/{admin,client}/package-categories
#[instrument(name = "list_categories", skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
) -> Result<ApiResponse<Vec<CategoryModel>>, AppError> {
    let categories = service(&state).list_categories().await?;
    Ok(ApiResponse::ok(categories))
}

/// POST /api/admin/add-package-category
#[instrument(name = "add_category", skip(state, request))]
pub async fn add_category(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<AddCategoryRequest>,
) -> Result<ApiResponse<CategoryModel>, AppError> {
    let category = service(&state).add_category(request).await?;
    Ok(ApiResponse::created(category).with_message("Package category created successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AvatarStore;
    use crate::session::TokenConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::{get, post, put},
        Router,
    };
    use serde_json::{json, Value};
    use tower::ServiceExt; // for `oneshot`

    fn app() -> Router {
        let state = AppState::in_memory(
            TokenConfig::new("catalog-secret", 7),
            AvatarStore::new(std::env::temp_dir()),
        );
        Router::new()
            .route("/packages", get(list_packages))
            .route("/add-package", post(add_package))
            .route("/change-status-package/:id", put(change_package_status))
            .route("/add-package-category", post(add_category))
            .with_state(state)
    }

    async fn send(app: &Router, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_package_endpoints() {
        let app = app();

        let (status, category) = send(&app, "POST", "/add-package-category", json!({"name": "Gym"})).await;
        assert_eq!(status, StatusCode::CREATED);
        let category_id = category["data"]["id"].as_str().unwrap().to_string();

        let (status, created) = send(
            &app,
            "POST",
            "/add-package",
            json!({
                "packageName": "Gold",
                "description": "All access",
                "price": 500,
                "durationInDays": 30,
                "category": category_id
            }),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["data"]["status"], "active");
        let package_id = created["data"]["id"].as_str().unwrap().to_string();

        let (status, _) = send(
            &app,
            "PUT",
            &format!("/change-status-package/{package_id}"),
            json!({"newStatus": "paused"}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, listed) = send(&app, "GET", "/packages?search=gold&page=abc", json!({})).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed["pagination"]["totalResults"], 1);
        assert_eq!(listed["pagination"]["currentPage"], 1);
        assert_eq!(listed["data"][0]["packageName"], "Gold");

        let (status, _) = send(&app, "GET", "/packages?status=archived", json!({})).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
