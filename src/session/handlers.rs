use axum::{extract::State, Extension};
use tracing::{info, instrument};

use super::{
    service::SessionService,
    types::{LoginRequest, Principal},
};
use crate::account::{models::AccountResponse, Role};
use crate::shared::{ApiResponse, AppError, AppState, ValidJson};

async fn login_as(
    state: &AppState,
    role: Role,
    request: LoginRequest,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let (token, account) = SessionService::from_state(state).login(role, request).await?;

    info!(account_id = %account.id, %role, "Session issued");
    Ok(ApiResponse::ok(AccountResponse::from(account))
        .with_message("Login successful")
        .with_token(token))
}

/// POST /api/admin/login
#[instrument(name = "login_admin", skip_all)]
pub async fn login_admin(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    login_as(&state, Role::Admin, request).await
}

/// POST /api/client/login
#[instrument(name = "login_client", skip_all)]
pub async fn login_client(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    login_as(&state, Role::Client, request).await
}

/// POST /api/coach/login
#[instrument(name = "login_coach", skip_all)]
pub async fn login_coach(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<LoginRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    login_as(&state, Role::Coach, request).await
}

/// GET /api/{admin,client,coach}/check-login
///
/// Echoes the profile of the principal the role gate attached
#[instrument(name = "check_login", skip_all, fields(account_id = %principal.id))]
pub async fn check_login(
    Extension(principal): Extension<Principal>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    Ok(ApiResponse::ok(AccountResponse::from(principal.account)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{types::RegisterClientRequest, AccountService, AvatarStore};
    use crate::session::TokenConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::post,
        Router,
    };
    use std::sync::Arc;
    use tower::ServiceExt; // for `oneshot`

    async fn app() -> Router {
        let state = AppState::in_memory(
            TokenConfig::new("login-handler-secret", 7),
            AvatarStore::new(std::env::temp_dir()),
        );
        AccountService::new(Arc::clone(&state.account_repository))
            .register_client(RegisterClientRequest {
                fullname: "Ann".into(),
                email: "ann@gym.io".into(),
                password: "secret1".into(),
                phone: "0900".into(),
            })
            .await
            .unwrap();

        Router::new()
            .route("/client/login", post(login_client))
            .route("/coach/login", post(login_coach))
            .with_state(state)
    }

    fn login_request(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_login_handler_success() {
        let response = app()
            .await
            .oneshot(login_request(
                "/client/login",
                r#"{"email":"ann@gym.io","password":"secret1"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["success"], true);
        assert!(json["token"].is_string());
        assert_eq!(json["data"]["role"], "client");
        assert!(json["data"]["lastLogin"].is_string());
    }

    #[tokio::test]
    async fn test_login_handler_failures() {
        let app = app().await;

        let wrong_password = app
            .clone()
            .oneshot(login_request(
                "/client/login",
                r#"{"email":"ann@gym.io","password":"nope-nope"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(wrong_password.status(), StatusCode::UNAUTHORIZED);

        let other_store = app
            .clone()
            .oneshot(login_request(
                "/coach/login",
                r#"{"email":"ann@gym.io","password":"secret1"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(other_store.status(), StatusCode::UNAUTHORIZED);

        let missing = app
            .oneshot(login_request("/client/login", r#"{"email":"ann@gym.io"}"#))
            .await
            .unwrap();
        assert_eq!(missing.status(), StatusCode::BAD_REQUEST);
    }
}
