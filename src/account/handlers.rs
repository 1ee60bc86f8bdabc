use axum::{
    extract::{Multipart, Path, Query, State},
    Extension,
};
use std::sync::Arc;
use tracing::{info, instrument, warn};

use super::{
    avatar::AvatarUpload,
    models::{AccountModel, AccountResponse, AccountStatus, Role},
    service::AccountService,
    types::{CreateCoachRequest, RegisterClientRequest, UpdateProfileRequest},
};
use crate::session::{Principal, SessionService};
use crate::shared::{parse_id, ApiResponse, AppError, AppState, ListParams, ListQuery, ValidJson};

fn service(state: &AppState) -> AccountService {
    AccountService::new(Arc::clone(&state.account_repository))
}

async fn list_role(
    state: &AppState,
    role: Role,
    query: ListQuery,
) -> Result<ApiResponse<Vec<AccountResponse>>, AppError> {
    let params = ListParams::from(query);
    let page = service(state).list_accounts(role, &params).await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

async fn lock_open_role(
    state: &AppState,
    role: Role,
    raw_id: &str,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let id = parse_id(raw_id, &role.to_string())?;
    let account = service(state).lock_or_open(role, id).await?;
    let verb = match account.status {
        AccountStatus::Active => "opened",
        _ => "locked",
    };
    Ok(ApiResponse::ok(AccountResponse::from(account))
        .with_message(format!("{} {verb} successfully", role.label())))
}

async fn ban_role(
    state: &AppState,
    role: Role,
    raw_id: &str,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let id = parse_id(raw_id, &role.to_string())?;
    let account = service(state).ban(role, id).await?;
    Ok(ApiResponse::ok(AccountResponse::from(account))
        .with_message(format!("{} banned successfully", role.label())))
}

/// GET /api/admin/all-clients
#[instrument(name = "list_clients", skip(state))]
pub async fn list_clients(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<AccountResponse>>, AppError> {
    list_role(&state, Role::Client, query).await
}

/// PUT /api/admin/lock-open-customer/:id
#[instrument(name = "lock_open_client", skip(state))]
pub async fn lock_open_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    lock_open_role(&state, Role::Client, &id).await
}

/// PUT /api/admin/ban-customer/:id
#[instrument(name = "ban_client", skip(state))]
pub async fn ban_client(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    ban_role(&state, Role::Client, &id).await
}

/// GET /api/admin/all-coaches
#[instrument(name = "list_coaches", skip(state))]
pub async fn list_coaches(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<AccountResponse>>, AppError> {
    list_role(&state, Role::Coach, query).await
}

/// GET /api/client/all-coaches
#[instrument(name = "browse_coaches", skip(state))]
pub async fn browse_coaches(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<ApiResponse<Vec<AccountResponse>>, AppError> {
    let params = ListParams::from(query);
    let page = service(&state).active_coaches(&params).await?;
    let pagination = params.pagination(page.total);
    Ok(ApiResponse::ok(page.items).with_pagination(pagination))
}

/// POST /api/admin/add-coach
#[instrument(name = "add_coach", skip(state, request))]
pub async fn add_coach(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<CreateCoachRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let coach = service(&state).create_coach(request).await?;
    Ok(ApiResponse::created(AccountResponse::from(coach)).with_message("Coach created successfully"))
}

/// PUT /api/admin/lock-open-coach/:id
#[instrument(name = "lock_open_coach", skip(state))]
pub async fn lock_open_coach(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    lock_open_role(&state, Role::Coach, &id).await
}

/// PUT /api/admin/ban-coach/:id
#[instrument(name = "ban_coach", skip(state))]
pub async fn ban_coach(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    ban_role(&state, Role::Coach, &id).await
}

/// POST /api/client/register
///
/// Creates an active client and signs them in straight away
#[instrument(name = "register_client", skip(state, request))]
pub async fn register_client(
    State(state): State<AppState>,
    ValidJson(request): ValidJson<RegisterClientRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let account = service(&state).register_client(request).await?;
    let token = SessionService::from_state(&state).issue_token(&account)?;

    info!(account_id = %account.id, "Client registered and signed in");
    Ok(ApiResponse::created(AccountResponse::from(account))
        .with_message("Registration successful")
        .with_token(token))
}

/// GET /api/client/my-profile
#[instrument(name = "my_profile", skip_all, fields(account_id = %principal.id))]
pub async fn my_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let account = service(&state).get_account(Role::Client, principal.id).await?;
    Ok(ApiResponse::ok(AccountResponse::from(account)))
}

/// PUT /api/client/update-profile
#[instrument(name = "update_profile", skip_all, fields(account_id = %principal.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    ValidJson(request): ValidJson<UpdateProfileRequest>,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let account = service(&state).update_profile(principal.id, request).await?;
    Ok(ApiResponse::ok(AccountResponse::from(account)).with_message("Profile updated successfully"))
}

/// PUT /api/client/update-avatar (multipart, field `avatar`)
#[instrument(name = "update_avatar", skip_all, fields(account_id = %principal.id))]
pub async fn update_avatar(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    multipart: Multipart,
) -> Result<ApiResponse<AccountResponse>, AppError> {
    let upload = read_avatar_field(multipart).await?;
    let account: AccountModel = service(&state)
        .update_avatar(principal.id, &state.avatar_store, upload)
        .await?;
    Ok(ApiResponse::ok(AccountResponse::from(account)).with_message("Avatar updated successfully"))
}

async fn read_avatar_field(mut multipart: Multipart) -> Result<AvatarUpload, AppError> {
    let malformed = |e: axum::extract::multipart::MultipartError| {
        warn!(error = %e, "Failed to read multipart body");
        AppError::Validation(format!("Invalid upload: {e}"))
    };

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        if field.name() != Some("avatar") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = field.bytes().await.map_err(malformed)?;

        return Ok(AvatarUpload {
            file_name,
            content_type,
            bytes: bytes.to_vec(),
        });
    }

    Err(AppError::Validation("No avatar file uploaded".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::avatar::AvatarStore;
    use crate::session::TokenConfig;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        routing::{get, post, put},
        Router,
    };
    use serde_json::Value;
    use tower::ServiceExt; // for `oneshot`

    fn app_state() -> AppState {
        AppState::in_memory(
            TokenConfig::new("handler-test-secret", 1),
            AvatarStore::new(std::env::temp_dir().join("gymhub-handler-tests")),
        )
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    fn json_request(method: &str, uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_register_returns_token_and_profile() {
        let app = Router::new()
            .route("/register", post(register_client))
            .with_state(app_state());

        let response = app
            .oneshot(json_request(
                "POST",
                "/register",
                r#"{"fullname":"Ann","email":"ann@gym.io","password":"secret1","phone":"0900"}"#,
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::CREATED);
        let json = body_json(response).await;
        assert_eq!(json["success"], true);
        assert!(json["token"].as_str().is_some_and(|t| !t.is_empty()));
        assert_eq!(json["data"]["email"], "ann@gym.io");
        assert!(json["data"].get("passwordHash").is_none());
    }

    #[tokio::test]
    async fn test_register_malformed_json_is_400() {
        let app = Router::new()
            .route("/register", post(register_client))
            .with_state(app_state());

        let response = app
            .oneshot(json_request("POST", "/register", "{not json"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["success"], false);
    }

    #[tokio::test]
    async fn test_lock_open_and_ban_flow() {
        let state = app_state();
        let client = service(&state)
            .register_client(RegisterClientRequest {
                fullname: "Ann".into(),
                email: "ann@gym.io".into(),
                password: "secret1".into(),
                phone: "0900".into(),
            })
            .await
            .unwrap();

        let app = Router::new()
            .route("/lock/:id", put(lock_open_client))
            .route("/ban/:id", put(ban_client))
            .route("/clients", get(list_clients))
            .with_state(state);

        let response = app
            .clone()
            .oneshot(json_request("PUT", &format!("/lock/{}", client.id), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["data"]["status"], "inactive");

        let response = app
            .clone()
            .oneshot(json_request("PUT", &format!("/ban/{}", client.id), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .clone()
            .oneshot(json_request("PUT", &format!("/lock/{}", client.id), ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app
            .clone()
            .oneshot(json_request("PUT", "/lock/not-a-uuid", ""))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .oneshot(json_request("GET", "/clients?status=banned", ""))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["pagination"]["totalResults"], 1);
        assert_eq!(json["data"][0]["status"], "banned");
    }
}
