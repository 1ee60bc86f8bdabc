use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, HeaderMap},
    middleware::Next,
    response::Response,
    Extension,
};
use tracing::{info, instrument, warn};

use super::{service::SessionService, types::Principal};
use crate::account::Role;
use crate::shared::{AppError, AppState};

/// State for [`require_principal`]: which role's store guards the route group.
///
/// Usage: `.route_layer(middleware::from_fn_with_state(RoleGate::new(state, Role::Coach), require_principal))`.
/// Handlers can then extract `Extension<Principal>`.
#[derive(Clone)]
pub struct RoleGate {
    state: AppState,
    role: Role,
}

impl RoleGate {
    pub fn new(state: AppState, role: Role) -> Self {
        Self { state, role }
    }
}

fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let denied = || AppError::Unauthorized("Not authorized, no token provided".to_string());

    let header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| {
            warn!("Missing Authorization header in request");
            denied()
        })?;

    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| {
            warn!("Invalid Authorization header format (expected Bearer token)");
            denied()
        })
}

/// Authenticates the bearer token against the gate's role and attaches the [`Principal`]
#[instrument(skip_all, fields(role = %gate.role, uri = %req.uri()))]
pub async fn require_principal(
    State(gate): State<RoleGate>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?;

    let principal = SessionService::from_state(&gate.state)
        .authenticate(gate.role, token)
        .await
        .inspect_err(|e| warn!("Authentication failed: {}", e))?;

    info!(account_id = %principal.id, "Authentication successful, adding principal to request");
    req.extensions_mut().insert(principal);

    Ok(next.run(req).await)
}

/// Second gate for admin routes restricted to super admins. Runs after [`require_principal`].
#[instrument(skip_all, fields(account_id = %principal.id))]
pub async fn require_super_admin(
    Extension(principal): Extension<Principal>,
    req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if !principal.is_super_admin() {
        warn!("Super admin route refused");
        return Err(AppError::Forbidden(
            "Only a super admin can perform this action".to_string(),
        ));
    }

    Ok(next.run(req).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_bearer_token_parsing() {
        let mut headers = HeaderMap::new();
        assert!(matches!(bearer_token(&headers), Err(AppError::Unauthorized(_))));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert!(matches!(bearer_token(&headers), Err(AppError::Unauthorized(_))));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert!(matches!(bearer_token(&headers), Err(AppError::Unauthorized(_))));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&headers).unwrap(), "abc.def.ghi");
    }
}
