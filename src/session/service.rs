use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::{
    password::verify_password,
    token::TokenConfig,
    types::{LoginRequest, Principal},
};
use crate::account::{AccountModel, AccountRepository, Role};
use crate::shared::{AppError, AppState};

/// Issues session tokens and resolves them back into principals
pub struct SessionService {
    accounts: Arc<dyn AccountRepository + Send + Sync>,
    tokens: TokenConfig,
}

impl SessionService {
    pub fn new(accounts: Arc<dyn AccountRepository + Send + Sync>, tokens: TokenConfig) -> Self {
        Self { accounts, tokens }
    }

    pub fn from_state(state: &AppState) -> Self {
        Self::new(
            Arc::clone(&state.account_repository),
            state.token_config.clone(),
        )
    }

    pub fn issue_token(&self, account: &AccountModel) -> Result<String, AppError> {
        self.tokens.create_token(account.id, account.role())
    }

    /// Checks credentials against one role's store and signs a token.
    ///
    /// Unknown email and wrong password fail identically. The status check
    /// runs only after the password matched.
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn login(
        &self,
        role: Role,
        request: LoginRequest,
    ) -> Result<(String, AccountModel), AppError> {
        if request.email.trim().is_empty() || request.password.is_empty() {
            return Err(AppError::Validation(
                "Email and password are required".to_string(),
            ));
        }

        let Some(mut account) = self.accounts.find_by_email(role, &request.email).await? else {
            debug!("No account for email");
            return Err(AppError::InvalidCredentials);
        };

        if !verify_password(&request.password, &account.password_hash)? {
            debug!(account_id = %account.id, "Password mismatch");
            return Err(AppError::InvalidCredentials);
        }

        if !account.is_active() {
            warn!(account_id = %account.id, status = %account.status, "Login refused for non-active account");
            return Err(AppError::AccountLocked);
        }

        let now = Utc::now();
        self.accounts.record_login(role, account.id, now).await?;
        account.last_login = Some(now);

        let token = self.issue_token(&account)?;
        info!(account_id = %account.id, %role, "Login successful");
        Ok((token, account))
    }

    /// Resolves a bearer token for a route guarded by `role`.
    /// The account is re-fetched so a lock or ban takes effect immediately.
    #[instrument(skip(self, token))]
    pub async fn authenticate(&self, role: Role, token: &str) -> Result<Principal, AppError> {
        let claims = self.tokens.validate_token(token)?;

        if claims.role != role {
            warn!(token_role = %claims.role, "Token presented to another role's routes");
            return Err(AppError::Unauthorized(
                "Access denied for this account type".to_string(),
            ));
        }

        let account = self
            .accounts
            .find_by_id(role, claims.sub)
            .await?
            .ok_or_else(|| {
                warn!(sub = %claims.sub, "Token subject no longer exists");
                AppError::Unauthorized("Account no longer exists".to_string())
            })?;

        if !account.is_active() {
            warn!(account_id = %account.id, status = %account.status, "Request from non-active account");
            return Err(AppError::AccountLocked);
        }

        Ok(Principal::from(account))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::{
        repository::InMemoryAccountRepository, types::RegisterClientRequest, AccountService,
    };
    use uuid::Uuid;

    struct Fixture {
        accounts: Arc<InMemoryAccountRepository>,
        service: SessionService,
        client: AccountModel,
    }

    async fn fixture() -> Fixture {
        let accounts = Arc::new(InMemoryAccountRepository::new());
        let client = AccountService::new(accounts.clone())
            .register_client(RegisterClientRequest {
                fullname: "Ann".into(),
                email: "ann@gym.io".into(),
                password: "secret1".into(),
                phone: "0900".into(),
            })
            .await
            .unwrap();
        let service = SessionService::new(accounts.clone(), TokenConfig::new("svc-secret", 7));
        Fixture {
            accounts,
            service,
            client,
        }
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        }
    }

    #[tokio::test]
    async fn test_login_success_records_last_login() {
        let fx = fixture().await;
        let (token, account) = fx
            .service
            .login(Role::Client, login("ANN@gym.io", "secret1"))
            .await
            .unwrap();

        assert!(!token.is_empty());
        assert!(account.last_login.is_some());
        let stored = fx
            .accounts
            .find_by_id(Role::Client, fx.client.id)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn test_unknown_email_and_wrong_password_are_indistinguishable() {
        let fx = fixture().await;

        let unknown = fx
            .service
            .login(Role::Client, login("nobody@gym.io", "secret1"))
            .await
            .unwrap_err();
        let wrong = fx
            .service
            .login(Role::Client, login("ann@gym.io", "wrong-pass"))
            .await
            .unwrap_err();

        assert!(matches!(unknown, AppError::InvalidCredentials));
        assert!(matches!(wrong, AppError::InvalidCredentials));
        assert_eq!(unknown.to_string(), wrong.to_string());
    }

    #[tokio::test]
    async fn test_login_is_scoped_to_role() {
        let fx = fixture().await;
        let result = fx
            .service
            .login(Role::Coach, login("ann@gym.io", "secret1"))
            .await;
        assert!(matches!(result, Err(AppError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn test_missing_fields() {
        let fx = fixture().await;
        let result = fx.service.login(Role::Client, login("", "secret1")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_locked_account_cannot_login_or_authenticate() {
        let fx = fixture().await;
        let (token, _) = fx
            .service
            .login(Role::Client, login("ann@gym.io", "secret1"))
            .await
            .unwrap();

        fx.accounts
            .toggle_lock(Role::Client, fx.client.id)
            .await
            .unwrap();

        let login_result = fx
            .service
            .login(Role::Client, login("ann@gym.io", "secret1"))
            .await;
        assert!(matches!(login_result, Err(AppError::AccountLocked)));

        let auth_result = fx.service.authenticate(Role::Client, &token).await;
        assert!(matches!(auth_result, Err(AppError::AccountLocked)));
    }

    #[tokio::test]
    async fn test_authenticate_checks_role_and_existence() {
        let fx = fixture().await;
        let token = fx.service.issue_token(&fx.client).unwrap();

        let principal = fx.service.authenticate(Role::Client, &token).await.unwrap();
        assert_eq!(principal.id, fx.client.id);
        assert_eq!(principal.role, Role::Client);
        assert!(!principal.is_super_admin());

        let wrong_role = fx.service.authenticate(Role::Admin, &token).await;
        assert!(matches!(wrong_role, Err(AppError::Unauthorized(_))));

        let ghost = TokenConfig::new("svc-secret", 7)
            .create_token(Uuid::new_v4(), Role::Client)
            .unwrap();
        let missing = fx.service.authenticate(Role::Client, &ghost).await;
        assert!(matches!(missing, Err(AppError::Unauthorized(_))));
    }
}
