use tracing::{info, instrument};

use crate::account::{models::AdminLevel, AccountService, Role};
use crate::config::AdminSeed;
use crate::shared::{AppError, AppState};

/// Creates the configured super admin unless an admin with that email exists.
/// Returns whether an account was created.
#[instrument(skip_all, fields(email = %seed.email))]
pub async fn ensure_super_admin(state: &AppState, seed: &AdminSeed) -> Result<bool, AppError> {
    if state
        .account_repository
        .find_by_email(Role::Admin, &seed.email)
        .await?
        .is_some()
    {
        info!("Super admin already present");
        return Ok(false);
    }

    AccountService::new(state.account_repository.clone())
        .create_admin(
            &seed.fullname,
            &seed.email,
            &seed.password,
            AdminLevel::SuperAdmin,
        )
        .await?;
    info!("Bootstrapped super admin");
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::avatar::AvatarStore;
    use crate::session::TokenConfig;

    #[tokio::test]
    async fn test_seed_runs_once() {
        let state = AppState::in_memory(TokenConfig::new("secret", 7), AvatarStore::new("public"));
        let seed = AdminSeed {
            email: "Root@Gym.io".to_string(),
            password: "changeme".to_string(),
            fullname: "Root".to_string(),
        };

        assert!(ensure_super_admin(&state, &seed).await.unwrap());
        assert!(!ensure_super_admin(&state, &seed).await.unwrap());

        let admin = state
            .account_repository
            .find_by_email(Role::Admin, "root@gym.io")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(admin.admin_level(), Some(AdminLevel::SuperAdmin));
    }
}
