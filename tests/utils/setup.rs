use axum::Router;
use chrono::Utc;
use uuid::Uuid;

use gymhub::{
    account::models::{AccountProfile, AccountStatus, AdminLevel, HealthInfo, DEFAULT_AVATAR},
    app,
    catalog::models::{CatalogStatus, PackageModel},
    session::password::hash_password,
    AccountModel, AppState, AvatarStore, TokenConfig,
};

pub const TEST_SECRET: &str = "integration-test-secret";
pub const TEST_PASSWORD: &str = "secret123";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub fn token_config() -> TokenConfig {
    TokenConfig::new(TEST_SECRET, 7)
}

pub fn avatar_store() -> AvatarStore {
    AvatarStore::new(std::env::temp_dir().join("gymhub-test-public"))
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_state(AppState::in_memory(token_config(), avatar_store()))
    }

    pub fn with_state(state: AppState) -> Self {
        Self {
            router: app(state.clone()),
            state,
        }
    }

    /// Stores an account and returns it with a valid token for its role
    pub async fn account(&self, fullname: &str, email: &str, profile: AccountProfile) -> (AccountModel, String) {
        let mut account = AccountModel::new(
            fullname.to_string(),
            email,
            hash_password(TEST_PASSWORD).unwrap(),
            profile,
        );
        account.status = AccountStatus::Active;
        self.state
            .account_repository
            .create_account(&account)
            .await
            .unwrap();
        let token = self
            .state
            .token_config
            .create_token(account.id, account.role())
            .unwrap();
        (account, token)
    }

    pub async fn client(&self, fullname: &str, email: &str) -> (AccountModel, String) {
        self.account(
            fullname,
            email,
            AccountProfile::Client {
                phone: Some("0900000000".to_string()),
                avatar_url: DEFAULT_AVATAR.to_string(),
                health_info: HealthInfo::default(),
            },
        )
        .await
    }

    pub async fn admin(&self, email: &str, admin_level: AdminLevel) -> (AccountModel, String) {
        self.account("Admin", email, AccountProfile::Admin { admin_level })
            .await
    }

    pub async fn super_admin(&self) -> (AccountModel, String) {
        self.admin("root@gym.io", AdminLevel::SuperAdmin).await
    }

    pub async fn coach(&self, fullname: &str, email: &str) -> (AccountModel, String) {
        self.account(
            fullname,
            email,
            AccountProfile::Coach {
                phone: None,
                avatar_url: DEFAULT_AVATAR.to_string(),
                specialty: Some("Strength".to_string()),
                experience: 4,
                bio: None,
            },
        )
        .await
    }

    /// Stores an active package directly, bypassing the admin endpoints
    pub async fn package(&self, name: &str, price: i64) -> PackageModel {
        let now = Utc::now();
        let package = PackageModel {
            id: Uuid::new_v4(),
            package_name: name.to_string(),
            description: format!("{name} membership"),
            price,
            duration_in_days: 30,
            features: vec!["Locker".to_string()],
            category_id: Uuid::new_v4(),
            status: CatalogStatus::Active,
            display_order: 0,
            created_at: now,
            updated_at: now,
        };
        self.state
            .catalog_repository
            .create_package(&package)
            .await
            .unwrap();
        package
    }
}
