use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::{
    avatar::{AvatarStore, AvatarUpload},
    models::{
        AccountModel, AccountProfile, AccountResponse, AccountStatus, AdminLevel, HealthInfo, Role,
        DEFAULT_AVATAR,
    },
    repository::{AccountRepository, LockOpenResult},
    types::{
        validate_email, validate_password, CreateCoachRequest, RegisterClientRequest,
        UpdateProfileRequest,
    },
};
use crate::session::password::hash_password;
use crate::shared::{require, AppError, ListParams, Page};

/// Service for account business logic shared by the three roles
pub struct AccountService {
    repository: Arc<dyn AccountRepository + Send + Sync>,
}

impl AccountService {
    pub fn new(repository: Arc<dyn AccountRepository + Send + Sync>) -> Self {
        Self { repository }
    }

    fn not_found(role: Role) -> AppError {
        AppError::NotFound(format!("{} not found", role.label()))
    }

    /// Registers an active client account
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn register_client(
        &self,
        request: RegisterClientRequest,
    ) -> Result<AccountModel, AppError> {
        require(&request.fullname, "fullname")?;
        require(&request.email, "email")?;
        require(&request.password, "password")?;
        require(&request.phone, "phone")?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        let account = AccountModel::new(
            request.fullname.trim().to_string(),
            &request.email,
            hash_password(&request.password)?,
            AccountProfile::Client {
                phone: Some(request.phone.trim().to_string()),
                avatar_url: DEFAULT_AVATAR.to_string(),
                health_info: HealthInfo::default(),
            },
        );
        self.repository.create_account(&account).await?;

        info!(account_id = %account.id, "Client registered");
        Ok(account)
    }

    /// Creates a coach account; it stays inactive until an admin opens it
    #[instrument(skip(self, request), fields(email = %request.email))]
    pub async fn create_coach(&self, request: CreateCoachRequest) -> Result<AccountModel, AppError> {
        require(&request.fullname, "fullname")?;
        require(&request.email, "email")?;
        require(&request.password, "password")?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;

        let experience = request.experience.unwrap_or(0);
        if experience < 0 {
            return Err(AppError::Validation(
                "experience must not be negative".to_string(),
            ));
        }

        let account = AccountModel::new(
            request.fullname.trim().to_string(),
            &request.email,
            hash_password(&request.password)?,
            AccountProfile::Coach {
                phone: request.phone,
                avatar_url: DEFAULT_AVATAR.to_string(),
                specialty: request.specialty,
                experience,
                bio: request.bio,
            },
        );
        self.repository.create_account(&account).await?;

        info!(account_id = %account.id, "Coach created");
        Ok(account)
    }

    /// Creates an admin account, used to bootstrap the first super admin
    #[instrument(skip(self, password))]
    pub async fn create_admin(
        &self,
        fullname: &str,
        email: &str,
        password: &str,
        admin_level: AdminLevel,
    ) -> Result<AccountModel, AppError> {
        validate_email(email)?;
        validate_password(password)?;

        let account = AccountModel::new(
            fullname.trim().to_string(),
            email,
            hash_password(password)?,
            AccountProfile::Admin { admin_level },
        );
        self.repository.create_account(&account).await?;

        info!(account_id = %account.id, %admin_level, "Admin created");
        Ok(account)
    }

    #[instrument(skip(self))]
    pub async fn get_account(&self, role: Role, id: Uuid) -> Result<AccountModel, AppError> {
        self.repository
            .find_by_id(role, id)
            .await?
            .ok_or_else(|| Self::not_found(role))
    }

    #[instrument(skip(self, params))]
    pub async fn list_accounts(
        &self,
        role: Role,
        params: &ListParams,
    ) -> Result<Page<AccountResponse>, AppError> {
        let status = params.status_filter::<AccountStatus>()?;
        let page = self.repository.list_accounts(role, status, params).await?;

        debug!(%role, total = page.total, "Accounts listed");
        Ok(page.map(AccountResponse::from))
    }

    /// Coaches a client may book: active only, searched by fullname, specialty or bio
    #[instrument(skip(self, params))]
    pub async fn active_coaches(&self, params: &ListParams) -> Result<Page<AccountResponse>, AppError> {
        let page = self.repository.search_coaches(params).await?;
        Ok(page.map(AccountResponse::from))
    }

    /// Toggles active/inactive; a banned account is refused with `Forbidden`
    #[instrument(skip(self))]
    pub async fn lock_or_open(&self, role: Role, id: Uuid) -> Result<AccountModel, AppError> {
        match self.repository.toggle_lock(role, id).await? {
            LockOpenResult::Changed(account) => {
                info!(account_id = %id, status = %account.status, "Account lock state changed");
                Ok(account)
            }
            LockOpenResult::Banned => {
                warn!(account_id = %id, "Refused to toggle a banned account");
                Err(AppError::Forbidden(format!(
                    "{} is banned and cannot be locked or opened",
                    role.label()
                )))
            }
            LockOpenResult::NotFound => Err(Self::not_found(role)),
        }
    }

    /// Bans an account; banning twice is a no-op success
    #[instrument(skip(self))]
    pub async fn ban(&self, role: Role, id: Uuid) -> Result<AccountModel, AppError> {
        let account = self
            .repository
            .ban(role, id)
            .await?
            .ok_or_else(|| Self::not_found(role))?;

        info!(account_id = %id, %role, "Account banned");
        Ok(account)
    }

    #[instrument(skip(self, request))]
    pub async fn update_profile(
        &self,
        id: Uuid,
        request: UpdateProfileRequest,
    ) -> Result<AccountModel, AppError> {
        let mut account = self.get_account(Role::Client, id).await?;

        if let Some(fullname) = request.fullname {
            require(&fullname, "fullname")?;
            account.fullname = fullname.trim().to_string();
        }
        if let AccountProfile::Client {
            phone, health_info, ..
        } = &mut account.profile
        {
            if let Some(new_phone) = request.phone {
                *phone = Some(new_phone.trim().to_string());
            }
            if let Some(new_health_info) = request.health_info {
                *health_info = new_health_info;
            }
        }

        self.repository.update_account(&account).await?;
        info!(account_id = %id, "Profile updated");
        self.get_account(Role::Client, id).await
    }

    /// Stores a new avatar and deletes the previous file once the account points at the new one
    #[instrument(skip(self, store, upload))]
    pub async fn update_avatar(
        &self,
        id: Uuid,
        store: &AvatarStore,
        upload: AvatarUpload,
    ) -> Result<AccountModel, AppError> {
        let mut account = self.get_account(Role::Client, id).await?;
        let stored = store.save(&upload).await?;

        let previous = account.profile.replace_avatar(stored.clone());
        if let Err(e) = self.repository.update_account(&account).await {
            warn!(error = %e, "Avatar update failed, removing the new file");
            store.remove(&stored).await;
            return Err(e);
        }
        if let Some(previous) = previous {
            store.remove(&previous).await;
        }

        info!(account_id = %id, avatar = %stored, "Avatar updated");
        self.get_account(Role::Client, id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::repository::InMemoryAccountRepository;

    fn service() -> AccountService {
        AccountService::new(Arc::new(InMemoryAccountRepository::new()))
    }

    fn registration(email: &str) -> RegisterClientRequest {
        RegisterClientRequest {
            fullname: "Ann Lee".to_string(),
            email: email.to_string(),
            password: "secret1".to_string(),
            phone: "0900000000".to_string(),
        }
    }

    #[tokio::test]
    async fn test_register_client_defaults() {
        let service = service();
        let account = service.register_client(registration("Ann@Gym.io")).await.unwrap();

        assert_eq!(account.email, "ann@gym.io");
        assert_eq!(account.status, AccountStatus::Active);
        assert_eq!(account.profile.avatar_url(), Some(DEFAULT_AVATAR));
        assert_ne!(account.password_hash, "secret1");
    }

    #[tokio::test]
    async fn test_register_validation_and_conflict() {
        let service = service();

        let mut missing_phone = registration("a@gym.io");
        missing_phone.phone = "  ".to_string();
        assert!(matches!(
            service.register_client(missing_phone).await,
            Err(AppError::Validation(_))
        ));

        let mut short_password = registration("a@gym.io");
        short_password.password = "123".to_string();
        assert!(matches!(
            service.register_client(short_password).await,
            Err(AppError::Validation(_))
        ));

        service.register_client(registration("a@gym.io")).await.unwrap();
        assert!(matches!(
            service.register_client(registration("A@GYM.IO")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_coach_starts_inactive() {
        let service = service();
        let coach = service
            .create_coach(CreateCoachRequest {
                fullname: "Coach Kim".to_string(),
                email: "kim@gym.io".to_string(),
                password: "secret1".to_string(),
                experience: Some(4),
                ..CreateCoachRequest::default()
            })
            .await
            .unwrap();
        assert_eq!(coach.status, AccountStatus::Inactive);
    }

    #[tokio::test]
    async fn test_banned_is_a_sink() {
        let service = service();
        let account = service.register_client(registration("a@gym.io")).await.unwrap();

        service.ban(Role::Client, account.id).await.unwrap();
        let again = service.ban(Role::Client, account.id).await.unwrap();
        assert_eq!(again.status, AccountStatus::Banned);

        let result = service.lock_or_open(Role::Client, account.id).await;
        assert!(matches!(result, Err(AppError::Forbidden(_))));
        let stored = service.get_account(Role::Client, account.id).await.unwrap();
        assert_eq!(stored.status, AccountStatus::Banned);
    }

    #[tokio::test]
    async fn test_lock_or_open_wrong_role_is_not_found() {
        let service = service();
        let account = service.register_client(registration("a@gym.io")).await.unwrap();

        let result = service.lock_or_open(Role::Coach, account.id).await;
        assert!(matches!(result, Err(AppError::NotFound(msg)) if msg == "Coach not found"));
    }

    #[tokio::test]
    async fn test_list_rejects_unknown_status() {
        let service = service();
        let params = ListParams::default().with_status("sleeping");
        assert!(matches!(
            service.list_accounts(Role::Client, &params).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn test_update_profile_partial() {
        let service = service();
        let account = service.register_client(registration("a@gym.io")).await.unwrap();

        let updated = service
            .update_profile(
                account.id,
                UpdateProfileRequest {
                    phone: Some("0911111111".to_string()),
                    ..UpdateProfileRequest::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.fullname, "Ann Lee");
        assert!(matches!(
            updated.profile,
            AccountProfile::Client { phone: Some(ref p), .. } if p == "0911111111"
        ));
    }

    #[tokio::test]
    async fn test_update_avatar_replaces_previous_file() {
        let root = std::env::temp_dir().join(format!("gymhub-svc-{}", Uuid::new_v4()));
        let store = AvatarStore::new(&root);
        let service = service();
        let account = service.register_client(registration("a@gym.io")).await.unwrap();

        let upload = AvatarUpload {
            file_name: "me.png".to_string(),
            content_type: "image/png".to_string(),
            bytes: vec![1, 2, 3],
        };
        let first = service
            .update_avatar(account.id, &store, upload.clone())
            .await
            .unwrap();
        let first_file = first.profile.avatar_url().unwrap().to_string();
        assert!(store.path_for(&first_file).exists());

        let second = service.update_avatar(account.id, &store, upload).await.unwrap();
        let second_file = second.profile.avatar_url().unwrap().to_string();
        assert_ne!(first_file, second_file);
        assert!(!store.path_for(&first_file).exists());
        assert!(store.path_for(&second_file).exists());

        let _ = tokio::fs::remove_dir_all(&root).await;
    }
}
