use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use gymhub::{
    account::{
        models::AccountStatus,
        repository::{InMemoryAccountRepository, LockOpenResult},
    },
    shared::{ListParams, Page},
    AccountModel, AccountRepository, AppError, Role,
};

// ============================================================================
// Mock Infrastructure
// ============================================================================

/// Account store that counts every call before delegating to memory
#[derive(Default)]
pub struct CountingAccountRepository {
    inner: InMemoryAccountRepository,
    calls: AtomicUsize,
}

impl CountingAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn hit(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl AccountRepository for CountingAccountRepository {
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError> {
        self.hit();
        self.inner.create_account(account).await
    }

    async fn find_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<AccountModel>, AppError> {
        self.hit();
        self.inner.find_by_email(role, email).await
    }

    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<AccountModel>, AppError> {
        self.hit();
        self.inner.find_by_id(role, id).await
    }

    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AccountModel>, AppError> {
        self.hit();
        self.inner.find_by_ids(ids).await
    }

    async fn search_ids(&self, role: Role, term: &str) -> Result<Vec<Uuid>, AppError> {
        self.hit();
        self.inner.search_ids(role, term).await
    }

    async fn search_coaches(&self, params: &ListParams) -> Result<Page<AccountModel>, AppError> {
        self.hit();
        self.inner.search_coaches(params).await
    }

    async fn list_accounts(
        &self,
        role: Role,
        status: Option<AccountStatus>,
        params: &ListParams,
    ) -> Result<Page<AccountModel>, AppError> {
        self.hit();
        self.inner.list_accounts(role, status, params).await
    }

    async fn update_account(&self, account: &AccountModel) -> Result<(), AppError> {
        self.hit();
        self.inner.update_account(account).await
    }

    async fn record_login(&self, role: Role, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        self.hit();
        self.inner.record_login(role, id, at).await
    }

    async fn toggle_lock(&self, role: Role, id: Uuid) -> Result<LockOpenResult, AppError> {
        self.hit();
        self.inner.toggle_lock(role, id).await
    }

    async fn ban(&self, role: Role, id: Uuid) -> Result<Option<AccountModel>, AppError> {
        self.hit();
        self.inner.ban(role, id).await
    }
}
