use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{types::Json, FromRow, PgPool, Postgres, QueryBuilder};
use std::collections::HashMap;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::models::{
    normalize_email, AccountModel, AccountProfile, AccountSortKey, AccountStatus, Role,
};
use crate::shared::{db_error, like_pattern, AppError, ListParams, Page};

/// Result of the lock/open toggle
#[derive(Debug, Clone)]
pub enum LockOpenResult {
    /// Status flipped between active and inactive, returns the updated account
    Changed(AccountModel),
    /// Account is banned and stays banned
    Banned,
    /// No account with that id for the role
    NotFound,
}

/// Trait for account repository operations. Every lookup is scoped to one role.
#[async_trait]
pub trait AccountRepository {
    /// Inserts a new account; a duplicate email within the role is a `Conflict`
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError>;
    async fn find_by_email(&self, role: Role, email: &str)
        -> Result<Option<AccountModel>, AppError>;
    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<AccountModel>, AppError>;
    /// Bulk lookup across roles, used to populate references
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AccountModel>, AppError>;
    /// Ids of accounts of a role whose fullname or email contains `term`
    async fn search_ids(&self, role: Role, term: &str) -> Result<Vec<Uuid>, AppError>;
    /// Active coaches whose fullname, specialty or bio contains the search term
    async fn search_coaches(&self, params: &ListParams) -> Result<Page<AccountModel>, AppError>;
    async fn list_accounts(
        &self,
        role: Role,
        status: Option<AccountStatus>,
        params: &ListParams,
    ) -> Result<Page<AccountModel>, AppError>;
    /// Persists fullname and profile edits. Status is only changed by the guards below.
    async fn update_account(&self, account: &AccountModel) -> Result<(), AppError>;
    async fn record_login(&self, role: Role, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Atomically flips active <-> inactive unless the account is banned
    async fn toggle_lock(&self, role: Role, id: Uuid) -> Result<LockOpenResult, AppError>;

    /// Atomically sets the status to banned; `None` if the account does not exist
    async fn ban(&self, role: Role, id: Uuid) -> Result<Option<AccountModel>, AppError>;
}

fn sort_accounts(accounts: &mut [AccountModel], params: &ListParams) {
    let key: AccountSortKey = params.sort_key();
    accounts.sort_by(|a, b| {
        let ordering = match key {
            AccountSortKey::CreatedAt => a.created_at.cmp(&b.created_at),
            AccountSortKey::Fullname => a.fullname.cmp(&b.fullname),
            AccountSortKey::Email => a.email.cmp(&b.email),
        };
        params.sort_order.apply(ordering)
    });
}

/// In-memory implementation of AccountRepository for development and testing
pub struct InMemoryAccountRepository {
    accounts: RwLock<HashMap<Uuid, AccountModel>>,
}

impl Default for InMemoryAccountRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryAccountRepository {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl AccountRepository for InMemoryAccountRepository {
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().await;
        let role = account.role();
        if accounts
            .values()
            .any(|existing| existing.role() == role && existing.email == account.email)
        {
            warn!(email = %account.email, %role, "Email already registered in memory");
            return Err(AppError::Conflict("Email is already registered".to_string()));
        }
        accounts.insert(account.id, account.clone());

        debug!(%role, "Account created in memory");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<AccountModel>, AppError> {
        let email = normalize_email(email);
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|account| account.role() == role && account.email == email)
            .cloned())
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<AccountModel>, AppError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(&id)
            .filter(|account| account.role() == role)
            .cloned())
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AccountModel>, AppError> {
        let accounts = self.accounts.read().await;
        Ok(ids.iter().filter_map(|id| accounts.get(id).cloned()).collect())
    }

    #[instrument(skip(self))]
    async fn search_ids(&self, role: Role, term: &str) -> Result<Vec<Uuid>, AppError> {
        let params = ListParams::default().with_search(term);
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .filter(|account| {
                account.role() == role && params.matches(&[account.fullname.as_str(), account.email.as_str()])
            })
            .map(|account| account.id)
            .collect())
    }

    #[instrument(skip(self, params))]
    async fn search_coaches(&self, params: &ListParams) -> Result<Page<AccountModel>, AppError> {
        let accounts = self.accounts.read().await;
        let mut matching: Vec<AccountModel> = accounts
            .values()
            .filter(|account| account.is_active())
            .filter(|account| match &account.profile {
                AccountProfile::Coach { specialty, bio, .. } => params.matches(&[
                    account.fullname.as_str(),
                    specialty.as_deref().unwrap_or_default(),
                    bio.as_deref().unwrap_or_default(),
                ]),
                _ => false,
            })
            .cloned()
            .collect();
        sort_accounts(&mut matching, params);
        Ok(params.paginate(matching))
    }

    #[instrument(skip(self, params))]
    async fn list_accounts(
        &self,
        role: Role,
        status: Option<AccountStatus>,
        params: &ListParams,
    ) -> Result<Page<AccountModel>, AppError> {
        let accounts = self.accounts.read().await;
        let mut matching: Vec<AccountModel> = accounts
            .values()
            .filter(|account| account.role() == role)
            .filter(|account| status.map_or(true, |status| account.status == status))
            .filter(|account| params.matches(&[account.fullname.as_str(), account.email.as_str()]))
            .cloned()
            .collect();
        sort_accounts(&mut matching, params);

        debug!(total = matching.len(), "Accounts listed from memory");
        Ok(params.paginate(matching))
    }

    #[instrument(skip(self, account), fields(account_id = %account.id))]
    async fn update_account(&self, account: &AccountModel) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().await;
        let stored = accounts
            .get_mut(&account.id)
            .filter(|stored| stored.role() == account.role())
            .ok_or_else(|| AppError::NotFound("Account not found".to_string()))?;

        stored.fullname = account.fullname.clone();
        stored.profile = account.profile.clone();
        stored.updated_at = Utc::now();
        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_login(&self, role: Role, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let mut accounts = self.accounts.write().await;
        if let Some(account) = accounts.get_mut(&id).filter(|a| a.role() == role) {
            account.last_login = Some(at);
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn toggle_lock(&self, role: Role, id: Uuid) -> Result<LockOpenResult, AppError> {
        let mut accounts = self.accounts.write().await;
        let account = match accounts.get_mut(&id).filter(|a| a.role() == role) {
            Some(account) => account,
            None => return Ok(LockOpenResult::NotFound),
        };

        match account.status.lock_or_open() {
            Some(next) => {
                account.status = next;
                account.updated_at = Utc::now();
                info!(account_id = %id, status = %next, "Account status toggled");
                Ok(LockOpenResult::Changed(account.clone()))
            }
            None => Ok(LockOpenResult::Banned),
        }
    }

    #[instrument(skip(self))]
    async fn ban(&self, role: Role, id: Uuid) -> Result<Option<AccountModel>, AppError> {
        let mut accounts = self.accounts.write().await;
        Ok(accounts
            .get_mut(&id)
            .filter(|a| a.role() == role)
            .map(|account| {
                account.status = AccountStatus::Banned;
                account.updated_at = Utc::now();
                account.clone()
            }))
    }
}

const ACCOUNT_COLUMNS: &str =
    "id, fullname, email, password_hash, status, last_login, profile, created_at, updated_at";

#[derive(FromRow)]
struct AccountRow {
    id: Uuid,
    fullname: String,
    email: String,
    password_hash: String,
    status: AccountStatus,
    last_login: Option<DateTime<Utc>>,
    profile: Json<AccountProfile>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<AccountRow> for AccountModel {
    fn from(row: AccountRow) -> Self {
        Self {
            id: row.id,
            fullname: row.fullname,
            email: row.email,
            password_hash: row.password_hash,
            status: row.status,
            last_login: row.last_login,
            profile: row.profile.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

fn push_account_filters(
    builder: &mut QueryBuilder<'_, Postgres>,
    role: Role,
    status: Option<AccountStatus>,
    pattern: Option<String>,
) {
    builder.push(" WHERE role = ").push_bind(role);
    if let Some(status) = status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(pattern) = pattern {
        builder
            .push(" AND (fullname ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR email ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// PostgreSQL implementation of AccountRepository
pub struct PostgresAccountRepository {
    pool: PgPool,
}

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    #[instrument(skip(self, account), fields(account_id = %account.id))]
    async fn create_account(&self, account: &AccountModel) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO accounts (id, role, fullname, email, password_hash, status, last_login, profile, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(account.id)
        .bind(account.role())
        .bind(&account.fullname)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.status)
        .bind(account.last_login)
        .bind(Json(&account.profile))
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, "Email is already registered"))?;

        debug!("Account created in database");
        Ok(())
    }

    #[instrument(skip(self))]
    async fn find_by_email(
        &self,
        role: Role,
        email: &str,
    ) -> Result<Option<AccountModel>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = $1 AND email = $2"
        ))
        .bind(role)
        .bind(normalize_email(email))
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Account lookup failed"))?;

        Ok(row.map(AccountModel::from))
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, role: Role, id: Uuid) -> Result<Option<AccountModel>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE role = $1 AND id = $2"
        ))
        .bind(role)
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Account lookup failed"))?;

        Ok(row.map(AccountModel::from))
    }

    #[instrument(skip(self, ids), fields(count = ids.len()))]
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<AccountModel>, AppError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = ANY($1)"
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Account lookup failed"))?;

        Ok(rows.into_iter().map(AccountModel::from).collect())
    }

    #[instrument(skip(self))]
    async fn search_ids(&self, role: Role, term: &str) -> Result<Vec<Uuid>, AppError> {
        let pattern = like_pattern(term);
        sqlx::query_scalar::<_, Uuid>(
            "SELECT id FROM accounts WHERE role = $1 AND (fullname ILIKE $2 OR email ILIKE $2)",
        )
        .bind(role)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Account search failed"))
    }

    #[instrument(skip(self, params))]
    async fn search_coaches(&self, params: &ListParams) -> Result<Page<AccountModel>, AppError> {
        let pattern = params.search_pattern().unwrap_or_else(|| "%".to_string());
        let filter = " WHERE role = $1 AND status = $2 AND (fullname ILIKE $3 \
                      OR profile->>'specialty' ILIKE $3 OR profile->>'bio' ILIKE $3)";

        let total = sqlx::query_scalar::<_, i64>(&format!("SELECT COUNT(*) FROM accounts{filter}"))
            .bind(Role::Coach)
            .bind(AccountStatus::Active)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, "Coach count failed"))?;

        let key: AccountSortKey = params.sort_key();
        let rows = sqlx::query_as::<_, AccountRow>(&format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts{filter} ORDER BY {} {} LIMIT $4 OFFSET $5",
            key.column(),
            params.sort_order.as_sql()
        ))
        .bind(Role::Coach)
        .bind(AccountStatus::Active)
        .bind(&pattern)
        .bind(params.limit)
        .bind(params.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error(e, "Coach search failed"))?;

        Ok(Page {
            items: rows.into_iter().map(AccountModel::from).collect(),
            total,
        })
    }

    #[instrument(skip(self, params))]
    async fn list_accounts(
        &self,
        role: Role,
        status: Option<AccountStatus>,
        params: &ListParams,
    ) -> Result<Page<AccountModel>, AppError> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM accounts");
        push_account_filters(&mut count, role, status, params.search_pattern());
        let total: i64 = count
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error(e, "Account count failed"))?;

        let key: AccountSortKey = params.sort_key();
        let mut query =
            QueryBuilder::<Postgres>::new(format!("SELECT {ACCOUNT_COLUMNS} FROM accounts"));
        push_account_filters(&mut query, role, status, params.search_pattern());
        query
            .push(format!(
                " ORDER BY {} {}",
                key.column(),
                params.sort_order.as_sql()
            ))
            .push(" LIMIT ")
            .push_bind(params.limit)
            .push(" OFFSET ")
            .push_bind(params.offset());

        let rows = query
            .build_query_as::<AccountRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error(e, "Account listing failed"))?;

        Ok(Page {
            items: rows.into_iter().map(AccountModel::from).collect(),
            total,
        })
    }

    #[instrument(skip(self, account), fields(account_id = %account.id))]
    async fn update_account(&self, account: &AccountModel) -> Result<(), AppError> {
        let result = sqlx::query(
            "UPDATE accounts SET fullname = $1, profile = $2, updated_at = NOW() WHERE id = $3 AND role = $4",
        )
        .bind(&account.fullname)
        .bind(Json(&account.profile))
        .bind(account.id)
        .bind(account.role())
        .execute(&self.pool)
        .await
        .map_err(|e| db_error(e, "Account update failed"))?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Account not found".to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_login(&self, role: Role, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        sqlx::query("UPDATE accounts SET last_login = $1 WHERE id = $2 AND role = $3")
            .bind(at)
            .bind(id)
            .bind(role)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error(e, "Login bookkeeping failed"))?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn toggle_lock(&self, role: Role, id: Uuid) -> Result<LockOpenResult, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts \
             SET status = CASE WHEN status = $3 THEN $4 ELSE $3 END, updated_at = NOW() \
             WHERE id = $1 AND role = $2 AND status <> $5 \
             RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .bind(AccountStatus::Active)
        .bind(AccountStatus::Inactive)
        .bind(AccountStatus::Banned)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Account status update failed"))?;

        if let Some(row) = row {
            let account = AccountModel::from(row);
            info!(account_id = %id, status = %account.status, "Account status toggled");
            return Ok(LockOpenResult::Changed(account));
        }

        // Nothing updated: either missing or banned
        let exists = self.find_by_id(role, id).await?.is_some();
        Ok(if exists {
            LockOpenResult::Banned
        } else {
            LockOpenResult::NotFound
        })
    }

    #[instrument(skip(self))]
    async fn ban(&self, role: Role, id: Uuid) -> Result<Option<AccountModel>, AppError> {
        let row = sqlx::query_as::<_, AccountRow>(&format!(
            "UPDATE accounts SET status = $3, updated_at = NOW() \
             WHERE id = $1 AND role = $2 RETURNING {ACCOUNT_COLUMNS}"
        ))
        .bind(id)
        .bind(role)
        .bind(AccountStatus::Banned)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error(e, "Account ban failed"))?;

        Ok(row.map(AccountModel::from))
    }
}
