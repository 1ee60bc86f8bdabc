use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use uuid::Uuid;

pub const DEFAULT_AVATAR: &str = "default-avatar.png";

/// Which credential store an account belongs to
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Role {
    Admin = 0,
    Client = 1,
    Coach = 2,
}

impl Role {
    /// Capitalised name used in response messages
    pub fn label(self) -> &'static str {
        match self {
            Role::Admin => "Admin",
            Role::Client => "Client",
            Role::Coach => "Coach",
        }
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, sqlx::Type,
)]
#[repr(i16)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum AccountStatus {
    Banned = -1,
    Inactive = 0,
    Active = 1,
}

impl AccountStatus {
    /// Lock/open toggle. Banned is a sink: `None` means the toggle is refused.
    pub fn lock_or_open(self) -> Option<AccountStatus> {
        match self {
            AccountStatus::Active => Some(AccountStatus::Inactive),
            AccountStatus::Inactive => Some(AccountStatus::Active),
            AccountStatus::Banned => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AdminLevel {
    SuperAdmin,
    #[default]
    Manager,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthInfo {
    pub height: Option<f64>,
    pub weight: Option<f64>,
    pub target: Option<String>,
}

/// Role-specific part of an account, stored as JSON next to the common columns
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum AccountProfile {
    Admin {
        admin_level: AdminLevel,
    },
    Client {
        phone: Option<String>,
        avatar_url: String,
        health_info: HealthInfo,
    },
    Coach {
        phone: Option<String>,
        avatar_url: String,
        specialty: Option<String>,
        experience: i32,
        bio: Option<String>,
    },
}

impl AccountProfile {
    pub fn role(&self) -> Role {
        match self {
            AccountProfile::Admin { .. } => Role::Admin,
            AccountProfile::Client { .. } => Role::Client,
            AccountProfile::Coach { .. } => Role::Coach,
        }
    }

    /// Replaces the avatar, returning the previous file name; admins have none
    pub fn replace_avatar(&mut self, file_name: String) -> Option<String> {
        match self {
            AccountProfile::Client { avatar_url, .. } | AccountProfile::Coach { avatar_url, .. } => {
                Some(std::mem::replace(avatar_url, file_name))
            }
            AccountProfile::Admin { .. } => None,
        }
    }

    pub fn avatar_url(&self) -> Option<&str> {
        match self {
            AccountProfile::Client { avatar_url, .. } | AccountProfile::Coach { avatar_url, .. } => {
                Some(avatar_url)
            }
            AccountProfile::Admin { .. } => None,
        }
    }
}

/// Database model for the accounts table
#[derive(Debug, Clone, PartialEq)]
pub struct AccountModel {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub password_hash: String,
    pub status: AccountStatus,
    pub last_login: Option<DateTime<Utc>>,
    pub profile: AccountProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountModel {
    /// Creates a new account; clients and admins start active, coaches await activation
    pub fn new(fullname: String, email: &str, password_hash: String, profile: AccountProfile) -> Self {
        let now = Utc::now();
        let status = match profile.role() {
            Role::Coach => AccountStatus::Inactive,
            Role::Admin | Role::Client => AccountStatus::Active,
        };

        Self {
            id: Uuid::new_v4(),
            fullname,
            email: normalize_email(email),
            password_hash,
            status,
            last_login: None,
            profile,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn role(&self) -> Role {
        self.profile.role()
    }

    /// Admin level; `None` for clients and coaches
    pub fn admin_level(&self) -> Option<AdminLevel> {
        match self.profile {
            AccountProfile::Admin { admin_level } => Some(admin_level),
            _ => None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == AccountStatus::Active
    }
}

/// Emails are compared case-insensitively; they are stored lowercase
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Public projection of an account; never carries the password hash
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountResponse {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    pub status: AccountStatus,
    pub last_login: Option<DateTime<Utc>>,
    #[serde(flatten)]
    pub profile: AccountProfile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AccountModel> for AccountResponse {
    fn from(account: AccountModel) -> Self {
        Self {
            id: account.id,
            fullname: account.fullname,
            email: account.email,
            status: account.status,
            last_login: account.last_login,
            profile: account.profile,
            created_at: account.created_at,
            updated_at: account.updated_at,
        }
    }
}

/// Short account view embedded in other resources (order client, student client, post author)
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountSummary {
    pub id: Uuid,
    pub fullname: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&AccountModel> for AccountSummary {
    fn from(account: &AccountModel) -> Self {
        let phone = match &account.profile {
            AccountProfile::Client { phone, .. } | AccountProfile::Coach { phone, .. } => {
                phone.clone()
            }
            AccountProfile::Admin { .. } => None,
        };

        Self {
            id: account.id,
            fullname: account.fullname.clone(),
            email: account.email.clone(),
            phone,
            avatar_url: account.profile.avatar_url().map(String::from),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, EnumString)]
pub enum AccountSortKey {
    #[default]
    #[strum(serialize = "createdAt")]
    CreatedAt,
    #[strum(serialize = "fullname")]
    Fullname,
    #[strum(serialize = "email")]
    Email,
}

impl AccountSortKey {
    pub fn column(self) -> &'static str {
        match self {
            AccountSortKey::CreatedAt => "created_at",
            AccountSortKey::Fullname => "fullname",
            AccountSortKey::Email => "email",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn client_profile() -> AccountProfile {
        AccountProfile::Client {
            phone: Some("0900000000".into()),
            avatar_url: DEFAULT_AVATAR.into(),
            health_info: HealthInfo::default(),
        }
    }

    #[rstest]
    #[case(AccountStatus::Active, Some(AccountStatus::Inactive))]
    #[case(AccountStatus::Inactive, Some(AccountStatus::Active))]
    #[case(AccountStatus::Banned, None)]
    fn test_lock_or_open(#[case] from: AccountStatus, #[case] to: Option<AccountStatus>) {
        assert_eq!(from.lock_or_open(), to);
    }

    #[test]
    fn test_default_status_by_role() {
        let client = AccountModel::new("A".into(), "a@x.io", "h".into(), client_profile());
        assert_eq!(client.status, AccountStatus::Active);

        let coach = AccountModel::new(
            "C".into(),
            "c@x.io",
            "h".into(),
            AccountProfile::Coach {
                phone: None,
                avatar_url: DEFAULT_AVATAR.into(),
                specialty: None,
                experience: 0,
                bio: None,
            },
        );
        assert_eq!(coach.status, AccountStatus::Inactive);
        assert_eq!(coach.role(), Role::Coach);
    }

    #[test]
    fn test_email_is_normalized() {
        let account = AccountModel::new("A".into(), "  Mixed@Case.IO ", "h".into(), client_profile());
        assert_eq!(account.email, "mixed@case.io");
    }

    #[test]
    fn test_response_hides_password_and_flattens_profile() {
        let account = AccountModel::new("A".into(), "a@x.io", "secret-hash".into(), client_profile());
        let json = serde_json::to_value(AccountResponse::from(account)).unwrap();

        assert_eq!(json["role"], "client");
        assert_eq!(json["status"], "active");
        assert_eq!(json["avatarUrl"], DEFAULT_AVATAR);
        assert!(json.get("passwordHash").is_none());
        assert!(!json.to_string().contains("secret-hash"));
    }

    #[test]
    fn test_admin_level_round_trips_through_profile_json() {
        let profile = AccountProfile::Admin {
            admin_level: AdminLevel::SuperAdmin,
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json, serde_json::json!({"role": "admin", "adminLevel": "super_admin"}));

        let parsed: AccountProfile = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, profile);
    }
}
