use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::account::{AccountModel, AdminLevel, Role};

/// JWT claims: the account id and the store it belongs to
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionClaims {
    pub sub: Uuid,
    pub role: Role,
    pub exp: usize, // Expiration timestamp (standard JWT claim)
    pub iat: usize, // Issued at timestamp (standard JWT claim)
}

/// Request payload for the three login endpoints
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// The authenticated account attached to a request by the role gate
#[derive(Debug, Clone)]
pub struct Principal {
    pub id: Uuid,
    pub role: Role,
    pub admin_level: Option<AdminLevel>,
    pub account: AccountModel,
}

impl From<AccountModel> for Principal {
    fn from(account: AccountModel) -> Self {
        Self {
            id: account.id,
            role: account.role(),
            admin_level: account.admin_level(),
            account,
        }
    }
}

impl Principal {
    pub fn is_super_admin(&self) -> bool {
        self.admin_level == Some(AdminLevel::SuperAdmin)
    }
}
