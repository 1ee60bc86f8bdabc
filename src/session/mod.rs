// Public API - what other modules can use
pub use handlers::{check_login, login_admin, login_client, login_coach};
pub use middleware::{require_principal, require_super_admin, RoleGate};
pub use service::SessionService;
pub use token::TokenConfig;
pub use types::{LoginRequest, Principal, SessionClaims};

// Internal modules
mod handlers;
mod middleware;
pub mod password;
pub mod service;
pub mod token;
mod types;
