// Library crate for the gym management API
// This file exposes the public API for integration tests

pub mod account;
pub mod catalog;
pub mod coaching;
pub mod config;
pub mod order;
pub mod post;
pub mod review;
pub mod room;
pub mod routes;
pub mod search;
pub mod seed;
pub mod session;
pub mod shared;

// Re-export commonly used types for easier access in tests
pub use account::{AccountModel, AccountRepository, AvatarStore, Role};
pub use config::AppConfig;
pub use routes::app;
pub use session::TokenConfig;
pub use shared::{AppError, AppState, AppStateBuilder};
