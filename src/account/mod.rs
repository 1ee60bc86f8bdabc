pub mod avatar;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use avatar::AvatarStore;
pub use models::{AccountModel, AccountStatus, AdminLevel, Role};
pub use repository::AccountRepository;
pub use service::AccountService;
