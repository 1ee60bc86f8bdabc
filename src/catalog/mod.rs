pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use models::{CatalogStatus, PackageModel};
pub use repository::CatalogRepository;
pub use service::CatalogService;
