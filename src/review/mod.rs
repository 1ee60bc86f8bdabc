pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use models::{ReviewModel, ReviewStatus};
pub use repository::ReviewRepository;
pub use service::ReviewService;
