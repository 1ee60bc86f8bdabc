pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use models::{PostModel, PostStatus};
pub use repository::PostRepository;
pub use service::PostService;
