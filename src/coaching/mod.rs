pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use models::{ScheduleModel, StudentModel, StudentStatus};
pub use repository::CoachingRepository;
pub use service::CoachingService;
