// Public API - what other modules can use
pub use models::{RoomModel, RoomStatus};
pub use repository::RoomRepository;
pub use service::RoomService;

pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;
