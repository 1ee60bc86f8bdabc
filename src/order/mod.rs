pub mod handlers;
pub mod models;
pub mod repository;
pub mod service;
pub mod types;

pub use models::{OrderModel, OrderStatus, PaymentStatus};
pub use repository::OrderRepository;
pub use service::OrderService;
