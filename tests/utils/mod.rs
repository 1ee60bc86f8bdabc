pub mod mocks;
pub mod requests;
pub mod setup;

// Re-export main utilities for use by test files
#[allow(unused_imports)]
pub use mocks::CountingAccountRepository;
#[allow(unused_imports)]
pub use requests::{send, TestResponse};
#[allow(unused_imports)]
pub use setup::TestApp;
