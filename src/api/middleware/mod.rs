pub mod auth;
pub mod logging;

pub use auth::{api_key_auth, Owner};
pub use logging::request_logger;
