pub mod constants;
mod errors;
mod timeout;

pub use errors::ConfigError;
pub use timeout::{MAX_NAVIGATION_TIMEOUT_MS, validate_navigation_timeout};
