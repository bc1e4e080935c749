pub mod config;
pub mod constants;
pub mod error;

pub use config::LinkConfig;
pub use error::{ConfigError, Result};

/// Version info
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
