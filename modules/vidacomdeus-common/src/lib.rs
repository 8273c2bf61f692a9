pub mod config;
pub mod error;
pub mod time;
pub mod types;
pub mod validation;

pub use config::Config;
pub use error::ConfigError;
pub use types::*;
