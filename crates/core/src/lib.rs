pub mod config;
pub mod error;

pub use config::{AnkiConnectConfig, Config, ServerConfig};
pub use error::ConfigError;
