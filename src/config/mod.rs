//! Layered TOML configuration.

pub mod loader;

pub use loader::{Config, ConfigError, MailConfig, NotifyConfig, SecretsConfig, WeatherConfig};
