//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and defaults so a rename only requires changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "raincheck";

/// Crate version from Cargo.toml.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Compilation target triple (set by build.rs).
pub const TARGET: &str = env!("TARGET");

/// Local config filename (e.g. `.raincheck.toml` in the working root).
pub const CONFIG_FILENAME: &str = ".raincheck.toml";

/// Directory name under `~/.config/` for the global config.
pub const CONFIG_DIR: &str = "raincheck";

/// Default credential file path, relative to the working root.
pub const DEFAULT_SECRETS_FILE: &str = "ignore_file/key.txt";

/// Default Ed25519 private key used to sign weather API tokens, relative
/// to the working root. Overridable via the `rain_report.private_key_file`
/// credential entry.
pub const DEFAULT_WEATHER_KEY_FILE: &str = "ignore_file/ed25519-private.pem";

/// Webhook endpoint for the chat robot.
pub const WEBHOOK_URL: &str = "https://oapi.dingtalk.com/robot/send";


// ── Environment variable names ──────────────────────────────────────

pub const ENV_SECRETS_FILE: &str = "RAINCHECK_SECRETS_FILE";
pub const ENV_UTC_OFFSET: &str = "RAINCHECK_UTC_OFFSET";
