//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.raincheck.toml` in the working root
//! 4. `~/.config/raincheck/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::env::Env;

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub secrets: SecretsConfig,
    pub weather: WeatherConfig,
    pub mail: MailConfig,
    pub notify: NotifyConfig,
}

/// Credential store configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SecretsConfig {
    /// Path to the credential file. Defaults to `ignore_file/key.txt`
    /// relative to the working root when unset.
    pub file: Option<PathBuf>,
}

/// Weather / rain report configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WeatherConfig {
    /// Coordinate list override (`lon,lat` strings). When empty, the
    /// `rain_report.location_list` credential entry supplies them.
    pub locations: Vec<String>,
    /// Substrings of an hourly forecast's text that count as rain.
    pub rain_keywords: Vec<String>,
    /// Local timezone as a whole-hour UTC offset.
    pub utc_offset_hours: i32,
    /// Local hour at which the morning push window opens (inclusive).
    pub morning_push_start: u32,
    /// Local hour at which the morning push window closes (exclusive).
    pub morning_push_end: u32,
    /// Local hour at which the afternoon push window opens (inclusive).
    pub afternoon_push_start: u32,
    /// Local hour at which the afternoon push window closes (exclusive).
    pub afternoon_push_end: u32,
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            locations: Vec::new(),
            rain_keywords: vec!["雨".to_string(), "rain".to_string()],
            utc_offset_hours: 8,
            morning_push_start: 6,
            morning_push_end: 9,
            afternoon_push_start: 12,
            afternoon_push_end: 15,
        }
    }
}

/// Inbox polling configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MailConfig {
    pub folder: String,
    pub criteria: String,
    /// Upper bound on messages fetched per poll, newest first.
    pub max_messages: usize,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            folder: "INBOX".to_string(),
            criteria: "UNSEEN".to_string(),
            max_messages: 10,
        }
    }
}

/// Webhook notification configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// Phone numbers to @-mention by default.
    pub at_mobiles: Vec<String>,
    /// User IDs to @-mention by default.
    pub at_user_ids: Vec<String>,
    /// Whether to @-mention everyone by default.
    pub at_all: bool,
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// Reads from global config, then local config in the working root,
    /// then applies environment variable overrides.
    pub fn load(working_root: Option<&Path>, env: &Env) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: local config
        if let Some(root) = working_root {
            let local_path = root.join(crate::constants::CONFIG_FILENAME);
            if local_path.exists() {
                let local = Self::load_file(&local_path)?;
                config.merge(local);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(crate::constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge another config into this one (other takes precedence for
    /// non-default values).
    fn merge(&mut self, other: Config) {
        if other.secrets.file.is_some() {
            self.secrets.file = other.secrets.file;
        }

        let default_weather = WeatherConfig::default();
        if !other.weather.locations.is_empty() {
            self.weather.locations = other.weather.locations;
        }
        if other.weather.rain_keywords != default_weather.rain_keywords {
            self.weather.rain_keywords = other.weather.rain_keywords;
        }
        if other.weather.utc_offset_hours != default_weather.utc_offset_hours {
            self.weather.utc_offset_hours = other.weather.utc_offset_hours;
        }
        if other.weather.morning_push_start != default_weather.morning_push_start {
            self.weather.morning_push_start = other.weather.morning_push_start;
        }
        if other.weather.morning_push_end != default_weather.morning_push_end {
            self.weather.morning_push_end = other.weather.morning_push_end;
        }
        if other.weather.afternoon_push_start != default_weather.afternoon_push_start {
            self.weather.afternoon_push_start = other.weather.afternoon_push_start;
        }
        if other.weather.afternoon_push_end != default_weather.afternoon_push_end {
            self.weather.afternoon_push_end = other.weather.afternoon_push_end;
        }

        let default_mail = MailConfig::default();
        if other.mail.folder != default_mail.folder {
            self.mail.folder = other.mail.folder;
        }
        if other.mail.criteria != default_mail.criteria {
            self.mail.criteria = other.mail.criteria;
        }
        if other.mail.max_messages != default_mail.max_messages {
            self.mail.max_messages = other.mail.max_messages;
        }

        if !other.notify.at_mobiles.is_empty() {
            self.notify.at_mobiles = other.notify.at_mobiles;
        }
        if !other.notify.at_user_ids.is_empty() {
            self.notify.at_user_ids = other.notify.at_user_ids;
        }
        if other.notify.at_all {
            self.notify.at_all = true;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Ok(val) = env.var(crate::constants::ENV_SECRETS_FILE) {
            self.secrets.file = Some(PathBuf::from(val));
        }
        if let Ok(val) = env.var(crate::constants::ENV_UTC_OFFSET) {
            if let Ok(offset) = val.parse::<i32>() {
                self.weather.utc_offset_hours = offset;
            } else {
                eprintln!(
                    "Warning: ignoring invalid {} value: {val}",
                    crate::constants::ENV_UTC_OFFSET
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert!(config.secrets.file.is_none());
        assert_eq!(config.weather.utc_offset_hours, 8);
        assert_eq!(config.weather.rain_keywords, vec!["雨", "rain"]);
        assert_eq!(config.mail.folder, "INBOX");
        assert_eq!(config.mail.criteria, "UNSEEN");
        assert!(!config.notify.at_all);
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[secrets]
file = "creds/key.txt"

[weather]
locations = ["105.44,28.89"]
utc_offset_hours = 0

[mail]
folder = "Archive"
max_messages = 5

[notify]
at_mobiles = ["13800000000"]
at_all = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.secrets.file, Some(PathBuf::from("creds/key.txt")));
        assert_eq!(config.weather.locations, vec!["105.44,28.89"]);
        assert_eq!(config.weather.utc_offset_hours, 0);
        assert_eq!(config.mail.folder, "Archive");
        assert_eq!(config.mail.max_messages, 5);
        assert_eq!(config.notify.at_mobiles, vec!["13800000000"]);
        assert!(config.notify.at_all);
    }

    #[test]
    fn merge_overrides_non_default_values() {
        let mut base = Config::default();
        let mut other = Config::default();
        other.secrets.file = Some(PathBuf::from("elsewhere.txt"));
        other.weather.utc_offset_hours = 2;
        other.mail.folder = "Work".to_string();
        other.notify.at_all = true;

        base.merge(other);

        assert_eq!(base.secrets.file, Some(PathBuf::from("elsewhere.txt")));
        assert_eq!(base.weather.utc_offset_hours, 2);
        assert_eq!(base.mail.folder, "Work");
        assert!(base.notify.at_all);
    }

    #[test]
    fn merge_keeps_base_when_other_is_default() {
        let mut base = Config::default();
        base.weather.utc_offset_hours = 3;
        base.mail.criteria = "ALL".to_string();

        base.merge(Config::default());

        assert_eq!(base.weather.utc_offset_hours, 3);
        assert_eq!(base.mail.criteria, "ALL");
    }

    #[test]
    fn load_from_working_root() {
        let env = Env::mock(Vec::<(&str, &str)>::new());
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(".raincheck.toml"),
            r#"
[mail]
folder = "Newsletters"
"#,
        )
        .unwrap();

        let config = Config::load(Some(dir.path()), &env).unwrap();
        assert_eq!(config.mail.folder, "Newsletters");
    }

    #[test]
    fn load_without_any_config_files() {
        let env = Env::mock(Vec::<(&str, &str)>::new());
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load(Some(dir.path()), &env).unwrap();
        assert_eq!(config.mail.folder, "INBOX");
    }

    #[test]
    fn load_file_invalid_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "not valid {{ toml").unwrap();

        let result = Config::load_file(&path);
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("parse"));
    }

    #[test]
    fn apply_env_vars_secrets_file_and_offset() {
        let env = Env::mock([
            ("RAINCHECK_SECRETS_FILE", "/tmp/key.txt"),
            ("RAINCHECK_UTC_OFFSET", "1"),
        ]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.secrets.file, Some(PathBuf::from("/tmp/key.txt")));
        assert_eq!(config.weather.utc_offset_hours, 1);
    }

    #[test]
    fn apply_env_vars_invalid_offset_falls_back() {
        let env = Env::mock([("RAINCHECK_UTC_OFFSET", "tomorrow")]);
        let mut config = Config::default();
        config.apply_env_vars(&env);
        assert_eq!(config.weather.utc_offset_hours, 8);
    }
}
