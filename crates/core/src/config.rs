//! Application configuration.
//!
//! Values are layered: built-in defaults, then `config.toml` in the user's
//! config directory, then `DECKFORGE__*` environment variables
//! (e.g. `DECKFORGE__REMOTE__BASE_URL`).

use std::{
    fs,
    path::{Path, PathBuf},
};

use ::config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::models::Format;

/// Directory name under the platform config/data directories.
pub const APP_DIR: &str = "deckforge";
/// Config file name inside [`APP_DIR`].
pub const CONFIG_FILE: &str = "config.toml";
/// Prefix for environment overrides.
pub const ENV_PREFIX: &str = "DECKFORGE";

const DEFAULT_CONFIG: &str = r#"# Deckforge configuration.

# Where saved decks and logs are kept. Defaults to the platform data directory.
# data_dir = "/home/me/.local/share/deckforge"

# JSON inventory exported from your collection.
# inventory_path = "/home/me/collection.json"

default_format = "standard"

[remote]
# Deck service endpoint. Leave unset to keep decks local only.
# base_url = "https://decks.example.com/api"
# api_token = "..."
timeout_secs = 15
"#;

/// Failures while reading or writing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No usable config directory on this platform.
    #[error("could not resolve a configuration directory")]
    NoConfigDir,
    /// Filesystem failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// Parse or merge failure.
    #[error("invalid configuration: {0}")]
    Invalid(#[from] ::config::ConfigError),
}

/// Remote deck service settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RemoteConfig {
    /// Service base URL; `None` keeps the application offline.
    pub base_url: Option<String>,
    /// Bearer token sent with every request.
    pub api_token: Option<String>,
    /// Per-request timeout.
    pub timeout_secs: u64,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            api_token: None,
            timeout_secs: 15,
        }
    }
}

/// Top-level application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root for saved decks and logs.
    pub data_dir: PathBuf,
    /// Inventory file used when none is given on the command line.
    pub inventory_path: Option<PathBuf>,
    /// Format for new decks.
    pub default_format: Format,
    /// Remote service settings.
    pub remote: RemoteConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            inventory_path: None,
            default_format: Format::default(),
            remote: RemoteConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file and the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let path = config_path().ok_or(ConfigError::NoConfigDir)?;
        Self::load_from(&path)
    }

    /// Load from `path` (if it exists) layered over defaults, then the environment.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        Self::load_layered(path, environment())
    }

    fn load_layered(path: &Path, environment: Environment) -> Result<Self, ConfigError> {
        let defaults = AppConfig::default();
        let config = Config::builder()
            .set_default("data_dir", defaults.data_dir.to_string_lossy().to_string())?
            .set_default("default_format", defaults.default_format.as_str())?
            .set_default("remote.timeout_secs", defaults.remote.timeout_secs as i64)?
            .add_source(File::from(path).format(FileFormat::Toml).required(false))
            .add_source(environment)
            .build()?;
        Ok(config.try_deserialize()?)
    }
}

/// `DECKFORGE__SECTION__KEY` overrides.
fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("__")
        .separator("__")
}

/// Location of the user config file.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}

/// Platform data directory for the application.
pub fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_DIR)
}

/// Write a commented default config file if none exists yet.
pub fn ensure_default_config() -> Result<PathBuf, ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    write_default_config(&path)?;
    Ok(path)
}

fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, DEFAULT_CONFIG)?;
    info!(path = %path.display(), "Default configuration written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use tempfile::tempdir;

    #[test]
    fn default_file_parses() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join("nested").join(CONFIG_FILE);
        write_default_config(&path)?;
        assert!(path.is_file());

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.default_format, Format::Standard);
        assert_eq!(config.remote.timeout_secs, 15);
        assert_eq!(config.remote.base_url, None);
        assert_eq!(config.data_dir, default_data_dir());
        Ok(())
    }

    #[test]
    fn file_values_override_defaults() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
data_dir = "/tmp/decks"
inventory_path = "/tmp/collection.json"
default_format = "modern"

[remote]
base_url = "https://decks.example.com"
timeout_secs = 3
"#,
        )?;

        let config = AppConfig::load_from(&path)?;
        assert_eq!(config.data_dir, PathBuf::from("/tmp/decks"));
        assert_eq!(
            config.inventory_path,
            Some(PathBuf::from("/tmp/collection.json"))
        );
        assert_eq!(config.default_format, Format::Modern);
        assert_eq!(
            config.remote.base_url.as_deref(),
            Some("https://decks.example.com")
        );
        assert_eq!(config.remote.timeout_secs, 3);
        Ok(())
    }

    #[test]
    fn environment_overrides_file_values() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(
            &path,
            r#"
default_format = "modern"

[remote]
base_url = "https://file.example.com"
timeout_secs = 3
"#,
        )?;

        let vars: ::config::Map<String, String> = [
            ("DECKFORGE__REMOTE__BASE_URL", "https://env.example.com"),
            ("DECKFORGE__DEFAULT_FORMAT", "pauper"),
            ("UNRELATED__DEFAULT_FORMAT", "vintage"),
        ]
        .into_iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect();

        let config = AppConfig::load_layered(&path, environment().source(Some(vars)))?;
        assert_eq!(
            config.remote.base_url.as_deref(),
            Some("https://env.example.com")
        );
        assert_eq!(config.default_format, Format::Pauper);
        assert_eq!(config.remote.timeout_secs, 3);
        Ok(())
    }

    #[test]
    fn existing_file_is_left_alone() -> Result<()> {
        let dir = tempdir()?;
        let path = dir.path().join(CONFIG_FILE);
        fs::write(&path, "default_format = \"legacy\"\n")?;
        write_default_config(&path)?;
        assert_eq!(fs::read_to_string(&path)?, "default_format = \"legacy\"\n");
        Ok(())
    }
}
