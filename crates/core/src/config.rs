use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::logging::LogFormat;

/// Environment variable overriding the database location
///
/// `:memory:` selects an in-memory store; anything else is a file path.
pub const DB_ENV_VAR: &str = "ROSTER_DB";

/// Sentinel path meaning "do not touch the filesystem"
pub const MEMORY_PATH: &str = ":memory:";

/// Where the record store keeps its data
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Record store settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StoreConfig {
    /// Database file (ignored when `in_memory` is set)
    pub path: PathBuf,
    /// Keep everything in memory; contents vanish on close
    pub in_memory: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("roster.db"), in_memory: false }
    }
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), in_memory: false }
    }

    pub fn memory() -> Self {
        Self { in_memory: true, ..Default::default() }
    }

    pub fn location(&self) -> StoreLocation {
        if self.in_memory || self.path == Path::new(MEMORY_PATH) {
            StoreLocation::Memory
        } else {
            StoreLocation::File(self.path.clone())
        }
    }
}

/// Search defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SearchConfig {
    /// Result cap applied by the CLI when no `--limit` is given
    pub default_limit: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self { default_limit: 10 }
    }
}

/// File logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileLoggingConfig {
    pub enabled: bool,
    pub level: String,
}

impl Default for FileLoggingConfig {
    fn default() -> Self {
        Self { enabled: false, level: "debug".to_string() }
    }
}

/// `[logging]` section as written in roster.toml
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub file: FileLoggingConfig,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), format: "pretty".to_string(), file: FileLoggingConfig::default() }
    }
}

/// Root configuration structure for roster.toml
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub store: StoreConfig,
    pub search: SearchConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str).map_err(|e| crate::Error::Config(ConfigError::from(e).to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Apply `ROSTER_DB` if it is set
    pub fn with_env_overrides(self) -> Self {
        match std::env::var(DB_ENV_VAR) {
            Ok(value) if !value.trim().is_empty() => {
                tracing::debug!("Database location overridden by {}: {}", DB_ENV_VAR, value.trim());
                self.with_db_override(value.trim())
            }
            _ => self,
        }
    }

    /// Point the store at `value`, treating `:memory:` as in-memory
    pub fn with_db_override(mut self, value: &str) -> Self {
        if value == MEMORY_PATH {
            self.store.in_memory = true;
        } else {
            self.store.path = PathBuf::from(value);
            self.store.in_memory = false;
        }
        self
    }

    fn validate(&self) -> Result<()> {
        use crate::Error;

        if !self.store.in_memory && self.store.path.as_os_str().is_empty() {
            return Err(Error::Config(ConfigError::EmptyStorePath.to_string()));
        }

        if self.search.default_limit == 0 {
            return Err(Error::Config(ConfigError::InvalidSearchLimit.to_string()));
        }

        if LogFormat::parse_str(&self.logging.format).is_none() {
            return Err(Error::Config(
                ConfigError::InvalidLogFormat(self.logging.format.clone()).to_string(),
            ));
        }

        Ok(())
    }

    /// Get example configuration (as a string)
    pub fn example() -> &'static str {
        r#"# Roster Configuration Example
# Copy this file to roster.toml and customize as needed

[store]
# Database file; relative paths resolve against the working directory
path = "roster.db"
# Keep records in memory only (nothing is written to disk)
in_memory = false

[search]
# Maximum results printed by `roster search` when --limit is not given
default_limit = 10

[logging]
# Filter directive for stderr output (overridden by ROSTER_LOG / RUST_LOG)
level = "warn"
# "pretty", "json", or "compact"
format = "pretty"

[logging.file]
# Daily-rolling JSON log under ~/.roster/logs (or ROSTER_LOG_DIR)
enabled = false
# Filter directive for the file log, independent of the stderr level
level = "debug"
"#
    }
}

/// Configuration-specific errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("store path must not be empty unless in_memory is set")]
    EmptyStorePath,

    #[error("search.default_limit must be greater than zero")]
    InvalidSearchLimit,

    #[error("invalid log format: {0}")]
    InvalidLogFormat(String),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlParse(String),
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::TomlParse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.store.path, PathBuf::from("roster.db"));
        assert!(!config.store.in_memory);
        assert_eq!(config.search.default_limit, 10);
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.logging.format, "pretty");
        assert!(!config.logging.file.enabled);
    }

    #[test]
    fn test_config_example_parses() {
        let config = Config::from_toml_str(Config::example()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_from_toml_str() {
        let toml = r#"
[store]
path = "/var/lib/roster/users.db"

[search]
default_limit = 25

[logging]
level = "debug"
format = "json"

[logging.file]
enabled = true
"#;

        let config = Config::from_toml_str(toml).unwrap();
        assert_eq!(config.store.location(), StoreLocation::File(PathBuf::from("/var/lib/roster/users.db")));
        assert_eq!(config.search.default_limit, 25);
        assert_eq!(config.logging.format, "json");
        assert!(config.logging.file.enabled);
        assert_eq!(config.logging.file.level, "debug");
    }

    #[test]
    fn test_config_empty_is_default() {
        let config = Config::from_toml_str("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_config_rejects_unknown_fields() {
        let result = Config::from_toml_str("[store]\nurl = \"mongodb://localhost\"\n");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("TOML parse error"));
    }

    #[test]
    fn test_config_validation_empty_path() {
        let result = Config::from_toml_str("[store]\npath = \"\"\n");
        assert!(result.unwrap_err().to_string().contains("store path"));

        let config = Config::from_toml_str("[store]\npath = \"\"\nin_memory = true\n").unwrap();
        assert_eq!(config.store.location(), StoreLocation::Memory);
    }

    #[test]
    fn test_config_validation_zero_limit() {
        let result = Config::from_toml_str("[search]\ndefault_limit = 0\n");
        assert!(result.unwrap_err().to_string().contains("default_limit"));
    }

    #[test]
    fn test_config_validation_bad_log_format() {
        let result = Config::from_toml_str("[logging]\nformat = \"xml\"\n");
        assert!(result.unwrap_err().to_string().contains("invalid log format: xml"));
    }

    #[test]
    fn test_store_location() {
        assert_eq!(StoreConfig::memory().location(), StoreLocation::Memory);
        assert_eq!(StoreConfig::file(MEMORY_PATH).location(), StoreLocation::Memory);
        assert_eq!(
            StoreConfig::file("data/roster.db").location(),
            StoreLocation::File(PathBuf::from("data/roster.db"))
        );
    }

    #[test]
    fn test_db_override() {
        let config = Config::default().with_db_override(":memory:");
        assert!(config.store.in_memory);

        let config = config.with_db_override("other.db");
        assert!(!config.store.in_memory);
        assert_eq!(config.store.path, PathBuf::from("other.db"));
    }

    #[test]
    fn test_from_file() {
        let temp = tempfile::TempDir::new().unwrap();
        let path = temp.path().join("roster.toml");
        std::fs::write(&path, "[search]\ndefault_limit = 3\n").unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.search.default_limit, 3);

        let missing = Config::from_file(&temp.path().join("missing.toml"));
        assert!(matches!(missing, Err(crate::Error::Io(_))));
    }
}
