//! # Tavola Configuration
//!
//! Runtime settings for the engine, the notification worker and the server.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     TAVOLA_DATABASE_PATH=/var/lib/tavola/tavola.db                     │
//! │     TAVOLA_NOTIFY_MAX_RETRIES=5                                        │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/tavola-pos/tavola.toml (Linux)                           │
//! │     ~/Library/Application Support/com.tavola.pos/tavola.toml (macOS)   │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # tavola.toml
//! [database]
//! path = "./tavola.db"
//! max_connections = 5
//! busy_timeout_ms = 5000
//!
//! [notifications]
//! enabled = true
//! max_retries = 10
//! retry_delay_secs = 10
//! poll_interval_secs = 1
//! batch_size = 50
//!
//! [tables]
//! qr_base_url = "https://order.example.com"
//!
//! [logging]
//! level = "info"
//! ```
//!
//! The loaded value is passed to constructors. Nothing in the engine reads
//! the environment on its own.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tavola_db::DbConfig;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::notify::RetryPolicy;

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// How long a writer waits for the lock before giving up with a conflict.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./tavola.db")
}

fn default_max_connections() -> u32 {
    5
}

fn default_busy_timeout_ms() -> u64 {
    5000
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_database_path(),
            max_connections: default_max_connections(),
            busy_timeout_ms: default_busy_timeout_ms(),
        }
    }
}

/// `[notifications]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationSettings {
    /// When false, tasks are dropped instead of queued.
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Delay before a failed task is attempted again.
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    10
}

fn default_retry_delay() -> u64 {
    10
}

fn default_poll_interval() -> u64 {
    1
}

fn default_batch_size() -> u32 {
    50
}

impl Default for NotificationSettings {
    fn default() -> Self {
        NotificationSettings {
            enabled: true,
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            poll_interval_secs: default_poll_interval(),
            batch_size: default_batch_size(),
        }
    }
}

impl NotificationSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            retry_delay: Duration::from_secs(self.retry_delay_secs),
        }
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

/// `[tables]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSettings {
    /// Prefix of the text encoded in each table's QR code.
    #[serde(default = "default_qr_base_url")]
    pub qr_base_url: String,
}

fn default_qr_base_url() -> String {
    "http://localhost:8080".to_string()
}

impl Default for TableSettings {
    fn default() -> Self {
        TableSettings {
            qr_base_url: default_qr_base_url(),
        }
    }
}

/// `[logging]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter directive. `RUST_LOG` wins when set.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: default_log_level(),
        }
    }
}

fn parse_override<T: std::str::FromStr>(entry: Option<(String, String)>) -> Option<T> {
    let (key, raw) = entry?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(key = %key, value = %raw, "Ignoring unparseable override");
            None
        }
    }
}

// =============================================================================
// Tavola Configuration
// =============================================================================

/// Complete configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TavolaConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub notifications: NotificationSettings,

    #[serde(default)]
    pub tables: TableSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl TavolaConfig {
    /// Loads configuration from all sources.
    ///
    /// `path` overrides the platform config location. A missing file is not
    /// an error; defaults apply.
    pub fn load(path: Option<PathBuf>) -> ConfigResult<Self> {
        let path = path.or_else(Self::default_config_path);

        let mut config = match path {
            Some(ref p) if p.exists() => {
                info!(path = %p.display(), "Loading config file");
                Self::from_file(p)?
            }
            Some(ref p) => {
                debug!(path = %p.display(), "Config file not found, using defaults");
                TavolaConfig::default()
            }
            None => TavolaConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML file. No env overrides, no validation.
    pub fn from_file(path: &Path) -> ConfigResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Writes the configuration as TOML, creating parent directories.
    pub fn save(&self, path: &Path) -> ConfigResult<()> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(path, contents).map_err(io_err)?;

        info!(path = %path.display(), "Saved config file");
        Ok(())
    }

    /// `tavola.toml` inside the platform config directory.
    pub fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "tavola", "pos")
            .map(|dirs| dirs.config_dir().join("tavola.toml"))
    }

    /// Applies `TAVOLA_*` variables from the process environment.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable values are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let parsed = |key: &str| lookup(key).map(|raw| (key.to_string(), raw));

        if let Some(path) = lookup("TAVOLA_DATABASE_PATH") {
            self.database.path = PathBuf::from(path);
        }
        if let Some(v) = parse_override(parsed("TAVOLA_DB_MAX_CONNECTIONS")) {
            self.database.max_connections = v;
        }
        if let Some(v) = parse_override(parsed("TAVOLA_BUSY_TIMEOUT_MS")) {
            self.database.busy_timeout_ms = v;
        }
        if let Some(v) = parse_override(parsed("TAVOLA_NOTIFICATIONS_ENABLED")) {
            self.notifications.enabled = v;
        }
        if let Some(v) = parse_override(parsed("TAVOLA_NOTIFY_MAX_RETRIES")) {
            self.notifications.max_retries = v;
        }
        if let Some(v) = parse_override(parsed("TAVOLA_NOTIFY_RETRY_DELAY_SECS")) {
            self.notifications.retry_delay_secs = v;
        }
        if let Some(url) = lookup("TAVOLA_QR_BASE_URL") {
            self.tables.qr_base_url = url;
        }
        if let Some(level) = lookup("TAVOLA_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(ConfigError::Invalid("database.path cannot be empty".into()));
        }
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be at least 1".into(),
            ));
        }
        if self.notifications.max_retries == 0 {
            return Err(ConfigError::Invalid(
                "notifications.max_retries must be at least 1".into(),
            ));
        }
        if self.notifications.poll_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "notifications.poll_interval_secs must be at least 1".into(),
            ));
        }
        if self.notifications.batch_size == 0 {
            return Err(ConfigError::Invalid(
                "notifications.batch_size must be at least 1".into(),
            ));
        }
        if self.tables.qr_base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("tables.qr_base_url cannot be empty".into()));
        }
        Ok(())
    }

    /// Pool settings derived from `[database]`.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.database.path)
            .max_connections(self.database.max_connections)
            .busy_timeout(Duration::from_millis(self.database.busy_timeout_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_are_valid() {
        let config = TavolaConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.notifications.max_retries, 10);
        assert_eq!(config.notifications.retry_policy().retry_delay, Duration::from_secs(10));
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: TavolaConfig = toml::from_str(
            r#"
            [tables]
            qr_base_url = "https://order.example.com"

            [notifications]
            max_retries = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.tables.qr_base_url, "https://order.example.com");
        assert_eq!(config.notifications.max_retries, 3);
        assert_eq!(config.notifications.batch_size, 50);
        assert_eq!(config.database, DatabaseSettings::default());
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = TavolaConfig::default();
        let env: HashMap<&str, &str> = [
            ("TAVOLA_DATABASE_PATH", "/tmp/t.db"),
            ("TAVOLA_NOTIFY_MAX_RETRIES", "4"),
            ("TAVOLA_NOTIFICATIONS_ENABLED", "false"),
            ("TAVOLA_DB_MAX_CONNECTIONS", "lots"),
        ]
        .into_iter()
        .collect();

        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.database.path, PathBuf::from("/tmp/t.db"));
        assert_eq!(config.notifications.max_retries, 4);
        assert!(!config.notifications.enabled);
        // unparseable value ignored
        assert_eq!(config.database.max_connections, 5);
    }

    #[test]
    fn test_validate_rejects_zeroes() {
        let mut config = TavolaConfig::default();
        config.database.max_connections = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = TavolaConfig::default();
        config.tables.qr_base_url = "  ".into();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("tavola.toml");

        let mut config = TavolaConfig::default();
        config.tables.qr_base_url = "https://qr.example.com".into();
        config.save(&path).unwrap();

        let loaded = TavolaConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_from_file_requires_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = TavolaConfig::from_file(&dir.path().join("absent.toml"));
        assert!(matches!(config, Err(ConfigError::Io { .. })));
    }
}
