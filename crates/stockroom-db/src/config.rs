//! # Stockroom Configuration
//!
//! File/environment configuration that produces a [`DbConfig`] and the
//! logging filter.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     STOCKROOM_DB_PATH=/var/lib/stockroom/stockroom.db                  │
//! │     STOCKROOM_OPERATION_TIMEOUT_MS=2000                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ~/.config/stockroom/stockroom.toml (Linux)                         │
//! │     ~/Library/Application Support/com.stockroom.stockroom/... (macOS)  │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! # stockroom.toml
//! [database]
//! path = "stockroom.db"
//! max_connections = 5
//!
//! [ledger]
//! operation_timeout_ms = 5000
//! max_write_retries = 5
//! initial_backoff_ms = 10
//! max_backoff_ms = 500
//!
//! [logging]
//! filter = "info,stockroom=debug,sqlx=warn"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::{DbError, DbResult};
use crate::pool::DbConfig;

/// Default `EnvFilter` directive when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info,stockroom=debug,sqlx=warn";

// =============================================================================
// Sections
// =============================================================================

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,

    #[serde(default = "default_true")]
    pub run_migrations: bool,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("stockroom.db")
}
fn default_max_connections() -> u32 {
    5
}
fn default_min_connections() -> u32 {
    1
}
fn default_connect_timeout() -> u64 {
    30
}
fn default_idle_timeout() -> u64 {
    600
}
fn default_true() -> bool {
    true
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: default_db_path(),
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
            run_migrations: true,
        }
    }
}

/// `[ledger]` section: timeouts and retry bounds for storage operations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSettings {
    #[serde(default = "default_operation_timeout")]
    pub operation_timeout_ms: u64,

    #[serde(default = "default_max_write_retries")]
    pub max_write_retries: u32,

    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_ms: u64,

    #[serde(default = "default_max_backoff")]
    pub max_backoff_ms: u64,
}

fn default_operation_timeout() -> u64 {
    5_000
}
fn default_max_write_retries() -> u32 {
    5
}
fn default_initial_backoff() -> u64 {
    10
}
fn default_max_backoff() -> u64 {
    500
}

impl Default for LedgerSettings {
    fn default() -> Self {
        LedgerSettings {
            operation_timeout_ms: default_operation_timeout(),
            max_write_retries: default_max_write_retries(),
            initial_backoff_ms: default_initial_backoff(),
            max_backoff_ms: default_max_backoff(),
        }
    }
}

/// `[logging]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            filter: default_log_filter(),
        }
    }
}

impl LoggingSettings {
    /// Initializes the tracing subscriber for structured logging.
    ///
    /// `RUST_LOG` wins over the configured filter. Calling this twice is
    /// harmless; the second call is ignored.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.filter));

        let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete stockroom configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StockroomConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub ledger: LedgerSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl StockroomConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (`stockroom.toml`)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> DbResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading stockroom config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = Self::from_toml(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Parses a TOML document; missing sections take their defaults.
    pub fn from_toml(contents: &str) -> DbResult<Self> {
        Ok(toml::from_str(contents)?)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> DbResult<()> {
        if self.database.path.as_os_str().is_empty() {
            return Err(DbError::InvalidConfig("database.path must not be empty".into()));
        }

        if self.database.max_connections == 0 {
            return Err(DbError::InvalidConfig(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        if self.database.min_connections > self.database.max_connections {
            return Err(DbError::InvalidConfig(
                "database.min_connections cannot exceed max_connections".into(),
            ));
        }

        if self.ledger.operation_timeout_ms == 0 {
            return Err(DbError::InvalidConfig(
                "ledger.operation_timeout_ms must be greater than 0".into(),
            ));
        }

        if self.ledger.initial_backoff_ms > self.ledger.max_backoff_ms {
            return Err(DbError::InvalidConfig(
                "ledger.initial_backoff_ms cannot exceed max_backoff_ms".into(),
            ));
        }

        Ok(())
    }

    /// Builds the pool configuration.
    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(self.database.path.clone())
            .max_connections(self.database.max_connections)
            .min_connections(self.database.min_connections)
            .connect_timeout(Duration::from_secs(self.database.connect_timeout_secs))
            .idle_timeout(Duration::from_secs(self.database.idle_timeout_secs))
            .run_migrations(self.database.run_migrations)
            .operation_timeout(Duration::from_millis(self.ledger.operation_timeout_ms))
            .max_write_retries(self.ledger.max_write_retries)
            .backoff(
                Duration::from_millis(self.ledger.initial_backoff_ms),
                Duration::from_millis(self.ledger.max_backoff_ms),
            )
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        if let Ok(path) = std::env::var("STOCKROOM_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = PathBuf::from(path);
        }

        if let Ok(max) = std::env::var("STOCKROOM_MAX_CONNECTIONS") {
            match max.parse::<u32>() {
                Ok(m) => self.database.max_connections = m,
                Err(_) => warn!(value = %max, "Ignoring invalid STOCKROOM_MAX_CONNECTIONS"),
            }
        }

        if let Ok(ms) = std::env::var("STOCKROOM_OPERATION_TIMEOUT_MS") {
            match ms.parse::<u64>() {
                Ok(v) => self.ledger.operation_timeout_ms = v,
                Err(_) => warn!(value = %ms, "Ignoring invalid STOCKROOM_OPERATION_TIMEOUT_MS"),
            }
        }

        if let Ok(retries) = std::env::var("STOCKROOM_MAX_WRITE_RETRIES") {
            match retries.parse::<u32>() {
                Ok(v) => self.ledger.max_write_retries = v,
                Err(_) => warn!(value = %retries, "Ignoring invalid STOCKROOM_MAX_WRITE_RETRIES"),
            }
        }

        if let Ok(filter) = std::env::var("STOCKROOM_LOG") {
            self.logging.filter = filter;
        }
    }

    /// Returns the default config file path.
    fn default_config_path() -> Option<PathBuf> {
        directories::ProjectDirs::from("com", "stockroom", "stockroom")
            .map(|dirs| dirs.config_dir().join("stockroom.toml"))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
