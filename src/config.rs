//! Configuration management
//!
//! Loads configuration from:
//! 1. Default values
//! 2. Configuration file (config/local.toml)
//! 3. Environment variables (override)

use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub fanout: FanoutConfig,
    pub cache: CacheConfig,
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub host: String,
    /// Port number (e.g., 8080)
    pub port: u16,
}

/// Database configuration (SQLite only)
#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    /// Path to SQLite database file
    pub path: PathBuf,
}

/// Fanout pipeline configuration
///
/// Controls the poller and the worker pool that distribute new posts
/// into follower timelines.
#[derive(Debug, Clone, Deserialize)]
pub struct FanoutConfig {
    /// Poll interval for pending jobs in milliseconds (default: 1000)
    pub poll_interval_ms: u64,
    /// Followers per cache/store write, and pending jobs fetched per poll
    /// (default: 200)
    pub batch_size: usize,
    /// Number of concurrent fanout workers (default: 8)
    pub concurrency: usize,
    /// Processing attempts before a job is marked failed (default: 5)
    pub max_attempts: i64,
}

impl FanoutConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Cache configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Maximum post ids kept per user timeline (default: 2000)
    pub timeline_max_items: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    pub level: String,
    /// Log format: "pretty" or "json"
    pub format: String,
}

impl AppConfig {
    /// Load configuration from file and environment
    ///
    /// # Loading Order
    /// 1. Default values
    /// 2. config/default.toml (if exists)
    /// 3. config/local.toml (if exists)
    /// 4. Environment variables (DRIFTLINE_*)
    ///
    /// # Errors
    /// Returns error if configuration is invalid
    pub fn load() -> Result<Self, crate::error::AppError> {
        use config::{Config, Environment, File};

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("database.path", "data/driftline.db")?
            .set_default("fanout.poll_interval_ms", 1000)?
            .set_default("fanout.batch_size", 200)?
            .set_default("fanout.concurrency", 8)?
            .set_default("fanout.max_attempts", 5)?
            .set_default("cache.timeline_max_items", 2000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            // Load from config/default.toml if it exists
            .add_source(File::with_name("config/default").required(false))
            // Load from config/local.toml if it exists (overrides default)
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables (DRIFTLINE_*)
            .add_source(
                Environment::with_prefix("DRIFTLINE")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;

        let app_config: Self = config
            .try_deserialize()
            .map_err(|e| crate::error::AppError::Config(e.to_string()))?;
        app_config.validate()?;
        Ok(app_config)
    }

    fn validate(&self) -> Result<(), crate::error::AppError> {
        if self.fanout.poll_interval_ms == 0 {
            return Err(crate::error::AppError::Config(
                "fanout.poll_interval_ms must be greater than 0".to_string(),
            ));
        }

        if self.fanout.batch_size == 0 {
            return Err(crate::error::AppError::Config(
                "fanout.batch_size must be greater than 0".to_string(),
            ));
        }

        if self.fanout.concurrency == 0 {
            return Err(crate::error::AppError::Config(
                "fanout.concurrency must be greater than 0".to_string(),
            ));
        }

        if self.fanout.max_attempts <= 0 {
            return Err(crate::error::AppError::Config(
                "fanout.max_attempts must be greater than 0".to_string(),
            ));
        }

        if self.cache.timeline_max_items == 0 {
            return Err(crate::error::AppError::Config(
                "cache.timeline_max_items must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                path: PathBuf::from("/tmp/driftline-test.db"),
            },
            fanout: FanoutConfig {
                poll_interval_ms: 1000,
                batch_size: 200,
                concurrency: 8,
                max_attempts: 5,
            },
            cache: CacheConfig {
                timeline_max_items: 2000,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "pretty".to_string(),
            },
        }
    }

    #[test]
    fn validate_accepts_defaults() {
        let config = valid_config();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn validate_rejects_zero_batch_size() {
        let mut config = valid_config();
        config.fanout.batch_size = 0;

        let error = config
            .validate()
            .expect_err("batch size of zero must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("fanout.batch_size")
        ));
    }

    #[test]
    fn validate_rejects_zero_concurrency() {
        let mut config = valid_config();
        config.fanout.concurrency = 0;

        let error = config
            .validate()
            .expect_err("concurrency of zero must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("fanout.concurrency")
        ));
    }

    #[test]
    fn validate_rejects_zero_poll_interval() {
        let mut config = valid_config();
        config.fanout.poll_interval_ms = 0;

        let error = config
            .validate()
            .expect_err("poll interval of zero must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("fanout.poll_interval_ms")
        ));
    }

    #[test]
    fn validate_rejects_non_positive_max_attempts() {
        let mut config = valid_config();
        config.fanout.max_attempts = 0;

        let error = config
            .validate()
            .expect_err("max attempts of zero must fail");
        assert!(matches!(
            error,
            crate::error::AppError::Config(message)
                if message.contains("fanout.max_attempts")
        ));
    }
}
