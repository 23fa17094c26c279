//! Configuration management
//!
//! Loads configuration from a TOML file at startup.
//! Every section falls back to defaults when absent.

use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "RESOURCE_CORE_CONFIG";

/// Default config file name
pub const DEFAULT_CONFIG_PATH: &str = "resource-core.toml";

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub pool: PoolConfig,

    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bounded cache settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum number of entries
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

/// Resource pool settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoolConfig {
    /// Maximum resources alive at once (idle + checked out)
    #[serde(default = "default_max_resources")]
    pub max_resources: usize,

    /// Upper bound on waiting for a resource, 0 = wait indefinitely
    #[serde(default = "default_acquire_timeout_ms")]
    pub acquire_timeout_ms: u64,
}

/// Rate limiter settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    /// Sliding window length in milliseconds
    #[serde(default = "default_window_millis")]
    pub window_millis: u64,

    /// Requests admitted per identity within one window; 0 rejects everything
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
}

/// Logging settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for rolling log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: default_cache_capacity(),
        }
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_resources: default_max_resources(),
            acquire_timeout_ms: default_acquire_timeout_ms(),
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_millis: default_window_millis(),
            max_requests: default_max_requests(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_dir: None,
        }
    }
}

fn default_cache_capacity() -> usize {
    1024
}

fn default_max_resources() -> usize {
    8
}

fn default_acquire_timeout_ms() -> u64 {
    5_000
}

fn default_window_millis() -> u64 {
    1_000
}

fn default_max_requests() -> usize {
    100
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from the file named by `RESOURCE_CORE_CONFIG`,
    /// falling back to `resource-core.toml`
    ///
    /// A missing file yields the defaults.
    /// # Errors
    /// Returns error if the file exists but cannot be read, parsed or validated.
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path.as_ref()) {
            Ok(contents) => Self::from_toml(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // File not found - use defaults
                Ok(Config::default())
            }
            Err(e) => Err(ConfigError::IoError(e)),
        }
    }

    /// Parse and validate TOML text
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: Config =
            toml::from_str(contents).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the components cannot be built with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.capacity == 0 {
            return Err(ConfigError::Invalid("cache.capacity must be positive"));
        }
        if self.pool.max_resources == 0 {
            return Err(ConfigError::Invalid("pool.max_resources must be positive"));
        }
        if self.rate_limit.window_millis == 0 {
            return Err(ConfigError::Invalid("rate_limit.window_millis must be positive"));
        }
        Ok(())
    }

    #[inline]
    pub fn cache_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.cache.capacity)
            .ok_or(ConfigError::Invalid("cache.capacity must be positive"))
    }

    #[inline]
    pub fn max_resources(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.pool.max_resources)
            .ok_or(ConfigError::Invalid("pool.max_resources must be positive"))
    }

    /// `None` when acquisition should wait indefinitely
    pub fn acquire_timeout(&self) -> Option<Duration> {
        match self.pool.acquire_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms)),
        }
    }

    #[inline]
    pub fn rate_window(&self) -> Duration {
        Duration::from_millis(self.rate_limit.window_millis)
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    /// IO error reading file
    IoError(std::io::Error),
    /// Parse error (invalid TOML)
    ParseError(String),
    /// Well-formed but unusable value
    Invalid(&'static str),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "Failed to read config file: {}", e),
            ConfigError::ParseError(e) => write!(f, "Failed to parse config: {}", e),
            ConfigError::Invalid(reason) => write!(f, "Invalid config: {}", reason),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::IoError(e) => Some(e),
            ConfigError::ParseError(_) | ConfigError::Invalid(_) => None,
        }
    }
}
