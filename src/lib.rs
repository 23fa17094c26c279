//! In-process resource management
//!
//! Bounded cache, bounded async resource pool and sliding-window rate
//! limiter, each an explicitly constructed instance safe to share between
//! tasks and threads.

pub mod core;
pub mod infrastructure;

// Re-export commonly used types
pub use crate::core::{BoundedCache, PoolError, ResourcePool, WindowRateLimiter};
pub use infrastructure::config::{Config, ConfigError};

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Pool error: {0}")]
    Pool(#[from] PoolError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;
