//! Infrastructure - ambient concerns
//!
//! This module contains code shared by the components and the binary:
//! - Logging and metrics
//! - Configuration management
//! - Timestamp windows backing the rate limiter

pub mod config;
pub mod logging;
pub mod metrics;
pub mod time_window_buffer;

pub use time_window_buffer::TimeWindowBuffer;
