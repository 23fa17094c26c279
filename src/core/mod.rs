//! Core resource-management components
//!
//! Three independent building blocks for bounded shared state:
//! - BoundedCache / LruTable: fixed-capacity cache with LRU eviction
//! - ResourcePool: bounded pool with fair asynchronous acquisition
//! - WindowRateLimiter: per-identity sliding-window admission control

pub mod cache;
pub mod clock;
pub mod pool;
pub mod rate_limit;

pub use cache::{BoundedCache, LruTable};
pub use clock::{Clock, ManualClock, SystemClock};
pub use pool::{BoxError, FnFactory, PoolError, PoolStatus, ResourceFactory, ResourcePool};
pub use rate_limit::WindowRateLimiter;
