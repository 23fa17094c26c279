//! Metrics collection for the resource-management components
//!
//! Lock-free counters using atomic operations. Each component owns one
//! counter block and hands out `Serialize` snapshots for export.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

#[inline]
fn bump(counter: &AtomicU64) {
    counter.fetch_add(1, Ordering::Relaxed);
}

#[inline]
fn read(counter: &AtomicU64) -> u64 {
    counter.load(Ordering::Relaxed)
}

/// Counters updated by `BoundedCache`
#[derive(Debug, Default)]
pub struct CacheCounters {
    hits: AtomicU64,
    misses: AtomicU64,
    inserts: AtomicU64,
    updates: AtomicU64,
    evictions: AtomicU64,
}

/// Cache counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub inserts: u64,
    pub updates: u64,
    pub evictions: u64,
}

impl CacheCounters {
    #[inline]
    pub fn record_hit(&self) {
        bump(&self.hits);
    }

    #[inline]
    pub fn record_miss(&self) {
        bump(&self.misses);
    }

    #[inline]
    pub fn record_insert(&self) {
        bump(&self.inserts);
    }

    #[inline]
    pub fn record_update(&self) {
        bump(&self.updates);
    }

    #[inline]
    pub fn record_eviction(&self) {
        bump(&self.evictions);
    }

    pub fn snapshot(&self) -> CacheStats {
        CacheStats {
            hits: read(&self.hits),
            misses: read(&self.misses),
            inserts: read(&self.inserts),
            updates: read(&self.updates),
            evictions: read(&self.evictions),
        }
    }
}

impl CacheStats {
    /// Hit ratio in [0, 1]; 0 when nothing was looked up yet
    pub fn hit_ratio(&self) -> f64 {
        let lookups = self.hits + self.misses;
        if lookups == 0 {
            0.0
        } else {
            self.hits as f64 / lookups as f64
        }
    }
}

/// Counters updated by `ResourcePool`
#[derive(Debug, Default)]
pub struct PoolCounters {
    created: AtomicU64,
    create_failures: AtomicU64,
    acquired: AtomicU64,
    handoffs: AtomicU64,
    waits: AtomicU64,
    timeouts: AtomicU64,
    closed: AtomicU64,
}

/// Pool counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PoolStats {
    /// Resources successfully built by the factory
    pub created: u64,
    /// Factory calls that failed
    pub create_failures: u64,
    /// Successful acquisitions (any path)
    pub acquired: u64,
    /// Releases handed straight to a waiter
    pub handoffs: u64,
    /// Acquisitions that had to queue
    pub waits: u64,
    /// Acquisitions abandoned by `acquire_timeout`
    pub timeouts: u64,
    /// Resources passed to the factory's `close`
    pub closed: u64,
}

impl PoolCounters {
    #[inline]
    pub fn record_created(&self) {
        bump(&self.created);
    }

    #[inline]
    pub fn record_create_failure(&self) {
        bump(&self.create_failures);
    }

    #[inline]
    pub fn record_acquired(&self) {
        bump(&self.acquired);
    }

    #[inline]
    pub fn record_handoff(&self) {
        bump(&self.handoffs);
    }

    #[inline]
    pub fn record_wait(&self) {
        bump(&self.waits);
    }

    #[inline]
    pub fn record_timeout(&self) {
        bump(&self.timeouts);
    }

    #[inline]
    pub fn record_closed(&self) {
        bump(&self.closed);
    }

    pub fn snapshot(&self) -> PoolStats {
        PoolStats {
            created: read(&self.created),
            create_failures: read(&self.create_failures),
            acquired: read(&self.acquired),
            handoffs: read(&self.handoffs),
            waits: read(&self.waits),
            timeouts: read(&self.timeouts),
            closed: read(&self.closed),
        }
    }
}

/// Counters updated by `WindowRateLimiter`
#[derive(Debug, Default)]
pub struct LimiterCounters {
    admitted: AtomicU64,
    rejected: AtomicU64,
}

/// Rate limiter counters snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LimiterStats {
    pub admitted: u64,
    pub rejected: u64,
}

impl LimiterCounters {
    #[inline]
    pub fn record_admitted(&self) {
        bump(&self.admitted);
    }

    #[inline]
    pub fn record_rejected(&self) {
        bump(&self.rejected);
    }

    pub fn snapshot(&self) -> LimiterStats {
        LimiterStats {
            admitted: read(&self.admitted),
            rejected: read(&self.rejected),
        }
    }
}

/// Combined snapshot for export
#[derive(Debug, Clone, Serialize)]
pub struct MetricsReport {
    pub uptime_seconds: u64,
    pub cache: CacheStats,
    pub pool: PoolStats,
    pub rate_limit: LimiterStats,
}

impl MetricsReport {
    pub fn new(
        started: Instant,
        cache: CacheStats,
        pool: PoolStats,
        rate_limit: LimiterStats,
    ) -> Self {
        Self {
            uptime_seconds: started.elapsed().as_secs(),
            cache,
            pool,
            rate_limit,
        }
    }

    /// Render as pretty JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
