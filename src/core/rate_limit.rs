//! Sliding-window rate limiter
//!
//! Each identity (e.g. a caller IP) owns a `TimeWindowBuffer` of admitted
//! request timestamps. A request is admitted while fewer than `max_requests`
//! timestamps remain inside the trailing window. Rejected attempts are not
//! recorded.
//!
//! Identity state is created lazily and only dropped by an explicit
//! [`WindowRateLimiter::purge_stale`] call.

use crate::core::clock::{Clock, SystemClock};
use crate::infrastructure::metrics::{LimiterCounters, LimiterStats};
use crate::infrastructure::TimeWindowBuffer;
use crate::log_limiter;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;
use tracing::Level;

/// Per-identity sliding-window admission control
///
/// # Example
/// ```
/// use resource_core::core::{ManualClock, WindowRateLimiter};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(0);
/// let limiter = WindowRateLimiter::with_clock(Duration::from_secs(1), 2, clock.clone());
///
/// assert!(limiter.allow("10.0.0.1"));
/// assert!(limiter.allow("10.0.0.1"));
/// assert!(!limiter.allow("10.0.0.1"));
/// assert!(limiter.allow("10.0.0.2"));
/// ```
pub struct WindowRateLimiter<C = SystemClock> {
    window: Duration,
    max_requests: usize,
    clock: C,
    windows: Mutex<HashMap<String, TimeWindowBuffer>>,
    counters: LimiterCounters,
}

impl WindowRateLimiter<SystemClock> {
    /// Limiter over the monotonic system clock
    pub fn new(window: Duration, max_requests: usize) -> Self {
        Self::with_clock(window, max_requests, SystemClock::new())
    }
}

impl<C: Clock> WindowRateLimiter<C> {
    pub fn with_clock(window: Duration, max_requests: usize, clock: C) -> Self {
        Self {
            window,
            max_requests,
            clock,
            windows: Mutex::new(HashMap::new()),
            counters: LimiterCounters::default(),
        }
    }

    /// Admit or reject one request from `identity`
    ///
    /// Admission records the current time; rejection records nothing.
    pub fn allow(&self, identity: &str) -> bool {
        let now = self.clock.now_millis();
        let mut windows = self.windows.lock();
        // Only a first-seen identity pays for an owned key
        let admitted = match windows.get_mut(identity) {
            Some(window) => self.admit(window, now),
            None => {
                let window = windows
                    .entry(identity.to_owned())
                    .or_insert_with(|| TimeWindowBuffer::new(self.window));
                self.admit(window, now)
            }
        };
        drop(windows);

        if admitted {
            self.counters.record_admitted();
        } else {
            self.counters.record_rejected();
            log_limiter!(Level::DEBUG, identity, "request rejected");
        }
        admitted
    }

    fn admit(&self, window: &mut TimeWindowBuffer, now: u64) -> bool {
        window.evict_old(now);
        if window.len() >= self.max_requests {
            return false;
        }
        window.push(now);
        true
    }

    /// Admissions still available to `identity` in the current window
    pub fn remaining(&self, identity: &str) -> usize {
        let now = self.clock.now_millis();
        let mut windows = self.windows.lock();
        match windows.get_mut(identity) {
            Some(window) => {
                window.evict_old(now);
                self.max_requests.saturating_sub(window.len())
            }
            None => self.max_requests,
        }
    }

    /// How long until `identity` would be admitted again
    ///
    /// `None` means the next request would be admitted now. With
    /// `max_requests == 0` nothing is ever admitted and the full window is
    /// reported.
    pub fn retry_after(&self, identity: &str) -> Option<Duration> {
        if self.max_requests == 0 {
            return Some(self.window);
        }

        let now = self.clock.now_millis();
        let mut windows = self.windows.lock();
        let window = windows.get_mut(identity)?;
        window.evict_old(now);
        if window.len() < self.max_requests {
            return None;
        }

        window
            .oldest_expiry()
            .map(|at| Duration::from_millis(at.saturating_sub(now)))
    }

    /// Drop identities with no timestamps left in the window
    ///
    /// Returns the number of identities removed.
    pub fn purge_stale(&self) -> usize {
        let now = self.clock.now_millis();
        let mut windows = self.windows.lock();
        let before = windows.len();
        windows.retain(|_, window| {
            window.evict_old(now);
            !window.is_empty()
        });
        let purged = before - windows.len();
        drop(windows);

        if purged > 0 {
            log_limiter!(Level::DEBUG, purged, "purged idle identities");
        }
        purged
    }

    /// Identities currently holding state
    pub fn tracked_identities(&self) -> usize {
        self.windows.lock().len()
    }

    #[inline]
    pub fn window(&self) -> Duration {
        self.window
    }

    #[inline]
    pub fn max_requests(&self) -> usize {
        self.max_requests
    }

    pub fn stats(&self) -> LimiterStats {
        self.counters.snapshot()
    }
}

impl<C> fmt::Debug for WindowRateLimiter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WindowRateLimiter")
            .field("window", &self.window)
            .field("max_requests", &self.max_requests)
            .field("identities", &self.windows.lock().len())
            .finish()
    }
}
