//! Time-window buffer of request timestamps
//!
//! Stores millisecond timestamps (oldest first) and evicts entries that fall
//! out of the window. One buffer backs each identity in the rate limiter.

use std::collections::VecDeque;
use std::time::Duration;

/// Timestamps within a sliding window
///
/// Timestamps must be pushed in non-decreasing order, which makes eviction a
/// prefix trim.
#[derive(Debug, Clone)]
pub struct TimeWindowBuffer {
    /// Window length in milliseconds
    window_ms: u64,
    /// Recorded timestamps (oldest first)
    entries: VecDeque<u64>,
}

impl TimeWindowBuffer {
    /// Create new buffer with specified window
    pub fn new(window: Duration) -> Self {
        Self {
            window_ms: window.as_millis() as u64,
            entries: VecDeque::new(),
        }
    }

    /// Record a timestamp
    #[inline]
    pub fn push(&mut self, now: u64) {
        self.entries.push_back(now);
    }

    /// Evict timestamps older than `now - window`; returns how many went
    pub fn evict_old(&mut self, now: u64) -> usize {
        let cutoff = now.saturating_sub(self.window_ms);
        let before = self.entries.len();

        while let Some(&front) = self.entries.front() {
            if front < cutoff {
                self.entries.pop_front();
            } else {
                break;
            }
        }

        before - self.entries.len()
    }

    /// Oldest timestamp still held
    #[inline]
    pub fn oldest(&self) -> Option<u64> {
        self.entries.front().copied()
    }

    /// Time at which the oldest entry stops counting
    pub fn oldest_expiry(&self) -> Option<u64> {
        // An entry stays while `ts >= now - window`, so it is gone at ts + window + 1
        self.oldest().map(|ts| ts + self.window_ms + 1)
    }

    /// Get current entry count
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if buffer is empty
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Clear all entries
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
