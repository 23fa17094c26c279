//! Bounded LRU cache
//!
//! `LruTable` is the single-owner core: a slab of entries threaded onto an
//! index-linked recency list (most recent at the head). `BoundedCache` wraps
//! it in a lock for shared use and counts hits, misses and evictions.
//!
//! All operations are O(1) amortized and at most one entry is evicted per
//! insertion.

use crate::infrastructure::metrics::{CacheCounters, CacheStats};
use crate::log_cache;
use parking_lot::Mutex;
use std::borrow::Borrow;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use tracing::Level;

/// Null link
const NIL: usize = usize::MAX;

#[derive(Debug, Clone, Copy)]
struct Link {
    prev: usize,
    next: usize,
}

impl Link {
    const DETACHED: Link = Link {
        prev: NIL,
        next: NIL,
    };
}

/// Fixed-capacity key/value table with least-recently-used eviction
///
/// # Example
/// ```
/// use resource_core::core::LruTable;
/// use std::num::NonZeroUsize;
///
/// let mut table = LruTable::new(NonZeroUsize::new(2).unwrap());
/// table.set("a", 1);
/// table.set("b", 2);
/// table.get(&"a");
///
/// // "b" is now the least recently used
/// assert_eq!(table.set("c", 3), Some(("b", 2)));
/// ```
pub struct LruTable<K, V> {
    /// Key -> slab index
    map: HashMap<K, usize>,
    /// Slab of entries; `None` marks a free slot
    entries: Vec<Option<(K, V)>>,
    /// Recency links, parallel to `entries`
    links: Vec<Link>,
    /// Free slab indices
    free: Vec<usize>,
    /// Most recently used
    head: usize,
    /// Least recently used
    tail: usize,
    capacity: NonZeroUsize,
}

impl<K, V> LruTable<K, V>
where
    K: Eq + Hash + Clone,
{
    /// Create an empty table holding at most `capacity` entries
    pub fn new(capacity: NonZeroUsize) -> Self {
        let cap = capacity.get();
        Self {
            map: HashMap::with_capacity(cap),
            entries: Vec::with_capacity(cap),
            links: Vec::with_capacity(cap),
            free: Vec::new(),
            head: NIL,
            tail: NIL,
            capacity,
        }
    }

    /// Look up `key`, marking it most recently used on a hit
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.touch(idx);
        self.entries[idx].as_ref().map(|(_, v)| v)
    }

    /// Look up `key` without changing recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = *self.map.get(key)?;
        self.entries[idx].as_ref().map(|(_, v)| v)
    }

    /// Insert or update `key`
    ///
    /// An existing key has its value replaced. A new key at capacity first
    /// evicts the least recently used entry, which is returned. Either way
    /// `key` ends up most recently used.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(&idx) = self.map.get(&key) {
            if let Some((_, slot)) = self.entries[idx].as_mut() {
                *slot = value;
            }
            self.touch(idx);
            return None;
        }

        let evicted = if self.map.len() >= self.capacity.get() {
            self.pop_lru()
        } else {
            None
        };

        let idx = self.alloc(key.clone(), value);
        self.push_front(idx);
        self.map.insert(key, idx);
        evicted
    }

    /// Remove `key`, returning its value. Absent keys are a no-op.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let idx = self.map.remove(key)?;
        self.unlink(idx);
        self.release_slot(idx).map(|(_, v)| v)
    }

    /// Evict the least recently used entry
    pub fn pop_lru(&mut self) -> Option<(K, V)> {
        let idx = self.tail;
        if idx == NIL {
            return None;
        }
        self.unlink(idx);
        let (key, value) = self.release_slot(idx)?;
        self.map.remove(&key);
        Some((key, value))
    }

    /// Whether `key` is present. Does not touch recency.
    #[inline]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.map.contains_key(key)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> NonZeroUsize {
        self.capacity
    }

    /// Drop every entry
    pub fn clear(&mut self) {
        self.map.clear();
        self.entries.clear();
        self.links.clear();
        self.free.clear();
        self.head = NIL;
        self.tail = NIL;
    }

    /// Iterate from most to least recently used
    pub fn iter(&self) -> RecencyIter<'_, K, V> {
        RecencyIter {
            table: self,
            cursor: self.head,
        }
    }

    fn alloc(&mut self, key: K, value: V) -> usize {
        match self.free.pop() {
            Some(idx) => {
                self.entries[idx] = Some((key, value));
                self.links[idx] = Link::DETACHED;
                idx
            }
            None => {
                self.entries.push(Some((key, value)));
                self.links.push(Link::DETACHED);
                self.entries.len() - 1
            }
        }
    }

    fn release_slot(&mut self, idx: usize) -> Option<(K, V)> {
        let entry = self.entries[idx].take()?;
        self.free.push(idx);
        Some(entry)
    }

    fn touch(&mut self, idx: usize) {
        if self.head != idx {
            self.unlink(idx);
            self.push_front(idx);
        }
    }

    fn unlink(&mut self, idx: usize) {
        let Link { prev, next } = self.links[idx];

        if prev == NIL {
            self.head = next;
        } else {
            self.links[prev].next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.links[next].prev = prev;
        }

        self.links[idx] = Link::DETACHED;
    }

    fn push_front(&mut self, idx: usize) {
        self.links[idx] = Link {
            prev: NIL,
            next: self.head,
        };
        if self.head != NIL {
            self.links[self.head].prev = idx;
        }
        self.head = idx;
        if self.tail == NIL {
            self.tail = idx;
        }
    }
}

impl<K, V> fmt::Debug for LruTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruTable")
            .field("len", &self.map.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

/// Iterator over entries, most recently used first
pub struct RecencyIter<'a, K, V> {
    table: &'a LruTable<K, V>,
    cursor: usize,
}

impl<'a, K, V> Iterator for RecencyIter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let idx = self.cursor;
        self.cursor = self.table.links[idx].next;
        self.table.entries[idx].as_ref().map(|(k, v)| (k, v))
    }
}

/// Thread-safe bounded LRU cache
///
/// Values are cloned out on lookup so the lock is never held by callers.
/// Wrap `V` in an `Arc` when cloning is expensive.
pub struct BoundedCache<K, V> {
    table: Mutex<LruTable<K, V>>,
    counters: CacheCounters,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self {
            table: Mutex::new(LruTable::new(capacity)),
            counters: CacheCounters::default(),
        }
    }

    /// Fetch a value, marking it most recently used
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let value = self.table.lock().get(key).cloned();
        match value {
            Some(_) => self.counters.record_hit(),
            None => self.counters.record_miss(),
        }
        value
    }

    /// Fetch a value without affecting recency or hit counters
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.lock().peek(key).cloned()
    }

    /// Insert or update, returning the entry evicted to make room
    pub fn set(&self, key: K, value: V) -> Option<(K, V)>
    where
        K: fmt::Debug,
    {
        let mut table = self.table.lock();
        let existed = table.contains(&key);
        let evicted = table.set(key, value);
        drop(table);

        if existed {
            self.counters.record_update();
        } else {
            self.counters.record_insert();
        }
        if let Some((ref victim, _)) = evicted {
            self.counters.record_eviction();
            log_cache!(Level::TRACE, key = ?victim, "evicted least recently used entry");
        }
        evicted
    }

    #[inline]
    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.lock().contains(key)
    }

    /// Remove an entry. Absent keys are a no-op.
    pub fn delete<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.table.lock().remove(key)
    }

    pub fn len(&self) -> usize {
        self.table.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.lock().is_empty()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.table.lock().capacity()
    }

    pub fn clear(&self) {
        self.table.lock().clear();
    }

    /// Keys from most to least recently used
    pub fn keys_by_recency(&self) -> Vec<K> {
        self.table.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn stats(&self) -> CacheStats {
        self.counters.snapshot()
    }
}

impl<K, V> fmt::Debug for BoundedCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedCache")
            .field("table", &*self.table.lock())
            .finish()
    }
}
