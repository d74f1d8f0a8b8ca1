//! Thread-safe, resizable LRU cache.
//!
//! # Responsibilities
//! - Store key → value pairs up to a configurable capacity
//! - Track recency and evict the least-recently-used entry first
//! - Resize live, evicting immediately when shrinking
//! - Count hits, misses, inserts and evictions

use std::borrow::Borrow;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use crate::cache::stats::{CacheStats, StatsCounters};

/// A cached value together with the tick of its last access.
struct Slot<V> {
    value: V,
    stamp: AtomicU64,
}

/// A bounded key → value cache with least-recently-used eviction.
///
/// All operations take `&self`; share the cache through an `Arc`.
/// Values are handed out by clone, so wrap large values in `Arc` as well.
pub struct LruCache<K, V> {
    entries: DashMap<K, Slot<V>>,
    /// Recency index, oldest tick first. Holds exactly one node per key.
    /// A node's tick may lag the slot's after a lock-free read.
    order: Mutex<BTreeMap<u64, K>>,
    clock: AtomicU64,
    max_size: AtomicUsize,
    stats: StatsCounters,
}

impl<K, V> LruCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create an empty cache holding at most `max_size` entries.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: DashMap::new(),
            order: Mutex::new(BTreeMap::new()),
            clock: AtomicU64::new(0),
            max_size: AtomicUsize::new(max_size),
            stats: StatsCounters::default(),
        }
    }

    /// Create a cache seeded from `other`, preserving relative recency.
    ///
    /// When `other` holds more than `max_size` entries only the most
    /// recently used `max_size` are copied.
    pub fn from_cache(max_size: usize, other: &LruCache<K, V>) -> Self {
        let mut snapshot: Vec<(u64, K, V)> = other
            .entries
            .iter()
            .map(|entry| {
                (
                    entry.value().stamp.load(Ordering::Acquire),
                    entry.key().clone(),
                    entry.value().value.clone(),
                )
            })
            .collect();
        snapshot.sort_unstable_by_key(|(stamp, _, _)| *stamp);

        let skip = snapshot.len().saturating_sub(max_size);
        let cache = Self::new(max_size);
        for (_, key, value) in snapshot.into_iter().skip(skip) {
            cache.put(key, value);
        }
        cache
    }

    /// Look up `key`, marking it most recently used on a hit.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let found = self.entries.get(key).map(|slot| {
            slot.stamp.store(self.tick(), Ordering::Release);
            slot.value.clone()
        });

        match found {
            Some(_) => self.stats.hit(),
            None => self.stats.miss(),
        }
        found
    }

    /// Insert or overwrite `key`, then evict down to capacity.
    pub fn put(&self, key: K, value: V) {
        let mut order = self.lock_order();
        let stamp = self.tick();

        match self.entries.entry(key) {
            Entry::Occupied(mut occupied) => {
                let slot = occupied.get_mut();
                slot.value = value;
                slot.stamp.store(stamp, Ordering::Release);
            }
            Entry::Vacant(vacant) => {
                order.insert(stamp, vacant.key().clone());
                vacant.insert(Slot {
                    value,
                    stamp: AtomicU64::new(stamp),
                });
            }
        }
        self.stats.insert();

        let limit = self.max_size();
        let evicted = self.evict_to(&mut order, limit);
        self.stats.evicted(evicted);
    }

    /// Mark `key` most recently used without reading it. No-op if absent.
    pub fn touch<Q>(&self, key: &Q)
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        if let Some(slot) = self.entries.get(key) {
            slot.stamp.store(self.tick(), Ordering::Release);
        }
    }

    /// Whether `key` is present. Does not affect recency or statistics.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains_key(key)
    }

    /// Change the capacity.
    ///
    /// Shrinking evicts least-recently-used entries immediately; growing
    /// only admits more entries from now on.
    pub fn set_max_size(&self, max_size: usize) {
        let mut order = self.lock_order();
        self.max_size.store(max_size, Ordering::Release);
        let evicted = self.evict_to(&mut order, max_size);
        self.stats.evicted(evicted);

        tracing::debug!(max_size, evicted, "Cache resized");
    }

    /// Current capacity.
    pub fn max_size(&self) -> usize {
        self.max_size.load(Ordering::Acquire)
    }

    /// Current number of entries.
    pub fn size(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove every entry. Capacity and counters are kept.
    pub fn clear(&self) {
        let mut order = self.lock_order();
        self.entries.clear();
        order.clear();
    }

    /// Snapshot of the current keys, least recently used first.
    pub fn keys(&self) -> Vec<K> {
        let mut stamped: Vec<(u64, K)> = self
            .entries
            .iter()
            .map(|entry| (entry.value().stamp.load(Ordering::Acquire), entry.key().clone()))
            .collect();
        stamped.sort_unstable_by_key(|(stamp, _)| *stamp);
        stamped.into_iter().map(|(_, key)| key).collect()
    }

    /// Cumulative counters plus current size and capacity.
    pub fn stats(&self) -> CacheStats {
        self.stats.snapshot(self.size(), self.max_size())
    }

    /// Counters rendered as text, e.g. `HIT:3 MISS:1 INSERT:4 EVICT:1 SIZE:3/3`.
    pub fn get_stats(&self) -> String {
        self.stats().to_string()
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn lock_order(&self) -> MutexGuard<'_, BTreeMap<u64, K>> {
        self.order.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Evict until at most `limit` entries remain. Caller holds the order lock.
    ///
    /// Nodes whose tick is older than their slot's were read since they
    /// were queued; they are re-queued at the slot's tick instead of evicted.
    fn evict_to(&self, order: &mut BTreeMap<u64, K>, limit: usize) -> u64 {
        let mut evicted = 0;
        while self.entries.len() > limit {
            let Some((stamp, key)) = order.pop_first() else {
                break;
            };

            let removed = self
                .entries
                .remove_if(&key, |_, slot| slot.stamp.load(Ordering::Acquire) == stamp);
            if removed.is_some() {
                evicted += 1;
                continue;
            }

            if let Some(current) = self
                .entries
                .get(&key)
                .map(|slot| slot.stamp.load(Ordering::Acquire))
            {
                order.insert(current, key);
            }
        }
        evicted
    }
}

impl<K: Eq + Hash, V> fmt::Debug for LruCache<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruCache")
            .field("size", &self.entries.len())
            .field("max_size", &self.max_size.load(Ordering::Relaxed))
            .finish()
    }
}
