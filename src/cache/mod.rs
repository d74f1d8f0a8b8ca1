//! Bounded concurrent cache subsystem.
//!
//! # Data Flow
//! ```text
//! put(key, value)
//!     → key map insert (dashmap shard write lock)
//!     → recency index insert (order lock, new keys only)
//!     → evict least-recent entries while size > capacity
//!
//! get(key) / touch(key)
//!     → key map lookup (dashmap shard read lock)
//!     → stamp entry with a fresh tick (atomic store, no order lock)
//! ```
//!
//! # Design Decisions
//! - Recency is a logical clock, not wall time
//! - Reads never take the order lock; the recency index is corrected lazily
//!   at eviction time by re-queuing entries whose stamp moved on
//! - Insertions and evictions are serialised, so `size()` exceeds the
//!   capacity by at most one entry, and only while a `put` is in flight
//! - Capacity zero is legal: every insert is evicted immediately

pub mod lru;
pub mod stats;

pub use lru::LruCache;
pub use stats::CacheStats;
