//! The shared, bounded handler-resolution cache.
//!
//! One cache serves every visitor instance of every visitor class: entries
//! are keyed by (visitor type, node type) and hold the resolved handler,
//! the resolved absence of one, or the resolved ambiguity. The cache is a
//! performance layer only (a miss re-resolves, it never changes which
//! handler wins), so the eviction policy is allowed to be approximate:
//! every lookup stamps its entry with a monotonically increasing counter,
//! and once the population exceeds the upper capacity threshold a single
//! coarse sweep discards the coldest entries until the population is back
//! at the lower threshold.
//!
//! Concurrency: reads take no global lock (the map is sharded), insertion
//! is first-writer-wins check-and-set, and sweeps serialize on a mutex;
//! a thread that finds a sweep already running skips its own, since the
//! running sweep is already doing the work. An entry evicted right after
//! being returned stays safe to use; it just won't be found by the next
//! lookup.

use core::any::TypeId;
use core::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rustc_hash::FxBuildHasher;
use static_assertions::assert_impl_all;
use tracing::debug;

use crate::node::{NodeType, NodeTypeId};
use crate::visit::{resolve, visitor_type_id, Resolution, Visitor};

/// Default population at which a sweep starts.
pub const DEFAULT_UPPER_CAPACITY: usize = 4096;

/// Default population a sweep shrinks back down to.
pub const DEFAULT_LOWER_CAPACITY: usize = 3072;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct CacheKey {
    visitor: TypeId,
    node_type: NodeTypeId,
}

#[derive(Debug)]
struct CacheEntry {
    resolution: Resolution,
    last_used: AtomicU64,
}

/// Bounded, thread-safe memo of handler resolutions.
///
/// The process-wide instance from [`DispatchCache::shared`] is the default
/// for every dispatcher; tests construct isolated caches with
/// [`DispatchCache::with_capacity`] instead of fighting over global state.
#[derive(Debug)]
pub struct DispatchCache {
    entries: DashMap<CacheKey, CacheEntry, FxBuildHasher>,
    tick: AtomicU64,
    sweeping: Mutex<()>,
    upper: usize,
    lower: usize,
}

assert_impl_all!(DispatchCache: Send, Sync);

impl DispatchCache {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_UPPER_CAPACITY, DEFAULT_LOWER_CAPACITY)
    }

    /// A cache that sweeps above `upper` entries, down to `lower`.
    pub fn with_capacity(upper: usize, lower: usize) -> Self {
        Self {
            entries: DashMap::with_hasher(FxBuildHasher::default()),
            tick: AtomicU64::new(0),
            sweeping: Mutex::new(()),
            upper,
            lower: lower.min(upper),
        }
    }

    /// The process-wide cache shared by all dispatchers by default.
    pub fn shared() -> &'static DispatchCache {
        static SHARED: Lazy<DispatchCache> = Lazy::new(DispatchCache::new);
        &SHARED
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drops every entry. Purely an optimization reset: subsequent lookups
    /// re-resolve to identical results.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Memoized resolution for `visitor`'s type against `node_type`.
    pub(crate) fn lookup(
        &self,
        visitor: &dyn Visitor,
        node_type: &'static NodeType,
    ) -> Resolution {
        let key = CacheKey {
            visitor: visitor_type_id(visitor),
            node_type: node_type.id(),
        };
        let stamp = self.tick.fetch_add(1, Ordering::Relaxed) + 1;

        if let Some(entry) = self.entries.get(&key) {
            entry.last_used.store(stamp, Ordering::Relaxed);
            return entry.resolution;
        }

        let resolved = resolve(visitor.handlers(), node_type);
        // First writer wins: losing the race just means adopting the
        // winner's (identical) entry.
        let resolution = self
            .entries
            .entry(key)
            .or_insert_with(|| CacheEntry {
                resolution: resolved,
                last_used: AtomicU64::new(stamp),
            })
            .resolution;

        if self.entries.len() > self.upper {
            self.sweep();
        }
        resolution
    }

    /// Coarse eviction: sort everything by last-use stamp, drop the coldest
    /// entries until the population is at the lower threshold.
    fn sweep(&self) {
        // One sweeper at a time; anyone else arriving skips.
        let Some(_guard) = self.sweeping.try_lock() else {
            return;
        };
        if self.entries.len() <= self.upper {
            return;
        }
        let mut stamped: Vec<(CacheKey, u64)> = self
            .entries
            .iter()
            .map(|entry| (*entry.key(), entry.value().last_used.load(Ordering::Relaxed)))
            .collect();
        stamped.sort_unstable_by_key(|&(_, used)| used);
        let excess = stamped.len().saturating_sub(self.lower);
        for (key, _) in stamped.into_iter().take(excess) {
            self.entries.remove(&key);
        }
        debug!(
            target: "arbo::dispatch",
            evicted = excess,
            population = self.entries.len(),
            "dispatch cache sweep"
        );
    }
}

impl Default for DispatchCache {
    fn default() -> Self {
        Self::new()
    }
}
