//! Single-slot memo of the last distance query.
//!
//! Grid sampling often asks for the unsigned distance of a point and then
//! immediately for its signed distance. The slot remembers the nearest hit
//! and, once resolved, the signed value for the most recent point.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, TryLockError};

use nalgebra::Point3;
use tracing::warn;

use crate::query::NearestHit;

/// Bitwise key of a query point. `-0.0` and `0.0` are different keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PointKey([u64; 3]);

impl PointKey {
    pub(crate) fn of(point: Point3<f64>) -> Self {
        Self([point.x.to_bits(), point.y.to_bits(), point.z.to_bits()])
    }
}

/// Cached result for one point.
#[derive(Debug, Clone, Copy)]
pub(crate) struct CachedQuery {
    pub(crate) key: PointKey,
    pub(crate) hit: NearestHit,
    pub(crate) signed: Option<f64>,
}

/// Counters describing how the cache has been used.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Queries answered from the slot.
    pub hits: u64,
    /// Queries that took the lock but had to recompute.
    pub misses: u64,
    /// Queries that found the lock taken and skipped the cache.
    pub bypassed: u64,
}

/// Per-oracle query cache.
///
/// Guarded by a `Mutex` that is only ever `try_lock`ed: a thread that finds
/// it held computes without the cache instead of waiting.
#[derive(Debug, Default)]
pub(crate) struct QueryCache {
    slot: Mutex<Option<CachedQuery>>,
    hits: AtomicU64,
    misses: AtomicU64,
    bypassed: AtomicU64,
}

impl QueryCache {
    /// Run `f` on the slot if the lock is free, otherwise return `None`.
    ///
    /// A slot poisoned by a panic is emptied and used again.
    ///
    /// `f` reports whether it was served from the slot.
    pub(crate) fn with_slot<R>(
        &self,
        f: impl FnOnce(&mut Option<CachedQuery>) -> (R, bool),
    ) -> Option<R> {
        let mut guard = match self.slot.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                self.bypassed.fetch_add(1, Ordering::Relaxed);
                return None;
            }
            Err(TryLockError::Poisoned(poisoned)) => {
                // A query panicked mid-update; the slot may be half written
                warn!("Query cache was poisoned by a panic; clearing it");
                let mut guard = poisoned.into_inner();
                *guard = None;
                self.slot.clear_poison();
                guard
            }
        };
        let (result, hit) = f(&mut guard);
        let counter = if hit { &self.hits } else { &self.misses };
        counter.fetch_add(1, Ordering::Relaxed);
        Some(result)
    }

    pub(crate) fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            bypassed: self.bypassed.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::query::NearestEntity;

    fn hit() -> NearestHit {
        NearestHit {
            face: 3,
            point: Point3::origin(),
            entity: NearestEntity::Face,
            distance: 1.0,
        }
    }

    #[test]
    fn keys_compare_bitwise() {
        let p = Point3::new(1.0, 2.0, 3.0);
        assert_eq!(PointKey::of(p), PointKey::of(Point3::new(1.0, 2.0, 3.0)));
        assert_ne!(
            PointKey::of(Point3::new(0.0, 0.0, 0.0)),
            PointKey::of(Point3::new(-0.0, 0.0, 0.0))
        );
    }

    #[test]
    fn slot_persists_between_calls() {
        let cache = QueryCache::default();
        let key = PointKey::of(Point3::new(1.0, 0.0, 0.0));

        let stored = cache.with_slot(|slot| {
            *slot = Some(CachedQuery {
                key,
                hit: hit(),
                signed: None,
            });
            ((), false)
        });
        assert!(stored.is_some());

        let face = cache
            .with_slot(|slot| (slot.map(|c| c.hit.face), true))
            .unwrap();
        assert_eq!(face, Some(3));
        assert_eq!(
            cache.stats(),
            CacheStats {
                hits: 1,
                misses: 1,
                bypassed: 0
            }
        );
    }

    #[test]
    fn held_lock_bypasses() {
        let cache = QueryCache::default();
        let _guard = cache.slot.lock().unwrap();
        assert!(cache.with_slot(|_| ((), true)).is_none());
        assert_eq!(cache.stats().bypassed, 1);
    }

    #[test]
    fn poisoned_slot_is_cleared_and_reused() {
        let cache = QueryCache::default();
        cache.with_slot(|slot| {
            *slot = Some(CachedQuery {
                key: PointKey::of(Point3::origin()),
                hit: hit(),
                signed: Some(1.0),
            });
            ((), false)
        });

        let panicked = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = cache.slot.lock().unwrap();
            panic!("query panicked while holding the slot");
        }));
        assert!(panicked.is_err());
        assert!(cache.slot.is_poisoned());

        let had_entry = cache.with_slot(|slot| (slot.is_some(), false)).unwrap();
        assert!(!had_entry);
        assert!(!cache.slot.is_poisoned());
        assert_eq!(cache.stats().bypassed, 0);
        assert_eq!(cache.stats().misses, 2);
    }
}
