use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time statistics of one cache.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Reads answered from a fresh entry.
    pub hits: u64,
    /// Reads that started a load.
    pub misses: u64,
    /// Reads that joined a load already in flight.
    pub coalesced: u64,
    /// Loads that ended in an error.
    pub failures: u64,
    /// Fresh entries currently stored.
    pub entries: usize,
    /// Slots currently loading.
    pub in_flight: usize,
    pub ttl_secs: u64,
}

/// Monotonic counters behind [`CacheStats`].
#[derive(Debug, Default)]
pub(crate) struct Counters {
    hits: AtomicU64,
    misses: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    pub(crate) fn hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn coalesce(&self) {
        self.coalesced.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn fail(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn snapshot(&self, entries: usize, in_flight: usize, ttl_secs: u64) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            entries,
            in_flight,
            ttl_secs,
        }
    }
}
