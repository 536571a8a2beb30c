//! Generic single-flight TTL cache keyed by [`Identity`].

use crate::error::LoadAborted;
use crate::stats::{CacheStats, Counters};
use capgate_model::Identity;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

type InFlight<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// A stored value and the instant it stops being served.
#[derive(Debug, Clone)]
pub struct CachedEntry<V> {
    pub value: V,
    pub expires_at: Instant,
}

impl<V> CachedEntry<V> {
    pub fn new(value: V, ttl: Duration) -> Self {
        Self {
            value,
            expires_at: Instant::now() + ttl,
        }
    }

    /// Valid strictly before `expires_at`; a read at the boundary reloads.
    pub fn is_fresh_at(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

enum Slot<V, E> {
    Ready(CachedEntry<V>),
    Building {
        generation: u64,
        in_flight: InFlight<V, E>,
    },
}

enum Lookup<V, E> {
    Hit(V),
    Join(InFlight<V, E>),
    Load,
}

impl<V: Clone, E> Slot<V, E> {
    fn lookup(&self, now: Instant) -> Lookup<V, E> {
        match self {
            Slot::Ready(entry) if entry.is_fresh_at(now) => Lookup::Hit(entry.value.clone()),
            Slot::Ready(_) => Lookup::Load,
            Slot::Building { in_flight, .. } => Lookup::Join(in_flight.clone()),
        }
    }
}

struct Inner<V, E> {
    slots: DashMap<Identity, Slot<V, E>>,
    ttl: Duration,
    next_generation: AtomicU64,
    counters: Counters,
    created: Instant,
    /// Milliseconds after `created` of the last eviction pass.
    last_evicted_ms: AtomicU64,
}

impl<V, E> Inner<V, E>
where
    V: Clone,
{
    /// Drop expired `Ready` slots, at most once per TTL. Must not be called
    /// while holding a reference into `slots`.
    fn evict_expired(&self, now: Instant) {
        let elapsed = millis(now.saturating_duration_since(self.created));
        let last = self.last_evicted_ms.load(Ordering::Relaxed);
        if elapsed.saturating_sub(last) < millis(self.ttl) {
            return;
        }
        if self
            .last_evicted_ms
            .compare_exchange(last, elapsed, Ordering::Relaxed, Ordering::Relaxed)
            .is_err()
        {
            return;
        }
        let before = self.slots.len();
        self.slots
            .retain(|_, slot| !matches!(slot, Slot::Ready(entry) if !entry.is_fresh_at(now)));
        let evicted = before.saturating_sub(self.slots.len());
        if evicted > 0 {
            debug!(evicted, "Evicted expired cache entries");
        }
    }

    /// Store or drop the outcome of a load. A slot that was invalidated or
    /// replaced since the load started no longer carries `generation`, and
    /// the result is then only delivered to the callers already waiting.
    fn settle(&self, key: &Identity, generation: u64, result: &Result<V, E>) {
        if result.is_err() {
            self.counters.fail();
        }
        let Entry::Occupied(mut slot) = self.slots.entry(key.clone()) else {
            debug!(identity = %key, "Load finished after invalidation, result not stored");
            return;
        };
        let current = matches!(
            slot.get(),
            Slot::Building { generation: g, .. } if *g == generation
        );
        if !current {
            debug!(identity = %key, "Load superseded, result not stored");
            return;
        }
        match result {
            Ok(value) => {
                slot.insert(Slot::Ready(CachedEntry::new(value.clone(), self.ttl)));
            }
            Err(_) => {
                slot.remove();
            }
        }
    }
}

/// Per-identity cache with a fixed TTL and at most one load in flight per key.
///
/// Cloning is cheap and clones share the same storage.
pub struct TtlCache<V, E> {
    inner: Arc<Inner<V, E>>,
}

impl<V, E> Clone for TtlCache<V, E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V, E> TtlCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + From<LoadAborted> + 'static,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: DashMap::new(),
                ttl,
                next_generation: AtomicU64::new(1),
                counters: Counters::default(),
                created: Instant::now(),
                last_evicted_ms: AtomicU64::new(0),
            }),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.inner.ttl
    }

    /// Return the fresh value for `key`, joining or starting a load otherwise.
    ///
    /// `load` is only polled when this call starts the load; it then runs on
    /// its own task and completes even if every caller stops waiting.
    pub async fn get_or_load<F, Fut>(&self, key: &Identity, load: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut + Send,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        let existing = self
            .inner
            .slots
            .get(key)
            .map(|slot| slot.lookup(Instant::now()));
        match existing {
            Some(Lookup::Hit(value)) => {
                self.inner.counters.hit();
                return Ok(value);
            }
            Some(Lookup::Join(in_flight)) => {
                self.inner.counters.coalesce();
                return in_flight.await;
            }
            Some(Lookup::Load) | None => {}
        }

        self.inner.evict_expired(Instant::now());
        let pending = load();
        let in_flight = match self.inner.slots.entry(key.clone()) {
            Entry::Occupied(mut slot) => match slot.get().lookup(Instant::now()) {
                Lookup::Hit(value) => {
                    self.inner.counters.hit();
                    return Ok(value);
                }
                Lookup::Join(in_flight) => {
                    self.inner.counters.coalesce();
                    in_flight
                }
                Lookup::Load => {
                    debug!(identity = %key, "Cached entry expired, reloading");
                    let (generation, in_flight) = self.spawn_load(key, pending);
                    slot.insert(Slot::Building {
                        generation,
                        in_flight: in_flight.clone(),
                    });
                    in_flight
                }
            },
            Entry::Vacant(slot) => {
                let (generation, in_flight) = self.spawn_load(key, pending);
                slot.insert(Slot::Building {
                    generation,
                    in_flight: in_flight.clone(),
                });
                in_flight
            }
        };
        in_flight.await
    }

    fn spawn_load<Fut>(&self, key: &Identity, pending: Fut) -> (u64, InFlight<V, E>)
    where
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        self.inner.counters.miss();
        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);

        let inner = Arc::clone(&self.inner);
        let task_key = key.clone();
        let handle = tokio::spawn(async move {
            let result = match AssertUnwindSafe(pending).catch_unwind().await {
                Ok(result) => result,
                Err(_) => {
                    warn!(identity = %task_key, "Cache load panicked");
                    Err(E::from(LoadAborted::panicked()))
                }
            };
            inner.settle(&task_key, generation, &result);
            result
        });

        let inner = Arc::clone(&self.inner);
        let join_key = key.clone();
        let in_flight = async move {
            match handle.await {
                Ok(result) => result,
                Err(join_err) => {
                    let result = Err(E::from(LoadAborted(join_err.to_string())));
                    inner.settle(&join_key, generation, &result);
                    result
                }
            }
        }
        .boxed()
        .shared();

        (generation, in_flight)
    }

    /// The fresh value for `key`, without loading.
    pub fn peek(&self, key: &Identity) -> Option<V> {
        let now = Instant::now();
        match self.inner.slots.get(key).as_deref() {
            Some(Slot::Ready(entry)) if entry.is_fresh_at(now) => Some(entry.value.clone()),
            _ => None,
        }
    }

    /// Drop the entry for `key`. A load in flight still answers its current
    /// waiters but its result is not stored.
    pub fn invalidate(&self, key: &Identity) -> bool {
        self.inner.slots.remove(key).is_some()
    }

    /// Drop every entry. Same in-flight semantics as [`invalidate`](Self::invalidate).
    pub fn clear(&self) {
        self.inner.slots.clear();
    }

    /// Slots currently held, including expired entries not yet evicted.
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    pub fn stats(&self) -> CacheStats {
        let now = Instant::now();
        self.inner.evict_expired(now);
        let mut entries = 0;
        let mut in_flight = 0;
        for slot in self.inner.slots.iter() {
            match slot.value() {
                Slot::Ready(entry) if entry.is_fresh_at(now) => entries += 1,
                Slot::Ready(_) => {}
                Slot::Building { .. } => in_flight += 1,
            }
        }
        self.inner
            .counters
            .snapshot(entries, in_flight, self.inner.ttl.as_secs())
    }
}
