//! TTL request cache with in-flight deduplication.
//!
//! Memoizes backend reads per key. Concurrent callers for a key that is
//! already being fetched join the same future instead of issuing another
//! backend call. Every fetch is registered under its key with a fresh
//! generation drawn from a cache-wide counter; invalidation retires the
//! registration, advancing the key past that generation. A fetch only commits
//! its value if its generation is still the one registered for the key when
//! it settles, so an invalidation that races an in-flight fetch can never be
//! undone by that fetch. Generations live only as long as their registration
//! or entry, so invalidating keys that were never fetched stores nothing.
//!
//! All bookkeeping happens under one mutex that is never held across an
//! await, which keeps the check-then-act sequences atomic on a multi-threaded
//! runtime.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared};
use regex::Regex;
use serde::Serialize;
use tokio::time::Instant;

use crate::domain::models::CacheConfig;

type SharedFetch<V, E> = Shared<BoxFuture<'static, Result<V, E>>>;

/// Cache behaviour switches.
#[derive(Debug, Clone)]
pub struct CacheOptions {
    /// Disabled caches call the fetcher directly and record nothing.
    pub enabled: bool,
    /// TTL used when a call does not override it.
    pub default_ttl: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            default_ttl: Duration::from_secs(300),
        }
    }
}

impl From<&CacheConfig> for CacheOptions {
    fn from(config: &CacheConfig) -> Self {
        Self {
            enabled: config.enabled,
            default_ttl: Duration::from_secs(config.ttl_secs),
        }
    }
}

/// What to drop from the cache.
#[derive(Debug, Clone)]
pub enum InvalidationTarget {
    /// One exact key.
    Key(String),
    /// Every key matching the pattern.
    Pattern(Regex),
}

impl From<&str> for InvalidationTarget {
    fn from(key: &str) -> Self {
        Self::Key(key.to_string())
    }
}

impl From<String> for InvalidationTarget {
    fn from(key: String) -> Self {
        Self::Key(key)
    }
}

impl From<Regex> for InvalidationTarget {
    fn from(pattern: Regex) -> Self {
        Self::Pattern(pattern)
    }
}

/// Counters reported by [`RequestCache::stats`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    /// Lookups served without a new fetch, joins included.
    pub hits: u64,
    /// Lookups that started a fetch.
    pub misses: u64,
    /// Lookups that joined a fetch already in flight (a subset of `hits`).
    pub joins: u64,
    /// `hits / (hits + misses)`, 0 before any lookup.
    pub hit_rate: f64,
    /// Live (unexpired) entries.
    pub size: usize,
}

struct CacheEntry<V> {
    value: V,
    expires_at: Instant,
    generation: u64,
}

struct PendingFetch<V, E> {
    generation: u64,
    future: SharedFetch<V, E>,
}

struct CacheState<V, E> {
    entries: HashMap<String, CacheEntry<V>>,
    pending: HashMap<String, PendingFetch<V, E>>,
    next_generation: u64,
}

impl<V, E> CacheState<V, E> {
    /// Whether `generation` is still the fetch registered for `key`.
    fn is_current(&self, key: &str, generation: u64) -> bool {
        self.pending
            .get(key)
            .is_some_and(|pending| pending.generation == generation)
    }
}

fn lock<V, E>(state: &Mutex<CacheState<V, E>>) -> MutexGuard<'_, CacheState<V, E>> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Key/value cache for memoizing reads.
pub struct RequestCache<V, E> {
    state: Arc<Mutex<CacheState<V, E>>>,
    options: CacheOptions,
    hits: AtomicU64,
    misses: AtomicU64,
    joins: AtomicU64,
}

impl<V, E> RequestCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Empty cache with `options`.
    pub fn new(options: CacheOptions) -> Self {
        Self {
            state: Arc::new(Mutex::new(CacheState {
                entries: HashMap::new(),
                pending: HashMap::new(),
                next_generation: 0,
            })),
            options,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            joins: AtomicU64::new(0),
        }
    }

    /// False when the cache was configured off; every lookup then fetches.
    pub const fn is_enabled(&self) -> bool {
        self.options.enabled
    }

    /// Return the cached value for `key`, joining an in-flight fetch or
    /// starting one with `fetcher` as needed.
    ///
    /// Errors are returned to every caller waiting on the fetch and are
    /// never cached.
    pub async fn get<F, Fut>(&self, key: &str, fetcher: F, ttl: Option<Duration>) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>> + Send + 'static,
    {
        if !self.options.enabled {
            return fetcher().await;
        }

        let ttl = ttl.unwrap_or(self.options.default_ttl);
        let future = {
            let mut state = lock(&self.state);

            let mut expired = false;
            if let Some(entry) = state.entries.get(key) {
                if entry.expires_at > Instant::now() {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(key, generation = entry.generation, "cache hit");
                    return Ok(entry.value.clone());
                }
                expired = true;
            }
            if expired {
                state.entries.remove(key);
                tracing::trace!(key, "cache entry expired");
            }

            let joined = state.pending.get(key).map(|pending| pending.future.clone());
            if let Some(future) = joined {
                self.hits.fetch_add(1, Ordering::Relaxed);
                self.joins.fetch_add(1, Ordering::Relaxed);
                tracing::trace!(key, "joining in-flight fetch");
                future
            } else {
                self.misses.fetch_add(1, Ordering::Relaxed);
                let generation = state.next_generation;
                state.next_generation += 1;

                let future = settle(
                    Arc::clone(&self.state),
                    key.to_string(),
                    generation,
                    ttl,
                    fetcher(),
                )
                .boxed()
                .shared();
                state.pending.insert(
                    key.to_string(),
                    PendingFetch {
                        generation,
                        future: future.clone(),
                    },
                );
                tracing::trace!(key, generation, "cache miss, fetching");
                future
            }
        };

        future.await
    }

    /// Drop one key or every key matching a pattern. Returns how many stored
    /// entries were removed.
    ///
    /// Each affected key's in-flight registration is retired, so a fetch
    /// already running for it will not commit and the next lookup starts a
    /// fresh fetch under a new generation.
    pub fn invalidate(&self, target: impl Into<InvalidationTarget>) -> usize {
        let mut state = lock(&self.state);

        let keys: Vec<String> = match target.into() {
            InvalidationTarget::Key(key) => vec![key],
            InvalidationTarget::Pattern(pattern) => state
                .entries
                .keys()
                .chain(state.pending.keys())
                .filter(|key| pattern.is_match(key))
                .cloned()
                .collect::<HashSet<_>>()
                .into_iter()
                .collect(),
        };

        let mut removed = 0;
        let mut retired = 0;
        for key in &keys {
            if state.entries.remove(key).is_some() {
                removed += 1;
            }
            if state.pending.remove(key).is_some() {
                retired += 1;
            }
        }

        tracing::debug!(keys = keys.len(), removed, retired, "cache invalidated");
        removed
    }

    /// Drop every entry and in-flight marker. Hit/miss counters are kept.
    pub fn clear(&self) {
        let mut state = lock(&self.state);
        let in_flight = state.pending.len();
        state.entries.clear();
        state.pending.clear();
        tracing::debug!(in_flight, "cache cleared");
    }

    /// Whether a live entry exists for `key`.
    pub fn contains(&self, key: &str) -> bool {
        lock(&self.state)
            .entries
            .get(key)
            .is_some_and(|entry| entry.expires_at > Instant::now())
    }

    /// Number of fetches currently in flight.
    pub fn in_flight(&self) -> usize {
        lock(&self.state).pending.len()
    }

    /// Unexpired entries. Fetches still in flight are not counted.
    pub fn len(&self) -> usize {
        let now = Instant::now();
        lock(&self.state)
            .entries
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    /// Whether no unexpired entries remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the hit and miss counters.
    #[allow(clippy::cast_precision_loss)]
    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            hits,
            misses,
            joins: self.joins.load(Ordering::Relaxed),
            hit_rate: if total == 0 {
                0.0
            } else {
                hits as f64 / total as f64
            },
            size: self.len(),
        }
    }
}

/// Run a fetch to completion and commit its value if its generation is still
/// registered for the key.
async fn settle<V, E, Fut>(
    state: Arc<Mutex<CacheState<V, E>>>,
    key: String,
    generation: u64,
    ttl: Duration,
    fetch: Fut,
) -> Result<V, E>
where
    V: Clone,
    Fut: Future<Output = Result<V, E>>,
{
    let result = fetch.await;

    let mut state = lock(&state);
    let current = state.is_current(&key, generation);
    if current {
        state.pending.remove(&key);
    }

    match &result {
        Ok(value) if current => {
            state.entries.insert(
                key,
                CacheEntry {
                    value: value.clone(),
                    expires_at: Instant::now() + ttl,
                    generation,
                },
            );
        }
        Ok(_) => tracing::debug!(key = %key, "key invalidated during fetch, result not cached"),
        Err(_) => tracing::debug!(key = %key, "fetch failed, result not cached"),
    }

    result
}

impl<V, E> Default for RequestCache<V, E>
where
    V: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new(CacheOptions::default())
    }
}
