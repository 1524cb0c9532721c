//! Session cache with single-flight upstream fetches
//!
//! Completed bundles live in a bounded LRU map (moka). Reads of a cached bundle
//! only clone an `Arc`. Misses go through an in-flight table keyed by
//! [`SessionKey`]: the first caller registers a shared pending result and
//! spawns the fetch, later callers for the same key await that same result.
//!
//! ```text
//!   get_or_fetch(key)
//!        │
//!        ├── entries hit ───────────────────────────► Arc<SessionBundle>
//!        │
//!        └── in-flight table (per-key shard lock)
//!              ├── pending  ─► await shared result
//!              └── vacant   ─► register ticket, spawn fetch
//!                                   │
//!                                   ▼
//!                         complete: insert bundle + drop ticket
//!                         (only if the ticket is still current)
//! ```
//!
//! The fetch runs on its own task, so a caller that gives up does not cancel
//! it for the others. Failures are handed to every waiter and never cached;
//! a fetch that panics counts as an upstream failure.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use moka::policy::EvictionPolicy;
use moka::sync::Cache;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::oneshot;
use tracing::{debug, info, trace, warn};

use crate::config::CacheConfig;
use crate::types::{SessionBundle, SessionKey};
use crate::{Result, TelemetryError};

type SharedFetch = Shared<BoxFuture<'static, Result<Arc<SessionBundle>>>>;

struct InFlight {
    ticket: u64,
    result: SharedFetch,
}

/// Cache counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    /// Upstream fetches started
    pub fetches: u64,
    /// Callers that joined an already running fetch
    pub coalesced: u64,
    pub failures: u64,
    pub entry_count: u64,
    pub in_flight: usize,
}

struct CacheInner {
    entries: Cache<SessionKey, Arc<SessionBundle>>,
    in_flight: DashMap<SessionKey, InFlight>,
    next_ticket: AtomicU64,
    max_sessions: u64,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
    coalesced: AtomicU64,
    failures: AtomicU64,
}

impl CacheInner {
    /// Store a fetch result if its ticket is still the registered one.
    ///
    /// Insert and ticket removal happen under the same shard lock, so an
    /// invalidation either precedes both or follows both.
    fn complete(&self, key: SessionKey, ticket: u64, result: &Result<Arc<SessionBundle>>) {
        match self.in_flight.entry(key) {
            Entry::Occupied(entry) if entry.get().ticket == ticket => {
                match result {
                    Ok(bundle) => self.entries.insert(key, Arc::clone(bundle)),
                    Err(_) => {
                        self.failures.fetch_add(1, Ordering::Relaxed);
                    }
                }
                entry.remove();
            }
            _ => {
                debug!(
                    session = %key,
                    ticket,
                    "Discarding fetch result superseded by invalidation"
                );
                if result.is_err() {
                    self.failures.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }
}

/// Keyed LRU store of session bundles.
///
/// Cloning is cheap and shares the same underlying cache.
#[derive(Clone)]
pub struct SessionCache {
    inner: Arc<CacheInner>,
}

enum Lookup {
    Hit(Arc<SessionBundle>),
    Wait(SharedFetch),
    Start { ticket: u64, result: SharedFetch, tx: oneshot::Sender<Result<Arc<SessionBundle>>> },
}

impl SessionCache {
    /// Create a cache holding at most `max_sessions` bundles.
    pub fn new(max_sessions: u64) -> Self {
        let max_sessions = max_sessions.max(1);
        let entries = Cache::builder()
            .max_capacity(max_sessions)
            .eviction_policy(EvictionPolicy::lru())
            .build();

        Self {
            inner: Arc::new(CacheInner {
                entries,
                in_flight: DashMap::new(),
                next_ticket: AtomicU64::new(1),
                max_sessions,
                hits: AtomicU64::new(0),
                misses: AtomicU64::new(0),
                fetches: AtomicU64::new(0),
                coalesced: AtomicU64::new(0),
                failures: AtomicU64::new(0),
            }),
        }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.max_sessions)
    }

    pub fn max_sessions(&self) -> u64 {
        self.inner.max_sessions
    }

    /// Cached bundle for a key, if present.
    pub fn get(&self, key: &SessionKey) -> Option<Arc<SessionBundle>> {
        match self.inner.entries.get(key) {
            Some(bundle) => {
                self.inner.hits.fetch_add(1, Ordering::Relaxed);
                trace!(session = %key, "Session cache hit");
                Some(bundle)
            }
            None => {
                self.inner.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or atomically replace a bundle.
    pub fn put(&self, key: SessionKey, bundle: SessionBundle) -> Arc<SessionBundle> {
        let bundle = Arc::new(bundle);
        self.inner.entries.insert(key, Arc::clone(&bundle));
        bundle
    }

    /// Cached bundle, or the result of a single shared fetch.
    ///
    /// `fetch` is only polled when this caller is the first to miss; it is
    /// dropped unused otherwise.
    pub async fn get_or_fetch<F>(&self, key: SessionKey, fetch: F) -> Result<Arc<SessionBundle>>
    where
        F: Future<Output = Result<SessionBundle>> + Send + 'static,
    {
        match self.lookup(key) {
            Lookup::Hit(bundle) => Ok(bundle),
            Lookup::Wait(result) => {
                debug!(session = %key, "Joining in-flight session fetch");
                result.await
            }
            Lookup::Start { ticket, result, tx } => {
                info!(session = %key, ticket, "Fetching session from upstream");
                let inner = Arc::clone(&self.inner);
                tokio::spawn(async move {
                    let outcome = match AssertUnwindSafe(fetch).catch_unwind().await {
                        Ok(outcome) => outcome.map(Arc::new),
                        Err(_) => {
                            warn!(session = %key, ticket, "Session fetch panicked");
                            Err(TelemetryError::upstream("session fetch failed unexpectedly"))
                        }
                    };
                    inner.complete(key, ticket, &outcome);
                    let _ = tx.send(outcome);
                });
                result.await
            }
        }
    }

    fn lookup(&self, key: SessionKey) -> Lookup {
        if let Some(bundle) = self.get(&key) {
            return Lookup::Hit(bundle);
        }

        match self.inner.in_flight.entry(key) {
            Entry::Occupied(entry) => {
                self.inner.coalesced.fetch_add(1, Ordering::Relaxed);
                Lookup::Wait(entry.get().result.clone())
            }
            Entry::Vacant(entry) => {
                // A fetch may have completed between the miss and taking the shard lock
                if let Some(bundle) = self.inner.entries.get(&key) {
                    return Lookup::Hit(bundle);
                }

                let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
                let (tx, rx) = oneshot::channel::<Result<Arc<SessionBundle>>>();
                let result: SharedFetch = async move {
                    rx.await.unwrap_or_else(|_| {
                        Err(TelemetryError::upstream("session fetch ended without a result"))
                    })
                }
                .boxed()
                .shared();

                entry.insert(InFlight { ticket, result: result.clone() });
                self.inner.fetches.fetch_add(1, Ordering::Relaxed);
                Lookup::Start { ticket, result, tx }
            }
        }
    }

    /// Drop a cached bundle and detach any in-flight fetch for the key.
    ///
    /// Waiters of a detached fetch still receive its result, but it is not stored.
    pub fn invalidate(&self, key: &SessionKey) {
        self.inner.in_flight.remove(key);
        self.inner.entries.invalidate(key);
        info!(session = %key, "Invalidated cached session");
    }

    /// Drop every cached bundle and detach every in-flight fetch.
    pub fn invalidate_all(&self) {
        self.inner.in_flight.clear();
        self.inner.entries.invalidate_all();
        self.inner.entries.run_pending_tasks();
        info!("Invalidated all cached sessions");
    }

    /// Whether a completed bundle is cached, without touching recency.
    pub fn contains(&self, key: &SessionKey) -> bool {
        self.inner.entries.contains_key(key)
    }

    /// Whether a fetch for the key is currently running.
    pub fn is_fetching(&self, key: &SessionKey) -> bool {
        self.inner.in_flight.contains_key(key)
    }

    /// Number of cached bundles after applying pending evictions.
    pub fn entry_count(&self) -> u64 {
        self.inner.entries.run_pending_tasks();
        self.inner.entries.entry_count()
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.inner.hits.load(Ordering::Relaxed),
            misses: self.inner.misses.load(Ordering::Relaxed),
            fetches: self.inner.fetches.load(Ordering::Relaxed),
            coalesced: self.inner.coalesced.load(Ordering::Relaxed),
            failures: self.inner.failures.load(Ordering::Relaxed),
            entry_count: self.entry_count(),
            in_flight: self.inner.in_flight.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BrakeKind, SessionType};
    use std::sync::atomic::AtomicU32;
    use std::time::Duration;

    fn key(round: u8) -> SessionKey {
        SessionKey::new(2024, round, SessionType::Race)
    }

    fn bundle(key: SessionKey) -> SessionBundle {
        SessionBundle::new(key, BrakeKind::Boolean, vec![], vec![])
    }

    #[tokio::test]
    async fn second_lookup_is_a_hit() {
        let cache = SessionCache::new(4);
        let calls = Arc::new(AtomicU32::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let k = key(1);
            cache
                .get_or_fetch(k, async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(bundle(k))
                })
                .await
                .unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let stats = cache.stats();
        assert_eq!(stats.fetches, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_misses_share_one_fetch() {
        let cache = SessionCache::new(4);
        let calls = Arc::new(AtomicU32::new(0));
        let (release_tx, release_rx) = tokio::sync::watch::channel(false);

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let cache = cache.clone();
            let calls = Arc::clone(&calls);
            let mut release = release_rx.clone();
            tasks.push(tokio::spawn(async move {
                let k = key(2);
                cache
                    .get_or_fetch(k, async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        let _ = release.wait_for(|released| *released).await;
                        Ok(bundle(k))
                    })
                    .await
            }));
        }

        // Let every task register before the fetch completes
        while cache.stats().fetches + cache.stats().coalesced < 16 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        release_tx.send(true).unwrap();

        let results: Vec<_> = futures::future::join_all(tasks).await;
        let first = results[0].as_ref().unwrap().as_ref().unwrap().clone();
        for result in &results {
            let bundle = result.as_ref().unwrap().as_ref().unwrap();
            assert!(Arc::ptr_eq(bundle, &first));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(cache.stats().fetches, 1);
    }

    #[tokio::test]
    async fn failures_reach_every_waiter_and_are_not_cached() {
        let cache = SessionCache::new(4);
        let k = key(3);

        let err = cache
            .get_or_fetch(k, async { Err(TelemetryError::upstream("provider down")) })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Upstream);
        assert!(!cache.contains(&k));
        assert!(!cache.is_fetching(&k));
        assert_eq!(cache.stats().failures, 1);

        let ok = cache.get_or_fetch(k, async move { Ok(bundle(k)) }).await;
        assert!(ok.is_ok());
        assert!(cache.contains(&k));
    }

    #[tokio::test]
    async fn invalidation_forces_refetch() {
        let cache = SessionCache::new(4);
        let k = key(4);
        let first = cache.get_or_fetch(k, async move { Ok(bundle(k)) }).await.unwrap();

        cache.invalidate(&k);
        assert!(!cache.contains(&k));

        let second = cache.get_or_fetch(k, async move { Ok(bundle(k)) }).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(cache.stats().fetches, 2);
    }

    #[tokio::test]
    async fn invalidated_in_flight_result_is_not_stored() {
        let cache = SessionCache::new(4);
        let k = key(5);
        let (go_tx, go_rx) = oneshot::channel::<()>();

        let waiter = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch(k, async move {
                        let _ = go_rx.await;
                        Ok(bundle(k))
                    })
                    .await
            })
        };

        while !cache.is_fetching(&k) {
            tokio::task::yield_now().await;
        }
        cache.invalidate(&k);
        go_tx.send(()).unwrap();

        assert!(waiter.await.unwrap().is_ok());
        assert!(!cache.contains(&k));
    }

    #[tokio::test]
    async fn abandoned_caller_does_not_cancel_fetch() {
        let cache = SessionCache::new(4);
        let k = key(6);
        let (go_tx, go_rx) = oneshot::channel::<()>();

        let abandoned = {
            let cache = cache.clone();
            tokio::spawn(async move {
                cache
                    .get_or_fetch(k, async move {
                        let _ = go_rx.await;
                        Ok(bundle(k))
                    })
                    .await
            })
        };
        while !cache.is_fetching(&k) {
            tokio::task::yield_now().await;
        }
        abandoned.abort();
        go_tx.send(()).unwrap();

        while cache.is_fetching(&k) {
            tokio::task::yield_now().await;
        }
        assert!(cache.contains(&k));
    }

    #[tokio::test]
    async fn panicking_fetch_releases_the_key() {
        let cache = SessionCache::new(4);
        let k = key(7);

        let err = cache
            .get_or_fetch(k, async move {
                if k.round == 7 {
                    panic!("provider returned garbage");
                }
                Ok(bundle(k))
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), crate::ErrorKind::Upstream);
        assert!(!cache.is_fetching(&k));
        assert_eq!(cache.stats().failures, 1);
        assert_eq!(cache.stats().in_flight, 0);

        let ok = cache.get_or_fetch(k, async move { Ok(bundle(k)) }).await;
        assert!(ok.is_ok());
        assert!(cache.contains(&k));
        assert_eq!(cache.stats().fetches, 2);
    }

    #[test]
    fn lru_evicts_least_recently_used() {
        let cache = SessionCache::new(2);
        cache.put(key(1), bundle(key(1)));
        cache.put(key(2), bundle(key(2)));
        assert_eq!(cache.entry_count(), 2);

        assert!(cache.get(&key(1)).is_some());
        cache.entry_count();

        cache.put(key(3), bundle(key(3)));
        assert_eq!(cache.entry_count(), 2);
        assert!(cache.contains(&key(1)));
        assert!(!cache.contains(&key(2)));
        assert!(cache.contains(&key(3)));
    }

    #[test]
    fn put_replaces_atomically() {
        let cache = SessionCache::new(2);
        let first = cache.put(key(1), bundle(key(1)));
        let second = cache.put(key(1), bundle(key(1)));
        let current = cache.get(&key(1)).unwrap();
        assert!(Arc::ptr_eq(&current, &second));
        assert!(!Arc::ptr_eq(&current, &first));
    }
}
