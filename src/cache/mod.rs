//! Request-deduplicating cache in front of a [`MarketDataProvider`].
//!
//! One provider fetch per `(ticker, period)` per validity window. Misses on
//! the same key are serialized, so concurrent callers share a single fetch
//! and observe the same `Arc<PriceSeries>`. Failures are never stored.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard as SyncMutexGuard};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::error::FetchError;
use crate::metrics::Metrics;
use crate::models::{PriceQuery, PriceSeries};
use crate::services::market_data::MarketDataProvider;

pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
pub const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CachePolicy {
    /// `None` keeps entries for the lifetime of the process.
    pub ttl: Option<Duration>,
    pub capacity: usize,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self {
            ttl: Some(DEFAULT_TTL),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub series: Arc<PriceSeries>,
    pub fetched_at: Instant,
}

impl CacheEntry {
    fn is_fresh(&self, ttl: Option<Duration>, now: Instant) -> bool {
        match ttl {
            Some(ttl) => now.duration_since(self.fetched_at) < ttl,
            None => true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub fetches: u64,
    /// Keys with a fetch running or callers queued behind one.
    pub in_flight: usize,
}

type KeyLocks = HashMap<PriceQuery, Arc<Mutex<()>>>;

/// Holds a caller's claim on a key lock and gives the map slot back when the
/// last claimant goes away, including when the `get` future is dropped.
struct KeyLockClaim<'a> {
    locks: &'a SyncMutex<KeyLocks>,
    query: &'a PriceQuery,
    lock: Arc<Mutex<()>>,
}

impl Drop for KeyLockClaim<'_> {
    fn drop(&mut self) {
        let mut locks = lock_key_locks(self.locks);
        let current = locks
            .get(self.query)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock));
        // One reference lives in the map and one here; any more are waiters.
        if current && Arc::strong_count(&self.lock) == 2 {
            locks.remove(self.query);
        }
    }
}

fn lock_key_locks(locks: &SyncMutex<KeyLocks>) -> SyncMutexGuard<'_, KeyLocks> {
    locks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

pub struct PriceFetchCache {
    provider: Arc<dyn MarketDataProvider>,
    policy: CachePolicy,
    entries: RwLock<HashMap<PriceQuery, CacheEntry>>,
    inflight: SyncMutex<KeyLocks>,
    metrics: Option<Arc<Metrics>>,
    hits: AtomicU64,
    misses: AtomicU64,
    fetches: AtomicU64,
}

impl PriceFetchCache {
    pub fn new(provider: Arc<dyn MarketDataProvider>, policy: CachePolicy) -> Self {
        Self {
            provider,
            policy,
            entries: RwLock::new(HashMap::new()),
            inflight: SyncMutex::new(HashMap::new()),
            metrics: None,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            fetches: AtomicU64::new(0),
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> CachePolicy {
        self.policy
    }

    /// Returns the price history for `query`, fetching it at most once per
    /// validity window.
    pub async fn get(&self, query: &PriceQuery) -> Result<Arc<PriceSeries>, FetchError> {
        if let Some(series) = self.lookup(query).await {
            self.record_hit(query);
            return Ok(series);
        }

        let claim = self.claim_key_lock(query);
        let _guard = claim.lock.lock().await;

        // Another caller may have filled the entry while we waited.
        if let Some(series) = self.lookup(query).await {
            self.record_hit(query);
            return Ok(series);
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.price_cache_misses_total.inc();
        }

        self.fetch(query).await
    }

    /// Validates raw input and delegates to [`get`](Self::get).
    pub async fn get_raw(&self, ticker: &str, period: &str) -> Result<Arc<PriceSeries>, FetchError> {
        let query = PriceQuery::parse(ticker, period)?;
        self.get(&query).await
    }

    pub async fn invalidate(&self, query: &PriceQuery) -> bool {
        self.entries.write().await.remove(query).is_some()
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let dropped = entries.len();
        entries.clear();
        info!(dropped = dropped, "Price cache cleared");
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            fetches: self.fetches.load(Ordering::Relaxed),
            in_flight: lock_key_locks(&self.inflight).len(),
        }
    }

    async fn lookup(&self, query: &PriceQuery) -> Option<Arc<PriceSeries>> {
        let entries = self.entries.read().await;
        entries
            .get(query)
            .filter(|entry| entry.is_fresh(self.policy.ttl, Instant::now()))
            .map(|entry| entry.series.clone())
    }

    async fn fetch(&self, query: &PriceQuery) -> Result<Arc<PriceSeries>, FetchError> {
        self.fetches.fetch_add(1, Ordering::Relaxed);
        let started = std::time::Instant::now();
        let outcome = self.provider.fetch_history(query).await;
        if let Some(metrics) = &self.metrics {
            metrics
                .provider_fetch_duration_seconds
                .observe(started.elapsed().as_secs_f64());
        }

        let series = match outcome {
            Ok(series) if series.is_empty() => Err(FetchError::EmptyData {
                ticker: query.ticker().to_string(),
                period: query.period().to_string(),
            }),
            other => other,
        };

        match series {
            Ok(series) => {
                let series = Arc::new(series);
                self.store(query, series.clone()).await;
                debug!(
                    provider = self.provider.id(),
                    ticker = %query.ticker(),
                    period = %query.period(),
                    bars = series.len(),
                    "Fetched and cached price series"
                );
                Ok(series)
            }
            Err(err) => {
                if let Some(metrics) = &self.metrics {
                    metrics
                        .price_fetch_errors_total
                        .with_label_values(&[err.kind()])
                        .inc();
                }
                warn!(
                    provider = self.provider.id(),
                    ticker = %query.ticker(),
                    period = %query.period(),
                    error = %err,
                    "Price fetch failed"
                );
                Err(err)
            }
        }
    }

    async fn store(&self, query: &PriceQuery, series: Arc<PriceSeries>) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if !entries.contains_key(query) && entries.len() >= self.policy.capacity {
            let ttl = self.policy.ttl;
            entries.retain(|_, entry| entry.is_fresh(ttl, now));

            while entries.len() >= self.policy.capacity {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| entry.fetched_at)
                    .map(|(key, _)| key.clone());
                match oldest {
                    Some(key) => {
                        debug!(evicted = %key, "Evicting oldest price cache entry");
                        entries.remove(&key);
                    }
                    None => break,
                }
            }
        }

        if self.policy.capacity > 0 {
            entries.insert(
                query.clone(),
                CacheEntry {
                    series,
                    fetched_at: now,
                },
            );
        }
    }

    fn claim_key_lock<'a>(&'a self, query: &'a PriceQuery) -> KeyLockClaim<'a> {
        let lock = lock_key_locks(&self.inflight)
            .entry(query.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        KeyLockClaim {
            locks: &self.inflight,
            query,
            lock,
        }
    }

    fn record_hit(&self, query: &PriceQuery) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        if let Some(metrics) = &self.metrics {
            metrics.price_cache_hits_total.inc();
        }
        debug!(ticker = %query.ticker(), period = %query.period(), "Price cache hit");
    }
}
