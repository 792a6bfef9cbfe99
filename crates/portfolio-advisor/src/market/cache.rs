//! Market data cache
//!
//! Capacity-bounded LRU over `(ticker, period)` with a time-to-live.
//! Time comes from an injected [`Clock`] so expiry is testable.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use super::{MarketDataClient, Period, PriceHistory};
use crate::error::{AdvisorError, Result};

/// Monotonic time source
pub trait Clock: Send + Sync {
    /// Time elapsed since an arbitrary fixed origin
    fn now(&self) -> Duration;
}

pub struct SystemClock {
    origin: Instant,
}

impl Default for SystemClock {
    fn default() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Clock for SystemClock {
    fn now(&self) -> Duration {
        self.origin.elapsed()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, by: Duration) {
        let millis = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.millis.fetch_add(millis, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Duration {
        Duration::from_millis(self.millis.load(Ordering::SeqCst))
    }
}

type CacheKey = (String, Period);

struct Entry {
    history: Arc<PriceHistory>,
    inserted_at: Duration,
    last_used: u64,
}

pub struct MarketDataCache {
    capacity: usize,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: HashMap<CacheKey, Entry>,
    tick: u64,
}

impl MarketDataCache {
    pub fn new(capacity: usize, ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            capacity: capacity.max(1),
            ttl,
            clock,
            entries: HashMap::new(),
            tick: 0,
        }
    }

    fn key(ticker: &str, period: Period) -> CacheKey {
        (ticker.trim().to_uppercase(), period)
    }

    /// Fresh entry for the key; expired entries are removed on lookup
    pub fn get(&mut self, ticker: &str, period: Period) -> Option<Arc<PriceHistory>> {
        let key = Self::key(ticker, period);
        let now = self.clock.now();

        let expired = self
            .entries
            .get(&key)
            .is_some_and(|entry| now.saturating_sub(entry.inserted_at) >= self.ttl);
        if expired {
            tracing::debug!(ticker = %key.0, %period, "Cache entry expired");
            self.entries.remove(&key);
            return None;
        }

        self.tick += 1;
        let tick = self.tick;
        self.entries.get_mut(&key).map(|entry| {
            entry.last_used = tick;
            Arc::clone(&entry.history)
        })
    }

    pub fn insert(&mut self, ticker: &str, period: Period, history: Arc<PriceHistory>) {
        let key = Self::key(ticker, period);

        if !self.entries.contains_key(&key) && self.entries.len() >= self.capacity {
            self.evict_lru();
        }

        self.tick += 1;
        self.entries.insert(
            key,
            Entry {
                history,
                inserted_at: self.clock.now(),
                last_used: self.tick,
            },
        );
    }

    fn evict_lru(&mut self) {
        let oldest = self
            .entries
            .iter()
            .min_by_key(|(_, entry)| entry.last_used)
            .map(|(key, _)| key.clone());

        if let Some(key) = oldest {
            tracing::debug!(ticker = %key.0, period = %key.1, "Evicting least recently used entry");
            self.entries.remove(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A client wrapped with a shared cache.
///
/// Errors are never cached. Concurrent misses for the same key may each
/// reach the inner client.
pub struct CachedMarketData {
    inner: Arc<dyn MarketDataClient>,
    cache: Mutex<MarketDataCache>,
}

impl CachedMarketData {
    pub fn new(inner: Arc<dyn MarketDataClient>, cache: MarketDataCache) -> Self {
        Self {
            inner,
            cache: Mutex::new(cache),
        }
    }

    fn with_cache<T>(&self, f: impl FnOnce(&mut MarketDataCache) -> T) -> Result<T> {
        let mut cache = self
            .cache
            .lock()
            .map_err(|e| AdvisorError::MarketData(format!("cache lock poisoned: {e}")))?;
        Ok(f(&mut cache))
    }

    pub fn cached_entries(&self) -> Result<usize> {
        self.with_cache(|cache| cache.len())
    }
}

#[async_trait]
impl MarketDataClient for CachedMarketData {
    async fn history(&self, ticker: &str, period: Period) -> Result<PriceHistory> {
        if let Some(hit) = self.with_cache(|cache| cache.get(ticker, period))? {
            tracing::debug!(%ticker, %period, "Market data cache hit");
            return Ok((*hit).clone());
        }

        let history = self.inner.history(ticker, period).await?;
        let shared = Arc::new(history.clone());
        self.with_cache(|cache| cache.insert(ticker, period, shared))?;

        Ok(history)
    }

    fn name(&self) -> &str {
        self.inner.name()
    }
}
