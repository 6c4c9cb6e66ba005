//! TTL cache for upstream JSON documents.
//!
//! Entries are keyed by request URL and are served until they are older than
//! the configured TTL. Expiry is checked lazily on lookup; expired entries are
//! only dropped when an insert would push the map past its ceiling.

use crate::error::{ApiSignal, FetchError};
use crate::source::github::{get_json, Fetch};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;

/// Source of "now" for expiry checks.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    offset: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut offset = self.offset.lock().unwrap_or_else(|e| e.into_inner());
        *offset += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.offset.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    data: Value,
    stored_at: Instant,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheOptions {
    pub ttl: Duration,
    pub max_entries: usize,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_entries: 256,
        }
    }
}

pub struct TtlCache<F> {
    fetcher: F,
    clock: Arc<dyn Clock>,
    options: CacheOptions,
    entries: Mutex<HashMap<String, CacheEntry>>,
    /// One async lock per URL so overlapping lookups share a single request.
    in_flight: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    signals: Option<UnboundedSender<ApiSignal>>,
    requests: AtomicU64,
}

impl<F: Fetch> TtlCache<F> {
    pub fn new(fetcher: F, options: CacheOptions) -> Self {
        Self::with_clock(fetcher, options, Arc::new(SystemClock))
    }

    pub fn with_clock(fetcher: F, options: CacheOptions, clock: Arc<dyn Clock>) -> Self {
        Self {
            fetcher,
            clock,
            options: CacheOptions {
                max_entries: options.max_entries.max(1),
                ..options
            },
            entries: Mutex::new(HashMap::new()),
            in_flight: Mutex::new(HashMap::new()),
            signals: None,
            requests: AtomicU64::new(0),
        }
    }

    /// Deliver 401/403 conditions to `tx`.
    pub fn with_signals(mut self, tx: UnboundedSender<ApiSignal>) -> Self {
        self.signals = Some(tx);
        self
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    pub fn ttl(&self) -> Duration {
        self.options.ttl
    }

    /// Number of requests actually sent upstream.
    pub fn request_count(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Return the cached document for `url`, fetching it when absent or
    /// expired. Every failure ends up as `None`.
    pub async fn get_or_fetch(&self, url: &str) -> Option<Value> {
        if let Some(data) = self.lookup(url) {
            tracing::trace!("Cache hit for {}", url);
            return Some(data);
        }

        let gate = self.gate(url);
        let result = {
            let _guard = gate.lock().await;
            self.fill(url).await
        };
        self.release_gate(url, &gate);
        result
    }

    /// Runs with the URL's gate held.
    async fn fill(&self, url: &str) -> Option<Value> {
        // Someone else may have filled the entry while we waited
        if let Some(data) = self.lookup(url) {
            tracing::trace!("Cache filled by concurrent request for {}", url);
            return Some(data);
        }

        let started = self.clock.now();
        self.requests.fetch_add(1, Ordering::Relaxed);

        match get_json(&self.fetcher, url).await {
            Ok(data) => {
                self.store(url, data.clone(), started);
                Some(data)
            }
            Err(e) => {
                self.report(&e);
                None
            }
        }
    }

    fn lookup(&self, url: &str) -> Option<Value> {
        let now = self.clock.now();
        let entries = self.entries();
        entries
            .get(url)
            .filter(|entry| now.saturating_duration_since(entry.stored_at) < self.options.ttl)
            .map(|entry| entry.data.clone())
    }

    fn store(&self, url: &str, data: Value, stored_at: Instant) {
        let mut entries = self.entries();

        if !entries.contains_key(url) && entries.len() >= self.options.max_entries {
            let now = self.clock.now();
            let ttl = self.options.ttl;
            entries.retain(|_, e| now.saturating_duration_since(e.stored_at) < ttl);

            while entries.len() >= self.options.max_entries {
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, e)| e.stored_at)
                    .map(|(k, _)| k.clone());
                match oldest {
                    Some(key) => {
                        tracing::debug!("Evicting cached response for {}", key);
                        entries.remove(&key);
                    }
                    None => break,
                }
            }
        }

        entries.insert(url.to_string(), CacheEntry { data, stored_at });
    }

    fn gate(&self, url: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        in_flight
            .entry(url.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Drop the gate for `url` once nobody but the map and `gate` hold it.
    fn release_gate(&self, url: &str, gate: &Arc<tokio::sync::Mutex<()>>) {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let idle = in_flight
            .get(url)
            .is_some_and(|held| Arc::ptr_eq(held, gate) && Arc::strong_count(gate) == 2);
        if idle {
            in_flight.remove(url);
        }
    }

    fn report(&self, error: &FetchError) {
        match error.signal() {
            Some(ApiSignal::AuthInvalid) => tracing::error!("{}", error),
            Some(ApiSignal::RateLimited) => tracing::warn!("{}", error),
            None => tracing::warn!("Fetch error: {}", error),
        }

        if let (Some(signal), Some(tx)) = (error.signal(), &self.signals) {
            // A closed receiver just means nobody is listening anymore
            let _ = tx.send(signal);
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}
