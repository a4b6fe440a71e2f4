//! In-memory quote cache with a single TTL.
//!
//! Entries are overwritten on refresh and only removed by [`QuoteCache::clear`].
//! The configured `max_entries` is a soft limit: crossing it is logged, but
//! nothing is evicted.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};

use crate::config::CacheConfig;
use crate::models::{Quote, Ticker};

/// A cached quote and the time it was stored.
#[derive(Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub quote: Quote,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn ticker(&self) -> &Ticker {
        self.quote.ticker()
    }

    /// Time since the entry was stored. Clock skew into the future counts as zero.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        now.signed_duration_since(self.cached_at)
            .to_std()
            .unwrap_or(Duration::ZERO)
    }

    /// Whether the entry is still valid: `now - cached_at < ttl`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        self.age_at(now) < ttl
    }
}

/// One row of [`QuoteCache::snapshot`].
#[derive(Clone, Debug)]
pub struct CacheSnapshotEntry {
    pub entry: CacheEntry,
    /// Age in minutes, rounded to one decimal.
    pub age_minutes: f64,
    /// Minutes until expiry, rounded to one decimal. Negative once stale.
    pub expires_in_minutes: f64,
}

/// Thread-safe TTL cache keyed by normalized ticker.
pub struct QuoteCache {
    entries: Mutex<HashMap<Ticker, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
}

impl QuoteCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: config.ttl,
            max_entries: config.max_entries,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Lock the entries mutex, recovering from poison if necessary.
    ///
    /// The map only ever holds complete entries, so a panic in another
    /// holder cannot leave it half-written.
    fn lock_entries(&self) -> MutexGuard<'_, HashMap<Ticker, CacheEntry>> {
        self.entries.lock().unwrap_or_else(|poisoned| {
            warn!("Quote cache mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Returns the entry for `ticker` if it is still fresh.
    pub fn get(&self, ticker: &Ticker) -> Option<CacheEntry> {
        self.get_at(ticker, Utc::now())
    }

    /// Like [`get`](Self::get) with an explicit clock reading.
    pub fn get_at(&self, ticker: &Ticker, now: DateTime<Utc>) -> Option<CacheEntry> {
        let entries = self.lock_entries();
        let entry = entries.get(ticker)?;

        if entry.is_fresh_at(now, self.ttl) {
            debug!("Quote cache hit for {}", ticker);
            Some(entry.clone())
        } else {
            debug!("Quote cache entry for {} is stale", ticker);
            None
        }
    }

    /// Store a quote, replacing any previous entry for its ticker.
    pub fn put(&self, quote: Quote) {
        self.put_at(quote, Utc::now());
    }

    /// Like [`put`](Self::put) with an explicit `cached_at`.
    pub fn put_at(&self, quote: Quote, cached_at: DateTime<Utc>) {
        let ticker = quote.ticker().clone();
        let mut entries = self.lock_entries();
        let previous = entries.insert(ticker.clone(), CacheEntry { quote, cached_at });

        if previous.is_none() && entries.len() == self.max_entries.saturating_add(1) {
            warn!(
                "Quote cache holds {} tickers, above the configured soft limit of {}",
                entries.len(),
                self.max_entries
            );
        }
        debug!("Cached quote for {}", ticker);
    }

    /// Remove every entry. Returns how many were removed.
    pub fn clear(&self) -> usize {
        let mut entries = self.lock_entries();
        let removed = entries.len();
        entries.clear();
        removed
    }

    /// Number of entries, stale ones included.
    pub fn len(&self) -> usize {
        self.lock_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All entries (stale ones included) with their age and remaining
    /// lifetime, sorted by ticker.
    pub fn snapshot(&self) -> Vec<CacheSnapshotEntry> {
        self.snapshot_at(Utc::now())
    }

    /// Like [`snapshot`](Self::snapshot) with an explicit clock reading.
    pub fn snapshot_at(&self, now: DateTime<Utc>) -> Vec<CacheSnapshotEntry> {
        let ttl_minutes = self.ttl.as_secs_f64() / 60.0;
        let mut rows: Vec<CacheSnapshotEntry> = self
            .lock_entries()
            .values()
            .map(|entry| {
                let age_minutes = entry.age_at(now).as_secs_f64() / 60.0;
                CacheSnapshotEntry {
                    entry: entry.clone(),
                    age_minutes: round_tenth(age_minutes),
                    expires_in_minutes: round_tenth(ttl_minutes - age_minutes),
                }
            })
            .collect();

        rows.sort_by(|a, b| a.entry.ticker().cmp(b.entry.ticker()));
        rows
    }
}

fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
