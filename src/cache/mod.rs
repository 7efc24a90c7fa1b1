//! Content-addressed cache for per-file code metrics.
//!
//! Entries are keyed by path and validated against a blake3 hash of the
//! content, so only byte-identical input hits. Entries also expire after a
//! TTL, and inserting a new key into a full cache evicts the oldest entry.
//! One mutex guards the map; no I/O happens while it is held.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::analyzers::CodeMetrics;
use crate::config::CacheConfig;
use crate::core::{Error, Result};

/// Hex blake3 digest of `content`.
pub fn content_hash(content: &str) -> String {
    blake3::hash(content.as_bytes()).to_hex().to_string()
}

#[derive(Debug, Clone)]
struct CacheEntry {
    content_hash: String,
    inserted: Instant,
    metrics: CodeMetrics,
}

impl CacheEntry {
    fn check(&self, hash: &str, now: Instant, ttl: Duration) -> Result<()> {
        if self.content_hash != hash {
            return Err(Error::cache("content hash mismatch"));
        }
        if now.saturating_duration_since(self.inserted) > ttl {
            return Err(Error::cache("entry expired"));
        }
        Ok(())
    }
}

/// Why a lookup missed.
enum Miss {
    Absent,
    /// The entry exists but no longer applies and is dropped.
    Stale(Error),
}

/// Point-in-time cache statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CacheStats {
    pub size: usize,
    pub max_size: usize,
    pub hits: u64,
    pub misses: u64,
    /// `hits / (hits + misses)`, 0 before the first lookup.
    pub hit_rate: f64,
}

/// Thread-safe metrics cache.
pub struct AnalysisCache {
    entries: Mutex<HashMap<PathBuf, CacheEntry>>,
    ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl Default for AnalysisCache {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}

impl AnalysisCache {
    pub fn new(config: CacheConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl: Duration::from_secs(config.ttl_secs),
            max_entries: config.max_entries.max(1),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    /// Cached metrics for `path` if `content` is unchanged and fresh.
    pub fn get(&self, path: &Path, content: &str) -> Option<CodeMetrics> {
        self.lookup_at(path, &content_hash(content), Instant::now())
    }

    /// Store metrics computed from `content`.
    pub fn insert(&self, path: &Path, content: &str, metrics: CodeMetrics) {
        self.insert_at(path, content_hash(content), metrics, Instant::now());
    }

    /// Drop the entry for `path`.
    pub fn invalidate(&self, path: &Path) -> bool {
        self.entries.lock().remove(path).is_some()
    }

    pub fn clear(&self) {
        self.entries.lock().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let lookups = hits + misses;
        CacheStats {
            size: self.len(),
            max_size: self.max_entries,
            hits,
            misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                hits as f64 / lookups as f64
            },
        }
    }

    fn lookup_at(&self, path: &Path, hash: &str, now: Instant) -> Option<CodeMetrics> {
        let mut entries = self.entries.lock();
        let outcome = match entries.get(path) {
            None => Err(Miss::Absent),
            Some(entry) => entry
                .check(hash, now, self.ttl)
                .map(|()| entry.metrics.clone())
                .map_err(Miss::Stale),
        };

        match outcome {
            Ok(metrics) => {
                drop(entries);
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!(path = %path.display(), "Cache hit");
                Some(metrics)
            }
            Err(miss) => {
                if let Miss::Stale(reason) = &miss {
                    entries.remove(path);
                    debug!(path = %path.display(), %reason, "Dropped stale cache entry");
                }
                drop(entries);
                self.misses.fetch_add(1, Ordering::Relaxed);
                debug!(path = %path.display(), "Cache miss");
                None
            }
        }
    }

    fn insert_at(&self, path: &Path, hash: String, metrics: CodeMetrics, now: Instant) {
        let mut entries = self.entries.lock();
        if !entries.contains_key(path) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.inserted)
                .map(|(key, _)| key.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                debug!(path = %oldest.display(), "Evicted oldest cache entry");
            }
        }
        entries.insert(
            path.to_path_buf(),
            CacheEntry {
                content_hash: hash,
                inserted: now,
                metrics,
            },
        );
    }
}
