//! Fingerprint- and TTL-validated report cache
//!
//! An explicit, injectable instance; never a hidden singleton. The
//! in-memory tier is bounded with least-recently-used eviction behind a
//! single writer lock. A fingerprint mismatch is always "not found",
//! never "stale-but-usable". The optional persistent tier is a JSON blob
//! of records keyed by fingerprint hex, loaded and saved only when the
//! caller asks.

use crate::aggregate::{QualityGate, StandardsConfidenceReport};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::RwLock;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { capacity: 64, ttl: Duration::from_secs(24 * 60 * 60) }
    }
}

/// The persisted record format: {fingerprint, report, created_at,
/// ttl_seconds}, keyed by fingerprint hex string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub fingerprint: String,
    pub report: StandardsConfidenceReport,
    pub created_at: DateTime<Utc>,
    pub ttl_seconds: u64,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        let age = now.signed_duration_since(self.created_at);
        age.num_seconds() >= 0 && (age.num_seconds() as u64) < self.ttl_seconds
    }
}

#[derive(Debug)]
struct StoredEntry {
    entry: CacheEntry,
    last_access: u64,
}

#[derive(Debug, Default)]
struct CacheInner {
    entries: HashMap<String, StoredEntry>,
    tick: u64,
}

#[derive(Debug)]
pub struct CacheManager {
    config: CacheConfig,
    inner: RwLock<CacheInner>,
}

impl CacheManager {
    pub fn new(config: CacheConfig) -> Self {
        Self { config, inner: RwLock::new(CacheInner::default()) }
    }

    pub fn len(&self) -> usize {
        self.inner.read().expect("cache lock poisoned").entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a report by fingerprint. A hit requires an exact
    /// fingerprint match and an unexpired entry; expired entries are
    /// dropped on the spot.
    pub fn get(&self, fingerprint: &str) -> Option<StandardsConfidenceReport> {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;

        let fresh = match inner.entries.get_mut(fingerprint) {
            Some(stored) => {
                if stored.entry.is_fresh(Utc::now()) {
                    stored.last_access = tick;
                    true
                } else {
                    false
                }
            }
            None => {
                debug!("cache miss for {}", fingerprint);
                return None;
            }
        };

        if fresh {
            debug!("cache hit for {}", fingerprint);
            inner.entries.get(fingerprint).map(|stored| stored.entry.report.clone())
        } else {
            debug!("cache entry for {} expired", fingerprint);
            inner.entries.remove(fingerprint);
            None
        }
    }

    /// Store a report, evicting the least-recently-accessed entry when
    /// the table is full.
    pub fn put(&self, fingerprint: String, report: StandardsConfidenceReport) {
        let mut inner = self.inner.write().expect("cache lock poisoned");
        inner.tick += 1;
        let tick = inner.tick;

        let entry = CacheEntry {
            fingerprint: fingerprint.clone(),
            report,
            created_at: Utc::now(),
            ttl_seconds: self.config.ttl.as_secs(),
        };
        inner.entries.insert(fingerprint, StoredEntry { entry, last_access: tick });

        while inner.entries.len() > self.config.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, stored)| stored.last_access)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    debug!("evicting least-recently-used cache entry {}", key);
                    inner.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Most recent usable entry for a primary language; the Level 2
    /// degradation path consults this when the fresh run can't be
    /// trusted. Gate must be MEDIUM or better.
    pub fn most_recent_for_language(&self, language: &str) -> Option<StandardsConfidenceReport> {
        let inner = self.inner.read().expect("cache lock poisoned");
        let now = Utc::now();
        inner
            .entries
            .values()
            .filter(|stored| stored.entry.is_fresh(now))
            .filter(|stored| {
                stored.entry.report.primary_language.as_deref() == Some(language)
                    && matches!(stored.entry.report.gate, QualityGate::High | QualityGate::Medium)
            })
            .max_by_key(|stored| stored.entry.created_at)
            .map(|stored| stored.entry.report.clone())
    }

    /// Snapshot of all live entries, for the persistent tier.
    pub fn to_persisted(&self) -> Vec<CacheEntry> {
        let inner = self.inner.read().expect("cache lock poisoned");
        let now = Utc::now();
        let mut entries: Vec<CacheEntry> = inner
            .entries
            .values()
            .filter(|stored| stored.entry.is_fresh(now))
            .map(|stored| stored.entry.clone())
            .collect();
        entries.sort_by(|a, b| a.fingerprint.cmp(&b.fingerprint));
        entries
    }

    /// Load records from a serialized blob. Corrupt blobs are ignored
    /// with a warning; expired records are dropped.
    pub fn load_persisted(&self, blob: &str) {
        let entries: Vec<CacheEntry> = match serde_json::from_str(blob) {
            Ok(entries) => entries,
            Err(err) => {
                warn!("persisted cache blob unreadable, starting cold: {}", err);
                return;
            }
        };
        let now = Utc::now();
        for entry in entries {
            if entry.is_fresh(now) {
                let mut inner = self.inner.write().expect("cache lock poisoned");
                inner.tick += 1;
                let tick = inner.tick;
                inner
                    .entries
                    .insert(entry.fingerprint.clone(), StoredEntry { entry, last_access: tick });
            }
        }
        // respect the capacity bound even for loaded data
        let mut inner = self.inner.write().expect("cache lock poisoned");
        while inner.entries.len() > self.config.capacity {
            let oldest = inner
                .entries
                .iter()
                .min_by_key(|(_, stored)| stored.last_access)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    inner.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    pub async fn save_to_file(&self, path: &Path) -> Result<(), CacheError> {
        let content = serde_json::to_string_pretty(&self.to_persisted())?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }

    pub async fn load_from_file(&self, path: &Path) -> Result<(), CacheError> {
        let content = tokio::fs::read_to_string(path).await?;
        self.load_persisted(&content);
        Ok(())
    }
}

impl Default for CacheManager {
    fn default() -> Self {
        Self::new(CacheConfig::default())
    }
}
