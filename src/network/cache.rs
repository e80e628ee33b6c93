//! Two-tier response cache: a DashMap memory tier over one JSON file per key.
//!
//! Entries carry the wall-clock time they were written and are valid while
//! `now - timestamp < max_age`. Unreadable cache files count as misses.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

/// Digest of a method name plus its sorted, normalized parameters.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    /// `serde_json::Map` is ordered by key, so the digest does not depend
    /// on the order in which parameters were inserted.
    pub fn new(method: &str, params: &Map<String, Value>) -> Self {
        let canonical = format!("{method}_{}", Value::Object(params.clone()));
        Self(hex::encode(Sha256::digest(canonical.as_bytes())))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One cached payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Seconds since the Unix epoch.
    pub timestamp: f64,
    pub data: Value,
}

impl CacheEntry {
    fn is_fresh(&self, max_age: Duration) -> bool {
        now_secs() - self.timestamp < max_age.as_secs_f64()
    }
}

/// Memory tier in front of a directory of per-key files.
#[derive(Debug)]
pub struct ResponseCache {
    memory: DashMap<CacheKey, CacheEntry>,
    dir: PathBuf,
    max_age: Duration,
}

impl ResponseCache {
    /// Open (creating if needed) a cache rooted at `dir`.
    pub fn open(dir: &Path, max_age: Duration) -> Self {
        if let Err(e) = std::fs::create_dir_all(dir) {
            tracing::warn!(dir = %dir.display(), error = %e, "cannot create cache directory");
        }
        Self {
            memory: DashMap::new(),
            dir: dir.to_path_buf(),
            max_age,
        }
    }

    fn file_for(&self, key: &CacheKey) -> PathBuf {
        self.dir.join(format!("{}.json", key.as_str()))
    }

    /// Fresh payload for `key`, checking memory then disk.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        if let Some(entry) = self.memory.get(key) {
            if entry.is_fresh(self.max_age) {
                tracing::debug!(key = key.as_str(), "cache hit (memory)");
                return Some(entry.data.clone());
            }
        }

        let path = self.file_for(key);
        let content = std::fs::read_to_string(&path).ok()?;
        let entry: CacheEntry = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "ignoring unreadable cache file");
                return None;
            }
        };
        if !entry.is_fresh(self.max_age) {
            return None;
        }
        tracing::debug!(key = key.as_str(), "cache hit (disk)");
        let data = entry.data.clone();
        self.memory.insert(key.clone(), entry);
        Some(data)
    }

    /// Store `data` in both tiers. A failed disk write only loses persistence.
    pub fn put(&self, key: &CacheKey, data: Value) {
        let entry = CacheEntry {
            timestamp: now_secs(),
            data,
        };
        let path = self.file_for(key);
        match serde_json::to_string_pretty(&entry) {
            Ok(json) => {
                if let Err(e) = std::fs::write(&path, json) {
                    tracing::warn!(path = %path.display(), error = %e, "cache write failed");
                }
            }
            Err(e) => tracing::warn!(error = %e, "cache entry not serializable"),
        }
        self.memory.insert(key.clone(), entry);
    }

    /// Entries currently held in memory.
    pub fn memory_len(&self) -> usize {
        self.memory.len()
    }

    pub fn max_age(&self) -> Duration {
        self.max_age
    }
}

fn now_secs() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64())
        .unwrap_or(0.0)
}
