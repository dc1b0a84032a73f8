// Search Cache Service
// File-backed query -> result-set cache with time-based expiration

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;
use thiserror::Error;
use tracing::debug;

use crate::models::EvidenceCandidate;

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("cache I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("cache serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheRecord {
    /// Unix seconds at write time.
    pub timestamp: i64,
    pub results: Vec<EvidenceCandidate>,
}

/// Whole-file JSON store keyed by the exact query string. Reads are lock-free;
/// writes serialize the full map under a process-wide mutex. Keys are cheap
/// recomputable query strings, so lost updates between two concurrent writers
/// are tolerated.
pub struct SearchCache {
    cache_file: PathBuf,
    expiration_secs: i64,
    write_lock: Mutex<()>,
}

impl SearchCache {
    pub fn new(cache_file: PathBuf, expiration_hours: i64) -> Self {
        Self {
            cache_file,
            expiration_secs: expiration_hours * 3600,
            write_lock: Mutex::new(()),
        }
    }

    /// Get default cache file path
    pub fn default_cache_file() -> Option<PathBuf> {
        dirs::cache_dir().map(|p| p.join("veritext").join("search_cache.json"))
    }

    /// Load the whole store; a missing, unreadable or corrupt file is an empty store.
    fn load_all(&self) -> HashMap<String, CacheRecord> {
        let content = match fs::read_to_string(&self.cache_file) {
            Ok(c) => c,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&content) {
            Ok(map) => map,
            Err(e) => {
                debug!("cache file unreadable, treating as empty: {}", e);
                HashMap::new()
            }
        }
    }

    /// Return the cached result set if present and fresh. Stale entries are
    /// not evicted on read; they are superseded by the next write.
    pub fn get(&self, query: &str) -> Option<Vec<EvidenceCandidate>> {
        let cache = self.load_all();
        let record = cache.get(query)?;
        let age = chrono::Utc::now().timestamp() - record.timestamp;
        if age < self.expiration_secs {
            Some(record.results.clone())
        } else {
            None
        }
    }

    /// Upsert the key with a fresh timestamp and persist the whole store.
    pub fn set(&self, query: &str, results: &[EvidenceCandidate]) -> Result<(), CacheError> {
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let mut cache = self.load_all();
        cache.insert(
            query.to_string(),
            CacheRecord {
                timestamp: chrono::Utc::now().timestamp(),
                results: results.to_vec(),
            },
        );

        if let Some(parent) = self.cache_file.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&cache)?;
        fs::write(&self.cache_file, content)?;
        Ok(())
    }
}
