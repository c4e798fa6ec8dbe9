use color_eyre::Result;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::query::QueryResult;

/// Subdirectory of the cache dir holding rolling log files
pub const LOG_DIR: &str = "logs";

/// Manages cache directory and cache file operations
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) cache_dir: PathBuf,
}

impl CacheManager {
    /// Create a new CacheManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { cache_dir })
    }

    /// Create a CacheManager rooted at a custom directory (primarily for testing)
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Directory for log files; created on demand
    pub fn log_dir(&self) -> Result<PathBuf> {
        let dir = self.cache_dir.join(LOG_DIR);
        if !dir.exists() {
            fs::create_dir_all(&dir)?;
        }
        Ok(dir)
    }

    /// Remove all log files. Returns how many files were removed.
    pub fn clear_all(&self) -> Result<usize> {
        let dir = self.cache_dir.join(LOG_DIR);
        if !dir.exists() {
            return Ok(0);
        }
        let mut removed = 0;
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() {
                match fs::remove_file(&path) {
                    Ok(()) => removed += 1,
                    Err(e) => eprintln!("Warning: Could not remove {}: {}", path.display(), e),
                }
            }
        }
        Ok(removed)
    }
}

struct CachedResult {
    stored_at: Instant,
    result: QueryResult,
}

/// In-memory memo of query results keyed by the literal SQL text.
///
/// Entries expire after `ttl`; `invalidate` and `clear` drop them early.
pub struct QueryCache {
    ttl: Duration,
    entries: HashMap<String, CachedResult>,
    hits: u64,
    misses: u64,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh result for `sql`, counting the lookup as a hit or miss.
    pub fn get(&mut self, sql: &str) -> Option<QueryResult> {
        let fresh = self
            .entries
            .get(sql)
            .filter(|e| e.stored_at.elapsed() < self.ttl)
            .map(|e| e.result.clone());
        match fresh {
            Some(result) => {
                self.hits += 1;
                Some(result)
            }
            None => {
                self.entries.remove(sql);
                self.misses += 1;
                None
            }
        }
    }

    pub fn insert(&mut self, sql: &str, result: QueryResult) {
        self.entries.insert(
            sql.to_string(),
            CachedResult {
                stored_at: Instant::now(),
                result,
            },
        );
    }

    pub fn invalidate(&mut self, sql: &str) -> bool {
        self.entries.remove(sql).is_some()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn result() -> QueryResult {
        QueryResult::new(df!("a" => &[1i64]).unwrap())
    }

    #[test]
    fn hit_within_ttl() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        assert!(cache.get("SELECT 1").is_none());
        cache.insert("SELECT 1", result());
        assert!(cache.get("SELECT 1").is_some());
        assert_eq!(cache.hits(), 1);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn keyed_by_literal_text() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert("SELECT 1", result());
        assert!(cache.get("select 1").is_none());
        assert!(cache.get("SELECT 1 ").is_none());
    }

    #[test]
    fn zero_ttl_always_misses() {
        let mut cache = QueryCache::new(Duration::ZERO);
        cache.insert("SELECT 1", result());
        assert!(cache.get("SELECT 1").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn invalidate_and_clear() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.insert("a", result());
        cache.insert("b", result());
        assert!(cache.invalidate("a"));
        assert!(!cache.invalidate("a"));
        assert_eq!(cache.len(), 1);
        cache.clear();
        assert!(cache.get("b").is_none());
    }

    #[test]
    fn clear_all_removes_log_files() {
        let dir = tempfile::tempdir().unwrap();
        let manager = CacheManager::with_dir(dir.path().to_path_buf());
        assert_eq!(manager.clear_all().unwrap(), 0);
        let logs = manager.log_dir().unwrap();
        fs::write(logs.join("crimeboard.log.2026-01-01"), "x").unwrap();
        fs::write(logs.join("crimeboard.log.2026-01-02"), "y").unwrap();
        assert_eq!(manager.clear_all().unwrap(), 2);
        assert_eq!(fs::read_dir(&logs).unwrap().count(), 0);
    }
}
