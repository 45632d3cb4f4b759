//! Cache backend abstraction and the in-memory TTL implementation.

use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::Value;

use crate::search::core::config::CacheConfig;
use crate::search::core::errors::SearchResult;

/// Boxed future type for cache operations.
pub type CacheFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Cache backend over JSON values with per-entry TTL.
pub trait CacheBackend: Send + Sync {
    /// Get a value by key, honoring TTL expiry.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn get(&self, key: &str) -> CacheFuture<'_, SearchResult<Option<Value>>>;
    /// Set a value with a TTL in seconds.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> CacheFuture<'_, SearchResult<()>>;
    /// Delete a single key. Returns whether the key existed.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn delete(&self, key: &str) -> CacheFuture<'_, SearchResult<bool>>;
    /// Delete all keys matching a pattern (`prefix*` or an exact key).
    /// Returns the number of deleted entries.
    ///
    /// # Errors
    /// Returns an error if the backend cannot be reached.
    fn delete_pattern(&self, pattern: &str) -> CacheFuture<'_, SearchResult<usize>>;
}

/// Cache entry with TTL.
#[derive(Clone)]
struct CacheEntry {
    data: Value,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(data: Value, ttl: Duration) -> Self {
        Self {
            data,
            expires_at: Instant::now() + ttl,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() > self.expires_at
    }
}

/// Thread-safe in-memory cache backend with TTL expiry on read.
pub struct InMemoryCacheBackend {
    config: CacheConfig,
    entries: DashMap<String, CacheEntry>,
}

impl InMemoryCacheBackend {
    /// Create a new backend with the given configuration.
    #[must_use]
    pub fn new(config: CacheConfig) -> Self {
        Self {
            config,
            entries: DashMap::new(),
        }
    }

    /// Number of live (possibly expired, not yet collected) entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Remove expired entries.
    pub fn cleanup_expired(&self) {
        let expired_keys: Vec<String> = self
            .entries
            .iter()
            .filter(|entry| entry.is_expired())
            .map(|entry| entry.key().clone())
            .collect();

        for key in expired_keys {
            self.entries.remove(&key);
        }
    }

    /// Enforce the maximum entry limit by evicting expired, then arbitrary,
    /// entries.
    fn enforce_max_entries(&self) {
        if self.entries.len() >= self.config.max_entries {
            self.cleanup_expired();

            if self.entries.len() >= self.config.max_entries {
                let to_remove = self.entries.len() - self.config.max_entries + 1;
                let keys: Vec<String> = self
                    .entries
                    .iter()
                    .take(to_remove)
                    .map(|entry| entry.key().clone())
                    .collect();
                for key in keys {
                    self.entries.remove(&key);
                }
            }
        }
    }

    fn matches(pattern: &str, key: &str) -> bool {
        pattern.strip_suffix('*').map_or_else(
            || key == pattern,
            |prefix| key.starts_with(prefix),
        )
    }
}

impl CacheBackend for InMemoryCacheBackend {
    fn get(&self, key: &str) -> CacheFuture<'_, SearchResult<Option<Value>>> {
        let key = key.to_string();
        Box::pin(async move {
            if !self.config.enabled {
                return Ok(None);
            }

            Ok(self.entries.get(&key).and_then(|entry| {
                if entry.is_expired() {
                    drop(entry);
                    self.entries.remove(&key);
                    None
                } else {
                    Some(entry.data.clone())
                }
            }))
        })
    }

    fn set(&self, key: &str, value: Value, ttl_seconds: u64) -> CacheFuture<'_, SearchResult<()>> {
        let key = key.to_string();
        Box::pin(async move {
            if !self.config.enabled {
                return Ok(());
            }

            self.enforce_max_entries();
            let ttl = Duration::from_secs(ttl_seconds);
            self.entries.insert(key, CacheEntry::new(value, ttl));
            Ok(())
        })
    }

    fn delete(&self, key: &str) -> CacheFuture<'_, SearchResult<bool>> {
        let key = key.to_string();
        Box::pin(async move { Ok(self.entries.remove(&key).is_some()) })
    }

    fn delete_pattern(&self, pattern: &str) -> CacheFuture<'_, SearchResult<usize>> {
        let pattern = pattern.to_string();
        Box::pin(async move {
            let keys: Vec<String> = self
                .entries
                .iter()
                .filter(|entry| Self::matches(&pattern, entry.key()))
                .map(|entry| entry.key().clone())
                .collect();

            let mut removed = 0;
            for key in keys {
                if self.entries.remove(&key).is_some() {
                    removed += 1;
                }
            }
            Ok(removed)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn backend() -> InMemoryCacheBackend {
        InMemoryCacheBackend::new(CacheConfig::default())
    }

    #[tokio::test]
    async fn test_set_then_get_roundtrip() {
        let cache = backend();
        cache
            .set("search:abc", json!({"total": 2}), 60)
            .await
            .expect("set");
        let value = cache.get("search:abc").await.expect("get");
        assert_eq!(value, Some(json!({"total": 2})));
    }

    #[tokio::test]
    async fn test_expired_entry_is_dropped_on_read() {
        let cache = backend();
        cache.set("k", json!(1), 0).await.expect("set");
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert_eq!(cache.get("k").await.expect("get"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test]
    async fn test_delete_pattern_prefix() {
        let cache = backend();
        cache.set("search:a", json!(1), 60).await.expect("set");
        cache.set("search:b", json!(2), 60).await.expect("set");
        cache.set("embed:a", json!(3), 60).await.expect("set");

        let removed = cache.delete_pattern("search:*").await.expect("delete");
        assert_eq!(removed, 2);
        assert_eq!(cache.get("embed:a").await.expect("get"), Some(json!(3)));
    }

    #[tokio::test]
    async fn test_disabled_cache_stores_nothing() {
        let cache = InMemoryCacheBackend::new(CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        });
        cache.set("k", json!(1), 60).await.expect("set");
        assert_eq!(cache.get("k").await.expect("get"), None);
    }

    #[tokio::test]
    async fn test_enforce_max_entries_evicts() {
        let cache = InMemoryCacheBackend::new(CacheConfig {
            max_entries: 2,
            ..CacheConfig::default()
        });
        cache.set("a", json!(1), 60).await.expect("set");
        cache.set("b", json!(2), 60).await.expect("set");
        cache.set("c", json!(3), 60).await.expect("set");
        assert!(cache.len() <= 2);
    }
}
