use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::CacheError;
use crate::key::CacheKey;
use crate::memory::MemoryStore;

/// A string key/value backend with per-entry expiry.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Short backend name used in log fields.
    fn name(&self) -> &'static str;

    /// Fetch a live entry. Expired entries are reported as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Store `value` for `ttl`. `ttl` is never zero; [`Cache`] filters that.
    async fn set(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;
}

/// Backend that stores nothing. Used when no cache is configured or the
/// configured one could not be reached at startup.
#[derive(Debug, Default, Clone, Copy)]
pub struct DisabledStore;

#[async_trait]
impl CacheStore for DisabledStore {
    fn name(&self) -> &'static str {
        "disabled"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
        Ok(None)
    }

    async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
        Ok(())
    }

    async fn delete(&self, _key: &str) -> Result<(), CacheError> {
        Ok(())
    }
}

/// Typed, failure-tolerant facade over a [`CacheStore`].
///
/// Every method is infallible from the caller's side: backend errors and
/// undecodable entries are logged at `warn` and reported as a miss (or a
/// dropped write).
#[derive(Clone)]
pub struct Cache {
    store: Arc<dyn CacheStore>,
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("backend", &self.store.name())
            .finish()
    }
}

impl Cache {
    #[must_use]
    pub fn new(store: Arc<dyn CacheStore>) -> Self {
        Self { store }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self::new(Arc::new(DisabledStore))
    }

    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryStore::new()))
    }

    #[must_use]
    pub fn backend(&self) -> &'static str {
        self.store.name()
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let raw = match self.store.get(key.as_str()).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                tracing::debug!(key = %key, backend = self.backend(), "cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, backend = self.backend(), error = %e, "cache read failed; treating as miss");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                tracing::debug!(key = %key, backend = self.backend(), "cache hit");
                Some(value)
            }
            Err(source) => {
                let e = CacheError::Codec {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!(error = %e, "discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store `value` for `ttl`. A zero `ttl` stores nothing.
    pub async fn set<T: Serialize>(&self, key: &CacheKey, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            tracing::debug!(key = %key, "ttl is zero; not caching");
            return;
        }

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(source) => {
                let e = CacheError::Codec {
                    key: key.to_string(),
                    source,
                };
                tracing::warn!(error = %e, "cache write skipped");
                return;
            }
        };

        if let Err(e) = self.store.set(key.as_str(), raw, ttl).await {
            tracing::warn!(key = %key, backend = self.backend(), error = %e, "cache write failed");
        } else {
            tracing::debug!(key = %key, ttl_secs = ttl.as_secs(), "cache write");
        }
    }

    pub async fn delete(&self, key: &CacheKey) {
        if let Err(e) = self.store.delete(key.as_str()).await {
            tracing::warn!(key = %key, backend = self.backend(), error = %e, "cache delete failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::ManualClock;

    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        name: String,
        price: i64,
    }

    fn key(name: &str) -> CacheKey {
        CacheKey::builder("test").segment(name).build()
    }

    struct FailingStore;

    #[async_trait]
    impl CacheStore for FailingStore {
        fn name(&self) -> &'static str {
            "failing"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Unavailable("connection refused".to_owned()))
        }

        async fn set(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_owned()))
        }

        async fn delete(&self, _key: &str) -> Result<(), CacheError> {
            Err(CacheError::Unavailable("connection refused".to_owned()))
        }
    }

    #[tokio::test]
    async fn round_trips_typed_values() {
        let cache = Cache::in_memory();
        let entry = Entry {
            name: "Fone".to_owned(),
            price: 3590,
        };
        cache.set(&key("a"), &entry, Duration::from_secs(60)).await;
        assert_eq!(cache.get::<Entry>(&key("a")).await, Some(entry));
    }

    #[tokio::test]
    async fn zero_ttl_is_not_stored() {
        let cache = Cache::in_memory();
        cache.set(&key("a"), &1_u32, Duration::ZERO).await;
        assert_eq!(cache.get::<u32>(&key("a")).await, None);
    }

    #[tokio::test]
    async fn entry_expires_after_ttl() {
        let clock = ManualClock::new();
        let cache = Cache::new(Arc::new(MemoryStore::with_clock(clock.clone())));
        cache.set(&key("a"), &7_u32, Duration::from_secs(120)).await;

        clock.advance(Duration::from_secs(119));
        assert_eq!(cache.get::<u32>(&key("a")).await, Some(7));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.get::<u32>(&key("a")).await, None);
    }

    #[tokio::test]
    async fn undecodable_entry_is_a_miss() {
        let store = Arc::new(MemoryStore::new());
        store
            .set("test:a", "not json".to_owned(), Duration::from_secs(60))
            .await
            .unwrap();
        let cache = Cache::new(store);
        assert_eq!(cache.get::<Entry>(&key("a")).await, None);
    }

    #[tokio::test]
    async fn backend_failures_are_swallowed() {
        let cache = Cache::new(Arc::new(FailingStore));
        cache.set(&key("a"), &1_u32, Duration::from_secs(60)).await;
        assert_eq!(cache.get::<u32>(&key("a")).await, None);
        cache.delete(&key("a")).await;
    }

    #[tokio::test]
    async fn disabled_cache_always_misses() {
        let cache = Cache::disabled();
        cache.set(&key("a"), &1_u32, Duration::from_secs(60)).await;
        assert_eq!(cache.get::<u32>(&key("a")).await, None);
        assert_eq!(cache.backend(), "disabled");
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let cache = Cache::in_memory();
        cache.set(&key("a"), &1_u32, Duration::from_secs(60)).await;
        cache.delete(&key("a")).await;
        assert_eq!(cache.get::<u32>(&key("a")).await, None);
    }
}
