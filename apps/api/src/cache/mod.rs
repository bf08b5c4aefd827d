//! Enrichment cache: fingerprinted, TTL-bound, advisory.
//!
//! Backends implement [`CacheStore`] over plain strings. [`EnrichmentCache`]
//! layers typed JSON on top and swallows backend failures so a broken cache
//! only ever costs a live fetch.

pub mod cached_source;
pub mod memory;
pub mod redis_store;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, warn};

use crate::source::{SearchFilters, SourceQuery};

pub use cached_source::CachedSource;
pub use memory::MemoryStore;
pub use redis_store::RedisStore;

#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache backend error: {0}")]
    Backend(String),

    #[error("cache codec error: {0}")]
    Codec(#[from] serde_json::Error),
}

impl From<redis::RedisError> for CacheError {
    fn from(e: redis::RedisError) -> Self {
        CacheError::Backend(e.to_string())
    }
}

/// Key-value storage with per-entry TTL.
#[async_trait]
pub trait CacheStore: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Returns the stored value, or `None` if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    async fn put(&self, key: &str, value: String, ttl: Duration) -> Result<(), CacheError>;

    /// Removes expired entries. Backends that expire on their own report 0.
    async fn purge_expired(&self) -> usize {
        0
    }
}

/// Upper bound on a single cache call before it counts as a miss.
pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_secs(2);

// ────────────────────────────────────────────────────────────────────────────
// Typed advisory wrapper
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct EnrichmentCache {
    store: Arc<dyn CacheStore>,
    ttl: Duration,
    op_timeout: Duration,
}

impl EnrichmentCache {
    pub fn new(store: Arc<dyn CacheStore>, ttl: Duration) -> Self {
        Self {
            store,
            ttl,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_op_timeout(mut self, op_timeout: Duration) -> Self {
        self.op_timeout = op_timeout;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Looks up and decodes an entry. Backend, decode and timeout failures are
    /// logged and reported as a miss.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let lookup = tokio::time::timeout(self.op_timeout, self.store.get(key))
            .await
            .unwrap_or_else(|_| Err(self.timed_out()));
        let raw = match lookup {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("cache miss: {key}");
                return None;
            }
            Err(e) => {
                warn!("{} cache read failed for {key}, treating as miss: {e}", self.store.backend());
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!("cache hit: {key}");
                Some(value)
            }
            Err(e) => {
                warn!("discarding undecodable cache entry {key}: {e}");
                None
            }
        }
    }

    pub async fn put<T: Serialize>(&self, key: &str, value: &T) {
        self.put_with_ttl(key, value, self.ttl).await;
    }

    /// Stores an entry. Failures are logged and otherwise ignored.
    pub async fn put_with_ttl<T: Serialize>(&self, key: &str, value: &T, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("not caching {key}: {e}");
                return;
            }
        };
        let write = tokio::time::timeout(self.op_timeout, self.store.put(key, raw, ttl))
            .await
            .unwrap_or_else(|_| Err(self.timed_out()));
        if let Err(e) = write {
            warn!("{} cache write failed for {key}: {e}", self.store.backend());
        }
    }

    fn timed_out(&self) -> CacheError {
        CacheError::Backend(format!("no response within {:?}", self.op_timeout))
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Fingerprints
// ────────────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct CanonicalSearch<'a> {
    provider: &'a str,
    title: Option<String>,
    location: Option<String>,
    skills: Vec<String>,
    company: Option<String>,
    limit: usize,
    offset: usize,
}

fn canonical_text(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .filter(|v| !v.is_empty())
}

/// Stable key for a search: equivalent filters (case, spacing, skill order)
/// hash to the same digest.
pub fn search_fingerprint(provider: &str, filters: &SearchFilters) -> String {
    let mut skills: Vec<String> = filters
        .skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect();
    skills.sort();
    skills.dedup();

    let canonical = CanonicalSearch {
        provider,
        title: canonical_text(&filters.title),
        location: canonical_text(&filters.location),
        skills,
        company: canonical_text(&filters.company),
        limit: filters.limit,
        offset: filters.offset,
    };
    // Serializing a plain struct of strings and integers cannot fail.
    let bytes = serde_json::to_vec(&canonical).unwrap_or_default();
    format!("search:{}", blake3::hash(&bytes).to_hex())
}

pub fn profile_fingerprint(provider: &str, identity: &str) -> String {
    let canonical = format!("{provider}\n{}", identity.trim().trim_end_matches('/'));
    format!("profile:{}", blake3::hash(canonical.as_bytes()).to_hex())
}

pub fn fingerprint(provider: &str, query: &SourceQuery) -> String {
    match query {
        SourceQuery::Search(filters) => search_fingerprint(provider, filters),
        SourceQuery::Profile { identity } => profile_fingerprint(provider, identity),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    /// A store whose every call fails.
    struct BrokenStore;

    #[async_trait]
    impl CacheStore for BrokenStore {
        fn backend(&self) -> &'static str {
            "broken"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }

        async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            Err(CacheError::Backend("connection refused".to_string()))
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Entry {
        value: u32,
    }

    fn filters(title: &str, skills: &[&str]) -> SearchFilters {
        SearchFilters {
            title: Some(title.to_string()),
            location: None,
            skills: skills.iter().map(|s| s.to_string()).collect(),
            company: None,
            limit: 25,
            offset: 0,
        }
    }

    #[test]
    fn test_search_fingerprint_is_canonical() {
        let a = search_fingerprint("p", &filters("ML  Engineer", &["PyTorch", "Python"]));
        let b = search_fingerprint("p", &filters("ml engineer", &["python", " pytorch"]));
        assert_eq!(a, b);
        assert!(a.starts_with("search:"));

        let other_provider = search_fingerprint("q", &filters("ml engineer", &["python", "pytorch"]));
        let other_skills = search_fingerprint("p", &filters("ml engineer", &["python"]));
        assert_ne!(a, other_provider);
        assert_ne!(a, other_skills);
    }

    #[test]
    fn test_profile_fingerprint_ignores_trailing_slash() {
        assert_eq!(
            profile_fingerprint("p", "https://linkedin.com/in/a/"),
            profile_fingerprint("p", "https://linkedin.com/in/a")
        );
        assert_ne!(
            profile_fingerprint("p", "https://linkedin.com/in/a"),
            profile_fingerprint("p", "https://linkedin.com/in/b")
        );
    }

    #[tokio::test]
    async fn test_broken_backend_degrades_to_miss() {
        let cache = EnrichmentCache::new(Arc::new(BrokenStore), Duration::from_secs(60));
        cache.put("k", &Entry { value: 1 }).await;
        assert_eq!(cache.get::<Entry>("k").await, None);
    }

    #[tokio::test]
    async fn test_typed_round_trip_and_bad_entry() {
        let store = Arc::new(MemoryStore::new());
        let cache = EnrichmentCache::new(store.clone(), Duration::from_secs(60));
        cache.put("k", &Entry { value: 7 }).await;
        assert_eq!(cache.get::<Entry>("k").await, Some(Entry { value: 7 }));

        store
            .put("bad", "{not json".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get::<Entry>("bad").await, None);
    }

    /// Backend that accepts the call and never answers.
    struct HungStore;

    #[async_trait]
    impl CacheStore for HungStore {
        fn backend(&self) -> &'static str {
            "hung"
        }

        async fn get(&self, _key: &str) -> Result<Option<String>, CacheError> {
            std::future::pending().await
        }

        async fn put(&self, _key: &str, _value: String, _ttl: Duration) -> Result<(), CacheError> {
            std::future::pending().await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_backend_degrades_to_miss_within_op_timeout() {
        let cache = EnrichmentCache::new(Arc::new(HungStore), Duration::from_secs(60))
            .with_op_timeout(Duration::from_millis(250));
        let started = tokio::time::Instant::now();

        cache.put("k", &Entry { value: 1 }).await;
        assert_eq!(cache.get::<Entry>("k").await, None);
        assert!(started.elapsed() <= Duration::from_millis(600));
    }
}
