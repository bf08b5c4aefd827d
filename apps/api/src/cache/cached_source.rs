use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::cache::{fingerprint, EnrichmentCache};
use crate::models::candidate::CandidateRecord;
use crate::source::{SourceAdapter, SourceError, SourceQuery};

/// Wraps a source so a warm cache entry answers without touching the provider.
///
/// Only successful fetches are stored; errors always pass through uncached.
pub struct CachedSource {
    inner: Arc<dyn SourceAdapter>,
    cache: EnrichmentCache,
}

impl CachedSource {
    pub fn new(inner: Arc<dyn SourceAdapter>, cache: EnrichmentCache) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl SourceAdapter for CachedSource {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<CandidateRecord>, SourceError> {
        let key = fingerprint(self.inner.name(), query);

        if let Some(records) = self.cache.get::<Vec<CandidateRecord>>(&key).await {
            debug!("{}: served {} record(s) from cache", self.inner.name(), records.len());
            return Ok(records);
        }

        let records = self.inner.fetch(query).await?;
        self.cache.put(&key, &records).await;
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryStore;
    use crate::source::provider::tests::ScriptedTransport;
    use crate::source::provider::ProviderClient;
    use crate::source::rate_limit::RateLimiter;
    use crate::source::retry::RetryPolicy;
    use crate::source::transport::ProviderResponse;
    use crate::source::SearchFilters;
    use serde_json::json;
    use std::time::Duration;

    fn search(title: &str) -> SourceQuery {
        SourceQuery::Search(SearchFilters {
            title: Some(title.to_string()),
            location: None,
            skills: vec!["Rust".to_string()],
            company: None,
            limit: 10,
            offset: 0,
        })
    }

    fn cached(transport: Arc<ScriptedTransport>, ttl: Duration) -> CachedSource {
        let client = ProviderClient::new(
            "test",
            transport,
            Arc::new(RateLimiter::new(Duration::ZERO)),
            RetryPolicy {
                max_retries: 0,
                ..RetryPolicy::default()
            },
        );
        CachedSource::new(
            Arc::new(client),
            EnrichmentCache::new(Arc::new(MemoryStore::new()), ttl),
        )
    }

    fn page() -> ProviderResponse {
        ProviderResponse::ok(
            json!({"results": [{"linkedinUrl": "https://x/1", "name": "One"}]}).to_string(),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_warm_cache_makes_zero_transport_calls() {
        let transport = ScriptedTransport::new(vec![Ok(page())]);
        let source = cached(transport.clone(), Duration::from_secs(3600));

        let first = source.fetch(&search("Engineer")).await.unwrap();
        assert_eq!(transport.calls(), 1);

        let second = source.fetch(&search("  engineer ")).await.unwrap();
        assert_eq!(transport.calls(), 1);
        assert_eq!(first, second);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_entry_refetches() {
        let transport = ScriptedTransport::new(vec![Ok(page())]);
        let source = cached(transport.clone(), Duration::from_secs(60));

        source.fetch(&search("Engineer")).await.unwrap();
        tokio::time::advance(Duration::from_secs(61)).await;
        source.fetch(&search("Engineer")).await.unwrap();
        assert_eq!(transport.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_are_not_cached() {
        let transport = ScriptedTransport::new(vec![
            Ok(ProviderResponse::status(503)),
            Ok(page()),
        ]);
        let source = cached(transport.clone(), Duration::from_secs(3600));

        assert!(source.fetch(&search("Engineer")).await.is_err());
        assert_eq!(source.fetch(&search("Engineer")).await.unwrap().len(), 1);
        assert_eq!(transport.calls(), 2);
    }
}
