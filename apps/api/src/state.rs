use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::info;

use crate::cache::{CacheStore, CachedSource, EnrichmentCache, MemoryStore, RedisStore};
use crate::config::Config;
use crate::outreach::{OutreachDrafter, TemplateDrafter};
use crate::pipeline::Orchestrator;
use crate::source::mock::MockTransport;
use crate::source::provider::ProviderClient;
use crate::source::rate_limit::RateLimiter;
use crate::source::transport::{HttpTransport, ProviderTransport};
use crate::source::SourceAdapter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    /// Pluggable outreach drafter. Default: TemplateDrafter.
    pub drafter: Arc<dyn OutreachDrafter>,
    /// Backing store of the enrichment cache, if enabled.
    pub cache: Option<Arc<dyn CacheStore>>,
    pub config: Arc<Config>,
}

impl AppState {
    /// Wires transport → provider client → cache → orchestrator from config.
    pub fn from_config(config: Config) -> Result<Self> {
        let transport: Arc<dyn ProviderTransport> = if config.provider.use_mock {
            info!("Provider '{}' running in mock mode", config.provider.name);
            Arc::new(MockTransport::new())
        } else {
            let http = HttpTransport::new(
                &config.provider.base_url,
                config.provider.api_key.clone(),
                config.provider.request_timeout,
            )
            .context("Failed to build provider HTTP client")?;
            info!("Provider '{}' at {}", config.provider.name, config.provider.base_url);
            Arc::new(http)
        };

        // One limiter per provider, shared by search and enrichment lookups.
        let client: Arc<dyn SourceAdapter> = Arc::new(ProviderClient::new(
            config.provider.name.clone(),
            transport,
            Arc::new(RateLimiter::new(config.provider.rate_limit_delay)),
            config.provider.retry,
        ));

        let mut cache: Option<Arc<dyn CacheStore>> = None;
        let source: Arc<dyn SourceAdapter> = if config.cache.enabled {
            let store: Arc<dyn CacheStore> = match &config.cache.redis_url {
                Some(url) => Arc::new(
                    RedisStore::open(url, "scout:")
                        .context("Invalid REDIS_URL")?
                        .with_timeout(config.cache.op_timeout),
                ),
                None => Arc::new(MemoryStore::new()),
            };
            cache = Some(Arc::clone(&store));
            info!(
                "Enrichment cache: {} (ttl {:?})",
                store.backend(),
                config.cache.ttl
            );
            Arc::new(CachedSource::new(
                client,
                EnrichmentCache::new(store, config.cache.ttl)
                    .with_op_timeout(config.cache.op_timeout),
            ))
        } else {
            info!("Enrichment cache disabled");
            client
        };

        let orchestrator = Orchestrator::new(Arc::clone(&source), config.pipeline.clone())
            .with_enricher(source);

        Ok(Self {
            orchestrator: Arc::new(orchestrator),
            drafter: Arc::new(TemplateDrafter::default()),
            cache,
            config: Arc::new(config),
        })
    }
}
