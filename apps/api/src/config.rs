use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::pipeline::{PipelineSettings, RunDefaults};
use crate::scoring::Weights;
use crate::source::retry::RetryPolicy;

/// Application configuration loaded from environment variables.
/// Startup fails if a required variable is missing or a value does not parse.
#[derive(Debug, Clone)]
pub struct Config {
    pub provider: ProviderConfig,
    pub cache: CacheConfig,
    pub pipeline: PipelineSettings,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub name: String,
    pub base_url: String,
    /// Empty in mock mode.
    pub api_key: String,
    pub use_mock: bool,
    pub request_timeout: Duration,
    pub rate_limit_delay: Duration,
    pub retry: RetryPolicy,
}

#[derive(Debug, Clone)]
pub struct CacheConfig {
    pub enabled: bool,
    /// In-memory cache when unset.
    pub redis_url: Option<String>,
    pub ttl: Duration,
    /// Bound on each cache call; slower calls count as a miss.
    pub op_timeout: Duration,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let use_mock = env_or("PROVIDER_USE_MOCK", false)?;
        let api_key = if use_mock {
            std::env::var("PROVIDER_API_KEY").unwrap_or_default()
        } else {
            require_env("PROVIDER_API_KEY")?
        };

        let provider = ProviderConfig {
            name: env_or("PROVIDER_NAME", "coresignal".to_string())?,
            base_url: env_or(
                "PROVIDER_BASE_URL",
                "https://api.coresignal.com".to_string(),
            )?,
            api_key,
            use_mock,
            request_timeout: Duration::from_secs(env_or("PROVIDER_TIMEOUT_SECS", 30)?),
            rate_limit_delay: Duration::from_millis(env_or("PROVIDER_RATE_LIMIT_DELAY_MS", 1000)?),
            retry: RetryPolicy {
                max_retries: env_or("PROVIDER_MAX_RETRIES", 3)?,
                base_delay: Duration::from_millis(env_or("PROVIDER_BACKOFF_BASE_MS", 500)?),
                max_delay: Duration::from_millis(env_or("PROVIDER_BACKOFF_MAX_MS", 30_000)?),
            },
        };

        let cache = CacheConfig {
            enabled: env_or("ENABLE_CACHE", true)?,
            redis_url: std::env::var("REDIS_URL").ok().filter(|v| !v.trim().is_empty()),
            ttl: Duration::from_secs(env_or("CACHE_TTL_SECS", 3600)?),
            op_timeout: Duration::from_millis(env_or("CACHE_TIMEOUT_MS", 2000)?),
        };

        let defaults = RunDefaults {
            weights: Weights {
                education: env_or("WEIGHT_EDUCATION", 0.2)?,
                trajectory: env_or("WEIGHT_TRAJECTORY", 0.2)?,
                company: env_or("WEIGHT_COMPANY", 0.15)?,
                skills: env_or("WEIGHT_SKILLS", 0.25)?,
                location: env_or("WEIGHT_LOCATION", 0.1)?,
                tenure: env_or("WEIGHT_TENURE", 0.1)?,
            },
            max_k: env_or("MAX_CANDIDATES_PER_JOB", 10)?,
            min_confidence: env_or("MIN_CONFIDENCE", 0.5)?,
            timeout: Duration::from_secs(env_or("RUN_TIMEOUT_SECS", 120)?),
        };
        defaults
            .weights
            .validate()
            .context("WEIGHT_* variables are invalid")?;

        let pipeline = PipelineSettings {
            defaults,
            search_limit: env_or("SEARCH_LIMIT", 25)?,
            enable_enrichment: env_or("ENABLE_ENRICHMENT", true)?,
            enrichment_fan_out: env_or("ENRICHMENT_FAN_OUT", 4)?,
            max_concurrent_runs: env_or("MAX_CONCURRENT_RUNS", 4)?,
            max_queued_runs: env_or("MAX_QUEUED_RUNS", 16)?,
            run_retention: Duration::from_secs(env_or("RUN_RETENTION_SECS", 3600)?),
        };

        let config = Config {
            provider,
            cache,
            pipeline,
            port: env_or("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        };
        config.check()?;
        Ok(config)
    }

    /// Range checks that a parse alone can't express.
    fn check(&self) -> Result<()> {
        let defaults = &self.pipeline.defaults;
        if !(0.0..=1.0).contains(&defaults.min_confidence) {
            bail!("MIN_CONFIDENCE must be within [0, 1], got {}", defaults.min_confidence);
        }
        if defaults.max_k == 0 {
            bail!("MAX_CANDIDATES_PER_JOB must be at least 1");
        }
        if defaults.timeout.is_zero() {
            bail!("RUN_TIMEOUT_SECS must be positive");
        }
        if self.cache.enabled && self.cache.op_timeout.is_zero() {
            bail!("CACHE_TIMEOUT_MS must be positive");
        }
        if self.pipeline.max_concurrent_runs == 0 {
            bail!("MAX_CONCURRENT_RUNS must be at least 1");
        }
        Ok(())
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

/// Reads and parses an optional variable, falling back to `default` when unset.
fn env_or<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("Environment variable '{key}' has an invalid value '{raw}'")),
        _ => Ok(default),
    }
}
