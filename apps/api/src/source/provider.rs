use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::models::candidate::CandidateRecord;
use crate::source::normalize::{parse_profile, parse_search_page};
use crate::source::rate_limit::RateLimiter;
use crate::source::retry::RetryPolicy;
use crate::source::transport::{Method, ProviderRequest, ProviderResponse, ProviderTransport, TransportError};
use crate::source::{SearchFilters, SourceAdapter, SourceError, SourceQuery};

pub const SEARCH_PATH: &str = "/v1/candidates/search";
pub const ENRICH_PATH: &str = "/v1/profiles/enrich";

/// Outcome of a single attempt, before the retry loop decides what to do.
enum Attempt {
    Done(ProviderResponse),
    Retry {
        error: SourceError,
        retry_after: Option<Duration>,
    },
    Fatal(SourceError),
}

/// A rate-limited, retrying client for one candidate-data provider.
///
/// The transport is swappable: production uses `HttpTransport`, mock mode
/// uses `MockTransport`, and both go through the same pacing, retry, and
/// normalization path.
pub struct ProviderClient {
    name: String,
    transport: Arc<dyn ProviderTransport>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
}

impl ProviderClient {
    pub fn new(
        name: impl Into<String>,
        transport: Arc<dyn ProviderTransport>,
        limiter: Arc<RateLimiter>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            name: name.into(),
            transport,
            limiter,
            retry,
        }
    }

    fn build_request(query: &SourceQuery) -> ProviderRequest {
        match query {
            SourceQuery::Search(filters) => ProviderRequest {
                method: Method::Get,
                path: SEARCH_PATH.to_string(),
                query: search_params(filters),
                body: None,
            },
            SourceQuery::Profile { identity } => ProviderRequest {
                method: Method::Post,
                path: ENRICH_PATH.to_string(),
                query: Vec::new(),
                body: Some(json!({ "linkedin_url": identity })),
            },
        }
    }

    fn classify(&self, attempt: u32, outcome: Result<ProviderResponse, TransportError>) -> Attempt {
        let response = match outcome {
            Ok(response) => response,
            Err(e) => {
                return Attempt::Retry {
                    error: SourceError::UpstreamUnavailable {
                        provider: self.name.clone(),
                        attempts: attempt,
                        detail: e.to_string(),
                    },
                    retry_after: None,
                }
            }
        };

        match response.status {
            200..=299 => Attempt::Done(response),
            401 | 403 => Attempt::Fatal(SourceError::Auth {
                provider: self.name.clone(),
                status: response.status,
            }),
            429 => Attempt::Retry {
                error: SourceError::RateLimited {
                    provider: self.name.clone(),
                    attempts: attempt,
                },
                retry_after: response.retry_after,
            },
            500..=599 => Attempt::Retry {
                error: SourceError::UpstreamUnavailable {
                    provider: self.name.clone(),
                    attempts: attempt,
                    detail: format!("status {}", response.status),
                },
                retry_after: response.retry_after,
            },
            // Other statuses are final; `fetch` decides what they mean.
            _ => Attempt::Done(response),
        }
    }

    /// Sends the request with pacing and retries; returns the final response or
    /// the last error once attempts are exhausted.
    async fn send_with_retry(&self, request: &ProviderRequest) -> Result<ProviderResponse, SourceError> {
        let max_attempts = self.retry.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            self.limiter.acquire().await;
            let outcome = self.transport.send(request).await;

            match self.classify(attempt, outcome) {
                Attempt::Done(response) => return Ok(response),
                Attempt::Fatal(error) => {
                    warn!("{}: {} (not retried)", self.name, error);
                    return Err(error);
                }
                Attempt::Retry { error, retry_after } => {
                    if attempt >= max_attempts {
                        warn!("{}: giving up after {} attempt(s): {}", self.name, attempt, error);
                        return Err(error);
                    }
                    let delay = self.retry.delay(attempt, retry_after);
                    warn!(
                        "{}: attempt {}/{} failed ({}), retrying in {:?}",
                        self.name, attempt, max_attempts, error, delay
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

fn search_params(filters: &SearchFilters) -> Vec<(String, String)> {
    let mut params = Vec::new();
    if let Some(title) = &filters.title {
        params.push(("title".to_string(), title.clone()));
    }
    if let Some(location) = &filters.location {
        params.push(("location".to_string(), location.clone()));
    }
    if !filters.skills.is_empty() {
        params.push(("skills".to_string(), filters.skills.join(",")));
    }
    if let Some(company) = &filters.company {
        params.push(("company".to_string(), company.clone()));
    }
    params.push(("limit".to_string(), filters.limit.to_string()));
    params.push(("offset".to_string(), filters.offset.to_string()));
    params
}

#[async_trait]
impl SourceAdapter for ProviderClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<CandidateRecord>, SourceError> {
        let request = Self::build_request(query);
        let response = self.send_with_retry(&request).await?;

        match (query, response.status) {
            // Unknown profile: nothing to enrich with.
            (SourceQuery::Profile { identity }, 404) => {
                debug!("{}: no profile for {}", self.name, identity);
                Ok(Vec::new())
            }
            (_, 200..=299) => {
                let records = match query {
                    SourceQuery::Search(_) => parse_search_page(&self.name, &response.body)?,
                    SourceQuery::Profile { .. } => parse_profile(&self.name, &response.body)?,
                };
                info!("{}: fetched {} candidate(s)", self.name, records.len());
                Ok(records)
            }
            (_, status) => Err(SourceError::MalformedResponse {
                provider: self.name.clone(),
                detail: format!("unexpected status {status}"),
            }),
        }
    }
}
