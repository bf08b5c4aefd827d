//! External source adapter: one uniform contract over candidate-data providers.
//!
//! Every provider is reached through [`SourceAdapter::fetch`]; the HTTP
//! provider composes a [`transport::ProviderTransport`], a per-provider
//! [`rate_limit::RateLimiter`], a [`retry::RetryPolicy`], and the
//! [`normalize`] boundary that turns provider JSON into `CandidateRecord`s.

pub mod mock;
pub mod normalize;
pub mod provider;
pub mod rate_limit;
pub mod retry;
pub mod transport;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::candidate::CandidateRecord;
use crate::models::job::JobSpec;

// ────────────────────────────────────────────────────────────────────────────
// Queries
// ────────────────────────────────────────────────────────────────────────────

/// Structured search parameters derived from a job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub title: Option<String>,
    pub location: Option<String>,
    pub skills: Vec<String>,
    pub company: Option<String>,
    pub limit: usize,
    pub offset: usize,
}

impl SearchFilters {
    pub fn from_job(job: &JobSpec, limit: usize) -> Self {
        let non_empty = |s: &str| {
            let trimmed = s.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };
        Self {
            title: non_empty(&job.title),
            location: if job.is_remote() {
                None
            } else {
                non_empty(&job.location)
            },
            skills: job.skills.iter().cloned().collect(),
            company: None,
            limit,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SourceQuery {
    Search(SearchFilters),
    /// Per-profile enrichment lookup by stable identity.
    Profile { identity: String },
}

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorKind {
    AuthError,
    RateLimited,
    UpstreamUnavailable,
    MalformedResponse,
}

impl SourceErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            SourceErrorKind::AuthError => "auth_error",
            SourceErrorKind::RateLimited => "rate_limited",
            SourceErrorKind::UpstreamUnavailable => "upstream_unavailable",
            SourceErrorKind::MalformedResponse => "malformed_response",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SourceError {
    #[error("{provider}: authentication rejected (status {status})")]
    Auth { provider: String, status: u16 },

    #[error("{provider}: rate limited after {attempts} attempt(s)")]
    RateLimited { provider: String, attempts: u32 },

    #[error("{provider}: upstream unavailable after {attempts} attempt(s): {detail}")]
    UpstreamUnavailable {
        provider: String,
        attempts: u32,
        detail: String,
    },

    #[error("{provider}: malformed response: {detail}")]
    MalformedResponse { provider: String, detail: String },
}

impl SourceError {
    pub fn kind(&self) -> SourceErrorKind {
        match self {
            SourceError::Auth { .. } => SourceErrorKind::AuthError,
            SourceError::RateLimited { .. } => SourceErrorKind::RateLimited,
            SourceError::UpstreamUnavailable { .. } => SourceErrorKind::UpstreamUnavailable,
            SourceError::MalformedResponse { .. } => SourceErrorKind::MalformedResponse,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            SourceErrorKind::RateLimited | SourceErrorKind::UpstreamUnavailable
        )
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Adapter trait
// ────────────────────────────────────────────────────────────────────────────

/// The adapter contract. Implement this to plug in another provider or an
/// enrichment source without touching the orchestrator.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Short provider label used in logs, errors, and cache keys.
    fn name(&self) -> &str;

    /// Fetches and normalizes candidates. Individual malformed records are
    /// dropped; transport-level failures surface after retries.
    async fn fetch(&self, query: &SourceQuery) -> Result<Vec<CandidateRecord>, SourceError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_filters_from_remote_job_drop_location() {
        let job = JobSpec {
            id: "j".to_string(),
            title: " Staff Engineer ".to_string(),
            company: "Acme".to_string(),
            description: String::new(),
            requirements: vec![],
            location: "Remote".to_string(),
            skills: ["Rust".to_string()].into_iter().collect::<BTreeSet<_>>(),
            salary_range: None,
            remote: false,
        };
        let filters = SearchFilters::from_job(&job, 25);
        assert_eq!(filters.title.as_deref(), Some("Staff Engineer"));
        assert!(filters.location.is_none());
        assert_eq!(filters.skills, vec!["Rust".to_string()]);
        assert_eq!(filters.limit, 25);
    }

    #[test]
    fn test_error_kinds_and_retryability() {
        let auth = SourceError::Auth {
            provider: "p".to_string(),
            status: 401,
        };
        let limited = SourceError::RateLimited {
            provider: "p".to_string(),
            attempts: 4,
        };
        assert_eq!(auth.kind().as_str(), "auth_error");
        assert!(!auth.is_retryable());
        assert!(limited.is_retryable());
        assert!(limited.to_string().contains("4 attempt"));
    }
}
