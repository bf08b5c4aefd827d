//! Pipeline orchestrator: drives one job run through
//! `sourcing → enriching → scoring → ranking` under admission control and a
//! wall-clock deadline.

pub mod admission;
pub mod registry;
pub mod stages;

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::job::JobSpec;
use crate::models::run::{RankedResult, RunFailure, RunState};
use crate::ranking;
use crate::scoring::{ConfigurationError, Weights};
use crate::source::{SearchFilters, SourceAdapter, SourceError, SourceQuery};

use admission::Admission;
pub use registry::{RunRegistry, RunSnapshot};

// ────────────────────────────────────────────────────────────────────────────
// Errors
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("run {job_id} failed: {source}")]
    Failed { job_id: String, source: SourceError },

    #[error("run {job_id} timed out after {timeout:?}")]
    TimedOut { job_id: String, timeout: Duration },

    #[error("pipeline is at capacity, try again later")]
    Overloaded,

    #[error("run {job_id} is already in progress")]
    DuplicateRun { job_id: String },
}

impl PipelineError {
    /// Stable, machine-readable reason. Failed runs report the originating
    /// adapter error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::Configuration(_) => "configuration_error",
            PipelineError::Failed { source, .. } => source.kind().as_str(),
            PipelineError::TimedOut { .. } => "timed_out",
            PipelineError::Overloaded => "overloaded",
            PipelineError::DuplicateRun { .. } => "duplicate_run",
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Settings & requests
// ────────────────────────────────────────────────────────────────────────────

/// Per-run values used when a submit does not override them.
#[derive(Debug, Clone)]
pub struct RunDefaults {
    pub weights: Weights,
    pub max_k: usize,
    pub min_confidence: f64,
    pub timeout: Duration,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            weights: Weights::default(),
            max_k: 10,
            min_confidence: 0.5,
            timeout: Duration::from_secs(120),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    pub defaults: RunDefaults,
    pub search_limit: usize,
    pub enable_enrichment: bool,
    pub enrichment_fan_out: usize,
    pub max_concurrent_runs: usize,
    pub max_queued_runs: usize,
    pub run_retention: Duration,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            defaults: RunDefaults::default(),
            search_limit: 25,
            enable_enrichment: true,
            enrichment_fan_out: 4,
            max_concurrent_runs: 4,
            max_queued_runs: 16,
            run_retention: Duration::from_secs(3600),
        }
    }
}

/// One job submission. `None` fields fall back to [`RunDefaults`].
#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub job: JobSpec,
    pub weights: Option<Weights>,
    pub max_k: Option<usize>,
    pub min_confidence: Option<f64>,
    pub timeout: Option<Duration>,
}

impl SubmitRequest {
    pub fn new(job: JobSpec) -> Self {
        Self {
            job,
            weights: None,
            max_k: None,
            min_confidence: None,
            timeout: None,
        }
    }
}

/// Resolved and validated parameters for one run.
#[derive(Debug, Clone)]
struct RunParams {
    weights: Weights,
    max_k: usize,
    min_confidence: f64,
    timeout: Duration,
}

impl RunParams {
    fn resolve(request: &SubmitRequest, defaults: &RunDefaults) -> Result<Self, ConfigurationError> {
        request.job.validate()?;

        let params = Self {
            weights: request.weights.unwrap_or(defaults.weights),
            max_k: request.max_k.unwrap_or(defaults.max_k),
            min_confidence: request.min_confidence.unwrap_or(defaults.min_confidence),
            timeout: request.timeout.unwrap_or(defaults.timeout),
        };

        params.weights.validate()?;
        if !(0.0..=1.0).contains(&params.min_confidence) {
            return Err(ConfigurationError::new(format!(
                "min_confidence must be within [0, 1], got {}",
                params.min_confidence
            )));
        }
        if params.max_k == 0 {
            return Err(ConfigurationError::new("max_k must be at least 1"));
        }
        if params.timeout.is_zero() {
            return Err(ConfigurationError::new("timeout must be positive"));
        }
        Ok(params)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Orchestrator
// ────────────────────────────────────────────────────────────────────────────

pub struct Orchestrator {
    source: Arc<dyn SourceAdapter>,
    enrichers: Vec<Arc<dyn SourceAdapter>>,
    registry: Arc<RunRegistry>,
    admission: Admission,
    settings: PipelineSettings,
}

impl Orchestrator {
    pub fn new(source: Arc<dyn SourceAdapter>, settings: PipelineSettings) -> Self {
        Self {
            source,
            enrichers: Vec::new(),
            registry: Arc::new(RunRegistry::new(settings.run_retention)),
            admission: Admission::new(settings.max_concurrent_runs, settings.max_queued_runs),
            settings,
        }
    }

    /// Adds an enrichment source. Enrichers are consulted in the order added.
    pub fn with_enricher(mut self, enricher: Arc<dyn SourceAdapter>) -> Self {
        self.enrichers.push(enricher);
        self
    }

    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    pub fn registry(&self) -> &RunRegistry {
        &self.registry
    }

    /// Current lifecycle state of the latest run for `job_id`.
    pub async fn state(&self, job_id: &str) -> Option<RunSnapshot> {
        self.registry.snapshot(job_id).await
    }

    /// Runs one job to completion.
    ///
    /// Configuration problems are reported before any I/O. The timeout covers
    /// the time spent queued as well as every stage; on expiry all in-flight
    /// calls for the run are dropped and no result is produced.
    pub async fn submit(&self, request: SubmitRequest) -> Result<RankedResult, PipelineError> {
        let params = RunParams::resolve(&request, &self.settings.defaults)?;
        let job = request.job;
        let job_id = job.id.clone();

        self.registry.sweep().await;

        let slot = self.admission.admit().ok_or_else(|| {
            warn!(
                "rejecting run {job_id}: {} running, {} queued",
                self.admission.running(),
                self.admission.queued()
            );
            PipelineError::Overloaded
        })?;
        let run_id = self
            .registry
            .register(&job_id)
            .await
            .ok_or_else(|| PipelineError::DuplicateRun {
                job_id: job_id.clone(),
            })?;
        info!("run {job_id} ({run_id}) accepted");
        let guard = RunGuard {
            registry: Arc::clone(&self.registry),
            job_id: job_id.clone(),
            run_id,
            armed: true,
        };

        let outcome = tokio::time::timeout(params.timeout, async {
            let _permit = slot.ready().await.map_err(|_| PipelineError::Overloaded)?;
            self.drive(&job, run_id, &params).await
        })
        .await;

        let reported = match outcome {
            Ok(Ok(result)) => {
                self.registry.complete(&job_id, run_id, result.clone()).await;
                info!(
                    "run {job_id} completed: {} ranked of {} considered ({} below confidence)",
                    result.len(),
                    result.considered,
                    result.below_confidence
                );
                Ok(result)
            }
            Ok(Err(err)) => {
                let failure = RunFailure {
                    kind: err.kind().to_string(),
                    message: err.to_string(),
                };
                self.registry.fail(&job_id, run_id, failure).await;
                warn!("run {job_id} failed: {err}");
                Err(err)
            }
            Err(_) => {
                self.registry.time_out(&job_id, run_id).await;
                warn!("run {job_id} timed out after {:?}", params.timeout);
                Err(PipelineError::TimedOut {
                    job_id,
                    timeout: params.timeout,
                })
            }
        };
        guard.disarm();
        reported
    }

    /// Submits several jobs concurrently; each gets its own outcome, in input order.
    pub async fn submit_batch(
        &self,
        requests: Vec<SubmitRequest>,
    ) -> Vec<Result<RankedResult, PipelineError>> {
        join_all(requests.into_iter().map(|r| self.submit(r))).await
    }

    async fn drive(
        &self,
        job: &JobSpec,
        run_id: Uuid,
        params: &RunParams,
    ) -> Result<RankedResult, PipelineError> {
        let failed = |source: SourceError| PipelineError::Failed {
            job_id: job.id.clone(),
            source,
        };

        self.advance(job, run_id, RunState::Sourcing).await;
        let filters = SearchFilters::from_job(job, self.settings.search_limit);
        let found = self
            .source
            .fetch(&SourceQuery::Search(filters))
            .await
            .map_err(failed)?;
        let candidates = stages::dedupe(found);
        info!(
            "run {}: {} unique candidate(s) from {}",
            job.id,
            candidates.len(),
            self.source.name()
        );

        self.advance(job, run_id, RunState::Enriching).await;
        let candidates = if self.settings.enable_enrichment && !self.enrichers.is_empty() {
            stages::enrich(candidates, &self.enrichers, self.settings.enrichment_fan_out)
                .await
                .map_err(failed)?
        } else {
            candidates
        };

        self.advance(job, run_id, RunState::Scoring).await;
        let scored = stages::score_all(job, candidates, &params.weights, params.min_confidence)?;

        self.advance(job, run_id, RunState::Ranking).await;
        Ok(ranking::rank(scored, params.max_k, params.min_confidence))
    }

    async fn advance(&self, job: &JobSpec, run_id: Uuid, next: RunState) {
        if self.registry.transition(&job.id, run_id, next).await {
            info!("run {} -> {:?}", job.id, next);
        }
    }
}

/// Marks a run as cancelled if its `submit` future is dropped before the
/// outcome is recorded, so the job id never stays locked in an active state.
struct RunGuard {
    registry: Arc<RunRegistry>,
    job_id: String,
    run_id: Uuid,
    armed: bool,
}

impl RunGuard {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let registry = Arc::clone(&self.registry);
        let job_id = std::mem::take(&mut self.job_id);
        let run_id = self.run_id;
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if registry.cancel(&job_id, run_id).await {
                        warn!("run {job_id} cancelled before completion");
                    }
                });
            }
            Err(_) => warn!("run {job_id} dropped outside a runtime, left unrecorded"),
        }
    }
}
