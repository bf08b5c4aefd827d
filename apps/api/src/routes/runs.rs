//! Axum route handlers for the Runs API.

use std::time::Duration;

use axum::{
    extract::{Path, State},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::models::job::JobSpec;
use crate::models::run::RankedResult;
use crate::outreach::OutreachDraft;
use crate::pipeline::{PipelineError, RunSnapshot, SubmitRequest};
use crate::scoring::Weights;
use crate::state::AppState;

const MAX_BATCH_SIZE: usize = 50;

// ────────────────────────────────────────────────────────────────────────────
// Request / Response types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct SubmitRunRequest {
    pub job: JobSpec,
    pub weights: Option<Weights>,
    pub max_candidates: Option<usize>,
    pub min_confidence: Option<f64>,
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub draft_outreach: bool,
}

impl SubmitRunRequest {
    fn into_parts(self) -> (SubmitRequest, bool) {
        let submit = SubmitRequest {
            job: self.job,
            weights: self.weights,
            max_k: self.max_candidates,
            min_confidence: self.min_confidence,
            timeout: self.timeout_secs.map(Duration::from_secs),
        };
        (submit, self.draft_outreach)
    }
}

#[derive(Debug, Serialize)]
pub struct RunResponse {
    pub job_id: String,
    pub result: RankedResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outreach: Option<Vec<OutreachDraft>>,
}

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub jobs: Vec<SubmitRunRequest>,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct BatchEntry {
    pub job_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run: Option<RunResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

#[derive(Debug, Serialize)]
pub struct BatchResponse {
    pub runs: Vec<BatchEntry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Handlers
// ────────────────────────────────────────────────────────────────────────────

/// POST /api/v1/runs
///
/// Runs the pipeline for one job and returns the ranked top-K, optionally
/// with outreach drafts.
pub async fn handle_submit_run(
    State(state): State<AppState>,
    Json(request): Json<SubmitRunRequest>,
) -> Result<Json<RunResponse>, AppError> {
    let (submit, draft) = request.into_parts();
    let job = submit.job.clone();
    let outcome = state.orchestrator.submit(submit).await;
    Ok(Json(finish(&state, job, outcome, draft).await?))
}

/// POST /api/v1/runs/batch
///
/// Runs several jobs concurrently. One job failing does not fail the batch;
/// each entry carries its own result or error.
pub async fn handle_submit_batch(
    State(state): State<AppState>,
    Json(request): Json<BatchRequest>,
) -> Result<Json<BatchResponse>, AppError> {
    if request.jobs.is_empty() {
        return Err(AppError::Validation("jobs cannot be empty".to_string()));
    }
    if request.jobs.len() > MAX_BATCH_SIZE {
        return Err(AppError::Validation(format!(
            "at most {MAX_BATCH_SIZE} jobs per batch, got {}",
            request.jobs.len()
        )));
    }

    let (submits, drafts): (Vec<SubmitRequest>, Vec<bool>) =
        request.jobs.into_iter().map(SubmitRunRequest::into_parts).unzip();
    let jobs: Vec<JobSpec> = submits.iter().map(|s| s.job.clone()).collect();

    let outcomes = state.orchestrator.submit_batch(submits).await;

    let mut runs = Vec::with_capacity(jobs.len());
    for ((job, outcome), draft) in jobs.into_iter().zip(outcomes).zip(drafts) {
        let job_id = job.id.clone();
        runs.push(match finish(&state, job, outcome, draft).await {
            Ok(run) => BatchEntry {
                job_id,
                run: Some(run),
                error: None,
            },
            Err(e) => {
                let (_, code, message) = e.parts();
                BatchEntry {
                    job_id,
                    run: None,
                    error: Some(ErrorBody { code, message }),
                }
            }
        });
    }

    Ok(Json(BatchResponse { runs }))
}

/// GET /api/v1/runs/:job_id
///
/// Lifecycle snapshot of the latest run for a job.
pub async fn handle_get_run(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> Result<Json<RunSnapshot>, AppError> {
    state
        .orchestrator
        .state(&job_id)
        .await
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no run for job '{job_id}'")))
}

async fn finish(
    state: &AppState,
    job: JobSpec,
    outcome: Result<RankedResult, PipelineError>,
    draft: bool,
) -> Result<RunResponse, AppError> {
    let result = outcome?;
    let outreach = if draft {
        Some(state.drafter.draft(&job, &result).await?)
    } else {
        None
    };
    Ok(RunResponse {
        job_id: job.id,
        result,
        outreach,
    })
}
