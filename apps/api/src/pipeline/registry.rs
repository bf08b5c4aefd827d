use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::RwLock;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::run::{PipelineRun, RankedResult, RunFailure, RunState};

/// Read-only view of a run for status queries.
#[derive(Debug, Clone, Serialize)]
pub struct RunSnapshot {
    pub run_id: Uuid,
    pub job_id: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: i64,
    pub failure: Option<RunFailure>,
    pub result: Option<RankedResult>,
}

impl From<&PipelineRun> for RunSnapshot {
    fn from(run: &PipelineRun) -> Self {
        let end = run.finished_at.unwrap_or_else(Utc::now);
        Self {
            run_id: run.run_id,
            job_id: run.job_id.clone(),
            state: run.state,
            started_at: run.started_at,
            updated_at: run.updated_at,
            finished_at: run.finished_at,
            elapsed_ms: (end - run.started_at).num_milliseconds(),
            failure: run.failure.clone(),
            result: run.result.clone(),
        }
    }
}

/// Owns every `PipelineRun`, keyed by job id.
///
/// Updates carry the run id so a run that was replaced after finishing can
/// never be overwritten by a stale writer.
#[derive(Debug)]
pub struct RunRegistry {
    runs: RwLock<HashMap<String, PipelineRun>>,
    retention: Duration,
}

impl RunRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            runs: RwLock::new(HashMap::new()),
            retention,
        }
    }

    /// Registers a new pending run. Returns `None` if a non-terminal run with
    /// the same job id exists; a finished one is replaced.
    pub async fn register(&self, job_id: &str) -> Option<Uuid> {
        let mut runs = self.runs.write().await;
        if runs.get(job_id).is_some_and(|r| !r.state.is_terminal()) {
            return None;
        }
        let run = PipelineRun::new(job_id);
        let run_id = run.run_id;
        runs.insert(job_id.to_string(), run);
        Some(run_id)
    }

    /// Moves a run to `next` if the state machine allows it.
    pub async fn transition(&self, job_id: &str, run_id: Uuid, next: RunState) -> bool {
        self.update(job_id, run_id, next, |_| {}).await
    }

    pub async fn complete(&self, job_id: &str, run_id: Uuid, result: RankedResult) -> bool {
        self.update(job_id, run_id, RunState::Completed, |run| {
            run.result = Some(result);
        })
        .await
    }

    pub async fn fail(&self, job_id: &str, run_id: Uuid, failure: RunFailure) -> bool {
        self.update(job_id, run_id, RunState::Failed, |run| {
            run.failure = Some(failure);
        })
        .await
    }

    /// Fails a run whose driver went away before recording an outcome.
    pub async fn cancel(&self, job_id: &str, run_id: Uuid) -> bool {
        self.fail(
            job_id,
            run_id,
            RunFailure {
                kind: "cancelled".to_string(),
                message: format!("run {job_id} was abandoned before completion"),
            },
        )
        .await
    }

    pub async fn time_out(&self, job_id: &str, run_id: Uuid) -> bool {
        self.update(job_id, run_id, RunState::TimedOut, |run| {
            run.result = None;
        })
        .await
    }

    async fn update<F>(&self, job_id: &str, run_id: Uuid, next: RunState, apply: F) -> bool
    where
        F: FnOnce(&mut PipelineRun),
    {
        let mut runs = self.runs.write().await;
        let Some(run) = runs.get_mut(job_id).filter(|r| r.run_id == run_id) else {
            debug!("run {job_id}/{run_id} no longer registered, dropping {next:?}");
            return false;
        };
        if !run.state.can_transition_to(next) {
            warn!("run {job_id}: rejected transition {:?} -> {:?}", run.state, next);
            return false;
        }

        let now = Utc::now();
        run.state = next;
        run.updated_at = now;
        if next.is_terminal() {
            run.finished_at = Some(now);
        }
        apply(run);
        true
    }

    pub async fn snapshot(&self, job_id: &str) -> Option<RunSnapshot> {
        self.runs.read().await.get(job_id).map(RunSnapshot::from)
    }

    /// Evicts terminal runs that finished before `now - retention`.
    pub async fn sweep_at(&self, now: DateTime<Utc>) -> usize {
        let retention = chrono::Duration::from_std(self.retention)
            .unwrap_or_else(|_| chrono::Duration::weeks(52 * 100));
        let mut runs = self.runs.write().await;
        let before = runs.len();
        runs.retain(|_, run| match run.finished_at {
            Some(finished) if run.state.is_terminal() => now - finished < retention,
            _ => true,
        });
        before - runs.len()
    }

    pub async fn sweep(&self) -> usize {
        self.sweep_at(Utc::now()).await
    }

    pub async fn len(&self) -> usize {
        self.runs.read().await.len()
    }
}
