use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::candidate::CandidateRecord;
use crate::scoring::ScoreBreakdown;

/// Lifecycle of one job run.
///
/// `pending → sourcing → enriching → scoring → ranking → completed`, with
/// `failed` and `timed_out` reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Pending,
    Sourcing,
    Enriching,
    Scoring,
    Ranking,
    Completed,
    Failed,
    TimedOut,
}

impl RunState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            RunState::Completed | RunState::Failed | RunState::TimedOut
        )
    }

    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (from, Failed | TimedOut) => !from.is_terminal(),
            (Pending, Sourcing)
            | (Sourcing, Enriching)
            | (Enriching, Scoring)
            | (Scoring, Ranking)
            | (Ranking, Completed) => true,
            _ => false,
        }
    }
}

/// Why a run ended in `failed`, preserved verbatim for the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunFailure {
    /// Stable error kind, e.g. `auth_error` or `rate_limited`.
    pub kind: String,
    pub message: String,
}

/// One entry of a ranked result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedCandidate {
    /// 1-based position.
    pub rank: usize,
    pub candidate: CandidateRecord,
    pub score: ScoreBreakdown,
}

/// Final ordered top-K for one job run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub candidates: Vec<RankedCandidate>,
    /// Candidates that reached ranking.
    pub considered: usize,
    /// Candidates dropped for falling under the minimum confidence.
    pub below_confidence: usize,
}

impl RankedResult {
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn top(&self) -> Option<&RankedCandidate> {
        self.candidates.first()
    }
}

/// Orchestrator-owned record of a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineRun {
    pub run_id: Uuid,
    pub job_id: String,
    pub state: RunState,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub failure: Option<RunFailure>,
    pub result: Option<RankedResult>,
}

impl PipelineRun {
    pub fn new(job_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            run_id: Uuid::new_v4(),
            job_id: job_id.into(),
            state: RunState::Pending,
            started_at: now,
            updated_at: now,
            finished_at: None,
            failure: None,
            result: None,
        }
    }
}
