//! Ranking and selection: confidence filter, deterministic sort, top-K truncation.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::models::candidate::CandidateRecord;
use crate::models::run::{RankedCandidate, RankedResult};
use crate::scoring::{Criterion, ScoreBreakdown};

/// Absorbs float noise in confidence sums (0.2 + 0.15 + ...) at the threshold.
const CONFIDENCE_EPSILON: f64 = 1e-9;

/// Whether `confidence` clears `min_confidence`. Shared by flagging and ranking
/// so a candidate is never both ranked and marked low confidence.
pub fn meets_confidence(confidence: f64, min_confidence: f64) -> bool {
    confidence + CONFIDENCE_EPSILON >= min_confidence
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredCandidate {
    pub candidate: CandidateRecord,
    pub score: ScoreBreakdown,
}

/// Total order used for ranking: overall score desc, confidence desc,
/// skills sub-score desc, identity asc.
pub fn compare(a: &ScoredCandidate, b: &ScoredCandidate) -> Ordering {
    b.score
        .overall_score
        .total_cmp(&a.score.overall_score)
        .then_with(|| b.score.confidence.total_cmp(&a.score.confidence))
        .then_with(|| {
            b.score
                .subscore(Criterion::Skills)
                .total_cmp(&a.score.subscore(Criterion::Skills))
        })
        .then_with(|| a.candidate.identity.cmp(&b.candidate.identity))
}

/// Filters out candidates under `min_confidence`, sorts the rest, and keeps at
/// most `max_k`. Returning fewer than `max_k` is not an error.
pub fn rank(scored: Vec<ScoredCandidate>, max_k: usize, min_confidence: f64) -> RankedResult {
    let considered = scored.len();

    let mut eligible: Vec<ScoredCandidate> = scored
        .into_iter()
        .filter(|s| meets_confidence(s.score.confidence, min_confidence))
        .collect();
    let below_confidence = considered - eligible.len();

    eligible.sort_by(compare);
    eligible.truncate(max_k);

    RankedResult {
        candidates: eligible
            .into_iter()
            .enumerate()
            .map(|(i, s)| RankedCandidate {
                rank: i + 1,
                candidate: s.candidate,
                score: s.score,
            })
            .collect(),
        considered,
        below_confidence,
    }
}
