//! Scoring engine: maps (job, candidate, weights) to a per-criterion breakdown
//! and a weighted overall score on a 0–10 scale.
//!
//! Pure and deterministic: no I/O, no shared state, safe to call from any
//! number of tasks at once on the same inputs.

pub mod criteria;
pub mod skills;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::candidate::CandidateRecord;
use crate::models::job::JobSpec;

/// Allowed distance of the weight sum from 1.0.
pub const WEIGHT_TOLERANCE: f64 = 1e-3;

#[derive(Debug, Clone, PartialEq, Error)]
#[error("Configuration error: {0}")]
pub struct ConfigurationError(pub String);

impl ConfigurationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Criteria and weights
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Criterion {
    Education,
    Trajectory,
    Company,
    Skills,
    Location,
    Tenure,
}

impl Criterion {
    pub const ALL: [Criterion; 6] = [
        Criterion::Education,
        Criterion::Trajectory,
        Criterion::Company,
        Criterion::Skills,
        Criterion::Location,
        Criterion::Tenure,
    ];
}

/// Per-criterion weights. Must sum to 1.0 within [`WEIGHT_TOLERANCE`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub education: f64,
    pub trajectory: f64,
    pub company: f64,
    pub skills: f64,
    pub location: f64,
    pub tenure: f64,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            education: 0.2,
            trajectory: 0.2,
            company: 0.15,
            skills: 0.25,
            location: 0.1,
            tenure: 0.1,
        }
    }
}

impl Weights {
    pub fn get(&self, criterion: Criterion) -> f64 {
        match criterion {
            Criterion::Education => self.education,
            Criterion::Trajectory => self.trajectory,
            Criterion::Company => self.company,
            Criterion::Skills => self.skills,
            Criterion::Location => self.location,
            Criterion::Tenure => self.tenure,
        }
    }

    pub fn sum(&self) -> f64 {
        Criterion::ALL.iter().map(|c| self.get(*c)).sum()
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        for criterion in Criterion::ALL {
            let w = self.get(criterion);
            if !w.is_finite() || w < 0.0 {
                return Err(ConfigurationError::new(format!(
                    "weight for {criterion:?} must be a non-negative number, got {w}"
                )));
            }
        }
        let sum = self.sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigurationError::new(format!(
                "weights must sum to 1.0, got {sum:.4}"
            )));
        }
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Output
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreBreakdown {
    pub subscores: BTreeMap<Criterion, f64>,
    /// Σ(weight × subscore), 0 – 10.
    pub overall_score: f64,
    /// Fraction of the candidate's fields that were populated, 0 – 1.
    pub confidence: f64,
    /// Set by the pipeline when `confidence` is under the run's threshold.
    #[serde(default)]
    pub low_confidence: bool,
}

impl ScoreBreakdown {
    pub fn subscore(&self, criterion: Criterion) -> f64 {
        self.subscores.get(&criterion).copied().unwrap_or(0.0)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Engine
// ────────────────────────────────────────────────────────────────────────────

/// Scores one candidate against one job.
///
/// Fails fast with [`ConfigurationError`] when the weights are invalid.
pub fn score(
    job: &JobSpec,
    candidate: &CandidateRecord,
    weights: &Weights,
) -> Result<ScoreBreakdown, ConfigurationError> {
    weights.validate()?;

    let subscores: BTreeMap<Criterion, f64> = Criterion::ALL
        .iter()
        .map(|c| (*c, subscore(*c, job, candidate)))
        .collect();

    let overall_score = Criterion::ALL
        .iter()
        .map(|c| weights.get(*c) * subscores[c])
        .sum::<f64>()
        .clamp(0.0, 10.0);

    Ok(ScoreBreakdown {
        subscores,
        overall_score,
        confidence: confidence(candidate),
        low_confidence: false,
    })
}

fn subscore(criterion: Criterion, job: &JobSpec, candidate: &CandidateRecord) -> f64 {
    match criterion {
        Criterion::Education => criteria::education_score(candidate),
        Criterion::Trajectory => criteria::trajectory_score(candidate),
        Criterion::Company => criteria::company_score(candidate),
        Criterion::Skills => criteria::skills_score(job, candidate),
        Criterion::Location => criteria::location_score(job, candidate),
        Criterion::Tenure => criteria::tenure_score(candidate),
    }
}

/// Completeness of the record, weighted by how much each field feeds scoring.
pub fn confidence(candidate: &CandidateRecord) -> f64 {
    let present = |s: &Option<String>| s.as_deref().is_some_and(|v| !v.trim().is_empty());

    let factors = [
        (!candidate.identity.trim().is_empty(), 0.2),
        (
            !candidate.role_history.is_empty() || present(&candidate.current_role),
            0.2,
        ),
        (!candidate.education.is_empty(), 0.15),
        (!candidate.skills.is_empty(), 0.15),
        (present(&candidate.experience_summary), 0.1),
        (present(&candidate.location), 0.1),
        (candidate.tenure_months.is_some(), 0.1),
    ];

    factors
        .iter()
        .filter(|(has, _)| *has)
        .map(|(_, weight)| weight)
        .sum::<f64>()
        .min(1.0)
}
