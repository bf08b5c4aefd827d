//! Outreach drafting: consumes a finished `RankedResult`, never feeds scoring.
//!
//! `AppState` carries an `Arc<dyn OutreachDrafter>`; the default
//! `TemplateDrafter` is deterministic and needs no external service.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::candidate::{CandidateRecord, CompanyTier};
use crate::models::job::JobSpec;
use crate::models::run::RankedResult;
use crate::scoring::skills::canonical_skill;

const MAX_ALIGNED_SKILLS: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutreachDraft {
    pub rank: usize,
    pub identity: String,
    pub name: String,
    pub subject: String,
    pub message: String,
    /// Profile details the message refers to.
    pub hooks: Vec<String>,
}

#[derive(Debug, Error)]
pub enum OutreachError {
    #[error("outreach backend error: {0}")]
    Backend(String),
}

/// Implement this to swap in another drafting backend.
#[async_trait]
pub trait OutreachDrafter: Send + Sync {
    fn backend(&self) -> &'static str;

    async fn draft(
        &self,
        job: &JobSpec,
        ranked: &RankedResult,
    ) -> Result<Vec<OutreachDraft>, OutreachError>;
}

// ────────────────────────────────────────────────────────────────────────────
// TemplateDrafter
// ────────────────────────────────────────────────────────────────────────────

pub struct TemplateDrafter {
    sender: String,
}

impl TemplateDrafter {
    pub fn new(sender: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
        }
    }

    fn hooks(job: &JobSpec, candidate: &CandidateRecord) -> Vec<String> {
        let mut hooks = Vec::new();

        if let Some(role) = candidate.role_history.first() {
            if candidate.company_tier == CompanyTier::Elite && !role.company.is_empty() {
                hooks.push(format!("your work as {} at {}", role.title, role.company));
            }
        }

        let aligned = aligned_skills(job, candidate);
        if !aligned.is_empty() {
            hooks.push(format!("your experience with {}", aligned.join(", ")));
        }

        if let Some(school) = candidate.education.iter().find_map(|e| e.school.as_deref()) {
            hooks.push(format!("your background from {school}"));
        }

        if candidate.role_history.len() > 1 {
            hooks.push("the way your career has progressed".to_string());
        }
        hooks
    }

    fn compose(&self, job: &JobSpec, candidate: &CandidateRecord, hooks: &[String]) -> String {
        let first_name = candidate.name.split_whitespace().next().unwrap_or("there");
        let at_company = if job.company.trim().is_empty() {
            String::new()
        } else {
            format!(" at {}", job.company.trim())
        };

        let opener = match hooks.first() {
            Some(hook) => format!(
                "I came across your profile and was impressed by {hook}. Your background looks like a strong fit for our {} role{at_company}.",
                job.title
            ),
            None => format!(
                "I came across your profile and think your experience could be a great fit for our {} role{at_company}.",
                job.title
            ),
        };

        let mut message = format!("Hi {first_name},\n\n{opener}\n");
        if let Some(detail) = hooks.get(1) {
            message.push_str(&format!("\nI also noticed {detail}.\n"));
        }
        message.push_str(
            "\nWould you be open to a short call to learn more about the opportunity?\n\nBest regards,\n",
        );
        message.push_str(&self.sender);
        message
    }
}

impl Default for TemplateDrafter {
    fn default() -> Self {
        Self::new("The Recruiting Team")
    }
}

#[async_trait]
impl OutreachDrafter for TemplateDrafter {
    fn backend(&self) -> &'static str {
        "template"
    }

    async fn draft(
        &self,
        job: &JobSpec,
        ranked: &RankedResult,
    ) -> Result<Vec<OutreachDraft>, OutreachError> {
        Ok(ranked
            .candidates
            .iter()
            .map(|entry| {
                let hooks = Self::hooks(job, &entry.candidate);
                OutreachDraft {
                    rank: entry.rank,
                    identity: entry.candidate.identity.clone(),
                    name: entry.candidate.name.clone(),
                    subject: if job.company.trim().is_empty() {
                        format!("{} opportunity", job.title)
                    } else {
                        format!("{} opportunity at {}", job.title, job.company.trim())
                    },
                    message: self.compose(job, &entry.candidate, &hooks),
                    hooks,
                }
            })
            .collect())
    }
}

/// Candidate skills that satisfy a job skill, in the candidate's own wording.
fn aligned_skills(job: &JobSpec, candidate: &CandidateRecord) -> Vec<String> {
    let wanted: Vec<String> = job.skills.iter().map(|s| canonical_skill(s)).collect();
    candidate
        .skills
        .iter()
        .filter(|s| wanted.contains(&canonical_skill(s)))
        .take(MAX_ALIGNED_SKILLS)
        .cloned()
        .collect()
}
