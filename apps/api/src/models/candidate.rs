use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Highest level of a single education entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeLevel {
    #[default]
    Unspecified,
    Secondary,
    Associate,
    Bachelor,
    /// Master's and terminal professional degrees (MBA, JD, MD).
    Professional,
    Doctorate,
}

impl DegreeLevel {
    /// Classifies free-text degree strings such as "MS Computer Science" or "PhD, EECS".
    ///
    /// Matching is token based so short abbreviations ("ms", "ba") never match
    /// inside longer words.
    pub fn classify(degree: &str) -> Self {
        let lower = degree.to_lowercase().replace('.', "");
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();
        let has = |words: &[&str]| tokens.iter().any(|t| words.contains(t));

        if has(&["phd", "doctorate", "dphil", "doctoral"]) || lower.contains("doctor of philosophy")
        {
            DegreeLevel::Doctorate
        } else if has(&[
            "master", "masters", "ms", "msc", "ma", "mba", "meng", "mphil", "jd", "md",
        ]) {
            DegreeLevel::Professional
        } else if has(&[
            "bachelor", "bachelors", "bs", "bsc", "ba", "beng", "btech",
        ]) {
            DegreeLevel::Bachelor
        } else if has(&["associate", "associates"]) {
            DegreeLevel::Associate
        } else if lower.contains("high school") || has(&["diploma", "ged"]) {
            DegreeLevel::Secondary
        } else {
            DegreeLevel::Unspecified
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Education {
    pub level: DegreeLevel,
    pub school: Option<String>,
    /// Degree text as the provider reported it.
    pub degree: Option<String>,
}

/// Quality signal for the candidate's current employer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompanyTier {
    Elite,
    Growth,
    Established,
    #[default]
    Unknown,
    /// Provider-supplied rating on a 0–10 scale.
    Rated(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub title: String,
    pub company: String,
    pub duration_months: Option<u32>,
}

/// Canonical candidate shape every provider response is normalized into.
///
/// Enrichment may fill fields that are still empty; nothing mutates a record
/// once scoring has begun.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    /// Stable external key (profile URL); unique within a run.
    pub identity: String,
    pub name: String,
    pub current_role: Option<String>,
    pub location: Option<String>,
    pub experience_summary: Option<String>,
    pub skills: BTreeSet<String>,
    pub education: Vec<Education>,
    /// Months at the current employer.
    pub tenure_months: Option<u32>,
    pub company_tier: CompanyTier,
    /// Most recent role first.
    pub role_history: Vec<RoleEntry>,
    /// Providers that contributed to this record, primary first.
    pub sources: Vec<String>,
    pub raw_source_payload: Value,
}

impl CandidateRecord {
    /// Fills fields still missing on `self` from an enrichment record.
    ///
    /// Existing values always win; skills are unioned. Returns true when any
    /// field changed.
    pub fn absorb(&mut self, enrichment: CandidateRecord) -> bool {
        let mut changed = false;

        fn fill<T>(slot: &mut Option<T>, value: Option<T>, changed: &mut bool) {
            if slot.is_none() && value.is_some() {
                *slot = value;
                *changed = true;
            }
        }

        fill(&mut self.current_role, enrichment.current_role, &mut changed);
        fill(&mut self.location, enrichment.location, &mut changed);
        fill(
            &mut self.experience_summary,
            enrichment.experience_summary,
            &mut changed,
        );
        fill(&mut self.tenure_months, enrichment.tenure_months, &mut changed);

        if self.name.trim().is_empty() && !enrichment.name.trim().is_empty() {
            self.name = enrichment.name;
            changed = true;
        }
        if self.education.is_empty() && !enrichment.education.is_empty() {
            self.education = enrichment.education;
            changed = true;
        }
        if self.role_history.is_empty() && !enrichment.role_history.is_empty() {
            self.role_history = enrichment.role_history;
            changed = true;
        }
        if self.company_tier == CompanyTier::Unknown && enrichment.company_tier != CompanyTier::Unknown
        {
            self.company_tier = enrichment.company_tier;
            changed = true;
        }

        let before = self.skills.len();
        self.skills.extend(enrichment.skills);
        changed |= self.skills.len() != before;

        if changed {
            for source in enrichment.sources {
                if !self.sources.contains(&source) {
                    self.sources.push(source);
                }
            }
        }
        changed
    }
}
