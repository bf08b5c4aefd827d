use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::scoring::ConfigurationError;

/// A job specification handed to the sourcing pipeline.
///
/// Immutable once a run starts: the orchestrator clones it into the run and
/// every stage borrows it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSpec {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub skills: BTreeSet<String>,
    #[serde(default)]
    pub salary_range: Option<String>,
    /// Remote-eligible roles score full location credit for every candidate.
    #[serde(default)]
    pub remote: bool,
}

impl JobSpec {
    /// True when the role is flagged remote or its location says so.
    pub fn is_remote(&self) -> bool {
        self.remote || self.location.to_lowercase().contains("remote")
    }

    /// Structural checks run before any I/O is issued for the job.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.id.trim().is_empty() {
            return Err(ConfigurationError::new("job id cannot be empty"));
        }
        if self.title.trim().is_empty() {
            return Err(ConfigurationError::new(format!(
                "job {} has an empty title",
                self.id
            )));
        }
        Ok(())
    }
}
