use std::collections::HashSet;
use std::sync::Arc;

use futures::stream::{self, StreamExt, TryStreamExt};
use tracing::{debug, warn};

use crate::models::candidate::CandidateRecord;
use crate::models::job::JobSpec;
use crate::ranking::{self, ScoredCandidate};
use crate::scoring::{self, ConfigurationError, Weights};
use crate::source::{SourceAdapter, SourceError, SourceQuery};

/// Keeps the first record for each identity, preserving provider order.
pub fn dedupe(records: Vec<CandidateRecord>) -> Vec<CandidateRecord> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|r| {
            let fresh = seen.insert(r.identity.clone());
            if !fresh {
                debug!("dropping duplicate candidate {}", r.identity);
            }
            fresh
        })
        .collect()
}

/// Runs every enricher over every candidate with at most `fan_out` candidates
/// in flight. Output order matches input order regardless of completion order.
pub async fn enrich(
    records: Vec<CandidateRecord>,
    enrichers: &[Arc<dyn SourceAdapter>],
    fan_out: usize,
) -> Result<Vec<CandidateRecord>, SourceError> {
    let mut enriched: Vec<(usize, CandidateRecord)> = stream::iter(records.into_iter().enumerate())
        .map(|(index, record)| async move {
            enrich_one(record, enrichers).await.map(|r| (index, r))
        })
        .buffer_unordered(fan_out.max(1))
        .try_collect()
        .await?;

    enriched.sort_by_key(|(index, _)| *index);
    Ok(enriched.into_iter().map(|(_, record)| record).collect())
}

/// Enrichers are consulted in configured order; earlier sources win conflicts
/// because `absorb` only fills what is still missing.
async fn enrich_one(
    mut record: CandidateRecord,
    enrichers: &[Arc<dyn SourceAdapter>],
) -> Result<CandidateRecord, SourceError> {
    for enricher in enrichers {
        let query = SourceQuery::Profile {
            identity: record.identity.clone(),
        };
        for extra in enricher.fetch(&query).await? {
            if extra.identity != record.identity {
                warn!(
                    "{}: enrichment for {} returned {}, ignoring",
                    enricher.name(),
                    record.identity,
                    extra.identity
                );
                continue;
            }
            if record.absorb(extra) {
                debug!("{}: enriched {}", enricher.name(), record.identity);
            }
        }
    }
    Ok(record)
}

/// Scores every candidate and flags the ones under `min_confidence`.
pub fn score_all(
    job: &JobSpec,
    records: Vec<CandidateRecord>,
    weights: &Weights,
    min_confidence: f64,
) -> Result<Vec<ScoredCandidate>, ConfigurationError> {
    records
        .into_iter()
        .map(|candidate| {
            let mut score = scoring::score(job, &candidate, weights)?;
            if !ranking::meets_confidence(score.confidence, min_confidence) {
                score.low_confidence = true;
                warn!(
                    "job {}: {} is low confidence ({:.2} < {:.2})",
                    job.id, candidate.identity, score.confidence, min_confidence
                );
            }
            Ok(ScoredCandidate { candidate, score })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::candidate::fixtures::complete_candidate;
    use async_trait::async_trait;
    use std::collections::BTreeSet;
    use std::time::Duration;

    /// Returns a fixed enrichment per identity, slower for earlier candidates
    /// so completions arrive out of order.
    struct ProfileSource {
        name: &'static str,
        summary: &'static str,
    }

    #[async_trait]
    impl SourceAdapter for ProfileSource {
        fn name(&self) -> &str {
            self.name
        }

        async fn fetch(&self, query: &SourceQuery) -> Result<Vec<CandidateRecord>, SourceError> {
            let SourceQuery::Profile { identity } = query else {
                return Ok(vec![]);
            };
            let delay = 100 - identity.len() as u64 * 10;
            tokio::time::sleep(Duration::from_millis(delay)).await;

            let mut extra = complete_candidate(identity, &["Git"]);
            extra.experience_summary = Some(self.summary.to_string());
            extra.sources = vec![self.name.to_string()];
            Ok(vec![extra])
        }
    }

    fn sparse(identity: &str) -> CandidateRecord {
        let mut record = complete_candidate(identity, &["Python"]);
        record.experience_summary = None;
        record.location = None;
        record
    }

    #[tokio::test(start_paused = true)]
    async fn test_enrich_preserves_order_and_first_source_wins() {
        let enrichers: Vec<Arc<dyn SourceAdapter>> = vec![
            Arc::new(ProfileSource {
                name: "github",
                summary: "from github",
            }),
            Arc::new(ProfileSource {
                name: "social",
                summary: "from social",
            }),
        ];
        let records = vec![sparse("a"), sparse("bb"), sparse("ccc")];

        let enriched = enrich(records, &enrichers, 3).await.unwrap();

        let ids: Vec<_> = enriched.iter().map(|r| r.identity.as_str()).collect();
        assert_eq!(ids, vec!["a", "bb", "ccc"]);
        for record in &enriched {
            assert_eq!(record.experience_summary.as_deref(), Some("from github"));
            assert!(record.location.is_some());
            let skills: BTreeSet<_> = record.skills.iter().map(String::as_str).collect();
            assert_eq!(skills, BTreeSet::from(["Git", "Python"]));
            assert_eq!(record.sources, vec!["mock", "github"]);
        }
    }

    #[test]
    fn test_dedupe_keeps_first() {
        let mut second = complete_candidate("a", &["Rust"]);
        second.name = "Duplicate".to_string();
        let out = dedupe(vec![
            complete_candidate("a", &[]),
            complete_candidate("b", &[]),
            second,
        ]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].name, "Test Candidate");
    }

    #[test]
    fn test_score_all_flags_low_confidence() {
        let job = JobSpec {
            id: "j".to_string(),
            title: "ML Engineer".to_string(),
            company: String::new(),
            description: String::new(),
            requirements: vec![],
            location: "San Francisco, CA".to_string(),
            skills: BTreeSet::from(["Python".to_string()]),
            salary_range: None,
            remote: false,
        };
        let scored = score_all(
            &job,
            vec![complete_candidate("full", &["Python"]), sparse("sparse")],
            &Weights::default(),
            0.9,
        )
        .unwrap();
        assert!(!scored[0].score.low_confidence);
        assert!(scored[1].score.low_confidence);
    }

    #[test]
    fn test_threshold_rounding_is_not_flagged_when_ranked() {
        let job = JobSpec {
            id: "j".to_string(),
            title: "ML Engineer".to_string(),
            company: String::new(),
            description: String::new(),
            requirements: vec![],
            location: "San Francisco, CA".to_string(),
            skills: BTreeSet::from(["Python".to_string()]),
            salary_range: None,
            remote: false,
        };
        let candidate = sparse("edge");
        let confidence = scoring::confidence(&candidate);
        let threshold = confidence + 1e-12;

        let scored = score_all(&job, vec![candidate], &Weights::default(), threshold).unwrap();
        let result = ranking::rank(scored.clone(), 10, threshold);

        assert_eq!(result.len(), 1);
        assert!(!scored[0].score.low_confidence);
        assert!(!result.candidates[0].score.low_confidence);
    }
}
