//! Normalization boundary: provider JSON → `CandidateRecord`.
//!
//! Provider payloads are heterogeneous (camelCase vs snake_case keys, free-text
//! vs structured education and durations). Everything past this module sees
//! one canonical shape.

use std::collections::BTreeSet;

use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use crate::models::candidate::{CandidateRecord, CompanyTier, DegreeLevel, Education, RoleEntry};
use crate::source::SourceError;

const ELITE_EMPLOYERS: &[&str] = &[
    "google", "alphabet", "deepmind", "microsoft", "apple", "amazon", "meta", "facebook",
    "netflix", "uber", "airbnb", "stripe", "palantir", "nvidia", "openai", "anthropic",
    "salesforce", "oracle", "ibm", "intel", "amd",
];

const GROWTH_MARKERS: &[&str] = &["startup", "labs", "ai", "ventures"];

// ────────────────────────────────────────────────────────────────────────────
// Provider wire shapes
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    #[serde(alias = "data", alias = "candidates")]
    results: Vec<Value>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(untagged)]
enum TextOr<T> {
    Text(String),
    Structured(T),
    #[default]
    Missing,
}

#[derive(Debug, Default, Deserialize)]
struct StructuredLocation {
    city: Option<String>,
    #[serde(alias = "state")]
    region: Option<String>,
    country: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EducationEntry {
    #[serde(alias = "institution")]
    school: Option<String>,
    degree: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DurationField {
    Months(f64),
    Text(String),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExperienceEntry {
    #[serde(alias = "company")]
    name: Option<String>,
    title: Option<String>,
    duration: Option<DurationField>,
    #[serde(alias = "duration_months")]
    duration_months: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProviderProfile {
    #[serde(alias = "linkedin_url", alias = "profileUrl", alias = "profile_url")]
    linkedin_url: Option<String>,
    #[serde(alias = "fullName", alias = "full_name")]
    name: Option<String>,
    headline: Option<String>,
    #[serde(alias = "current_title")]
    current_title: Option<String>,
    #[serde(default)]
    location: TextOr<StructuredLocation>,
    summary: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default, alias = "additional_skills")]
    additional_skills: Vec<String>,
    #[serde(default)]
    education: TextOr<Vec<EducationEntry>>,
    #[serde(default, alias = "experience", alias = "experiences")]
    companies: Vec<ExperienceEntry>,
    #[serde(alias = "tenure_months")]
    tenure_months: Option<f64>,
    #[serde(alias = "avg_tenure_years")]
    avg_tenure_years: Option<f64>,
    #[serde(alias = "company_rating")]
    company_rating: Option<f64>,
}

// ────────────────────────────────────────────────────────────────────────────
// Entry points
// ────────────────────────────────────────────────────────────────────────────

/// Parses a search page. A bad envelope fails the page; a bad record is
/// dropped and logged so the rest of the page survives.
pub fn parse_search_page(provider: &str, body: &str) -> Result<Vec<CandidateRecord>, SourceError> {
    let envelope: SearchEnvelope =
        serde_json::from_str(body).map_err(|e| SourceError::MalformedResponse {
            provider: provider.to_string(),
            detail: format!("search envelope: {e}"),
        })?;

    let total = envelope.results.len();
    let records: Vec<CandidateRecord> = envelope
        .results
        .into_iter()
        .enumerate()
        .filter_map(|(i, item)| match normalize_profile(provider, item) {
            Ok(record) => Some(record),
            Err(reason) => {
                warn!("{provider}: dropping malformed record {i} of {total}: {reason}");
                None
            }
        })
        .collect();

    if records.len() < total {
        warn!(
            "{provider}: partial page, kept {} of {} records",
            records.len(),
            total
        );
    }
    Ok(records)
}

/// Parses a single-profile lookup. Accepts either the profile object at the
/// root or wrapped as `{"profile": {...}}`.
pub fn parse_profile(provider: &str, body: &str) -> Result<Vec<CandidateRecord>, SourceError> {
    let value: Value = serde_json::from_str(body).map_err(|e| SourceError::MalformedResponse {
        provider: provider.to_string(),
        detail: format!("profile body: {e}"),
    })?;
    let value = match value {
        Value::Object(mut map) if map.contains_key("profile") => {
            map.remove("profile").unwrap_or(Value::Null)
        }
        other => other,
    };

    match normalize_profile(provider, value) {
        Ok(record) => Ok(vec![record]),
        Err(reason) => {
            warn!("{provider}: dropping malformed profile: {reason}");
            Ok(vec![])
        }
    }
}

/// Maps one provider record to the canonical shape, or explains why it can't.
pub fn normalize_profile(provider: &str, raw: Value) -> Result<CandidateRecord, String> {
    let profile: ProviderProfile =
        serde_json::from_value(raw.clone()).map_err(|e| format!("shape mismatch: {e}"))?;

    let identity = clean(profile.linkedin_url).ok_or("missing profile identity")?;
    let name = clean(profile.name).ok_or("missing name")?;

    let role_history: Vec<RoleEntry> = profile
        .companies
        .iter()
        .filter_map(|exp| {
            let title = clean(exp.title.clone())?;
            Some(RoleEntry {
                title,
                company: clean(exp.name.clone()).unwrap_or_default(),
                duration_months: exp
                    .duration_months
                    .map(months_from_f64)
                    .or_else(|| exp.duration.as_ref().and_then(duration_months)),
            })
        })
        .collect();

    let current_role = clean(profile.current_title)
        .or_else(|| role_history.first().map(|r| r.title.clone()))
        .or_else(|| profile.headline.as_deref().and_then(title_from_headline));

    let tenure_months = profile
        .tenure_months
        .map(months_from_f64)
        .or_else(|| role_history.first().and_then(|r| r.duration_months))
        .or_else(|| profile.avg_tenure_years.map(|y| months_from_f64(y * 12.0)));

    let current_employer = role_history.first().map(|r| r.company.as_str());
    let company_tier = match profile.company_rating {
        Some(rating) if rating.is_finite() => {
            CompanyTier::Rated(if rating <= 1.0 { rating * 10.0 } else { rating })
        }
        _ => current_employer.map(tier_for_employer).unwrap_or_default(),
    };

    let skills: BTreeSet<String> = profile
        .skills
        .into_iter()
        .chain(profile.additional_skills)
        .filter_map(|s| clean(Some(s)))
        .collect();

    Ok(CandidateRecord {
        identity,
        name,
        current_role,
        location: normalize_location(profile.location),
        experience_summary: clean(profile.summary).or_else(|| clean(profile.headline)),
        skills,
        education: normalize_education(profile.education),
        tenure_months,
        company_tier,
        role_history,
        sources: vec![provider.to_string()],
        raw_source_payload: raw,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Field helpers
// ────────────────────────────────────────────────────────────────────────────

fn clean(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|v| !v.is_empty())
}

fn months_from_f64(months: f64) -> u32 {
    if months.is_finite() && months > 0.0 {
        months.round().min(f64::from(u32::MAX)) as u32
    } else {
        0
    }
}

/// "Senior Engineer at Acme" → "Senior Engineer". Headlines without " at "
/// that look like keyword lists ("React | Node.js") are not treated as titles.
fn title_from_headline(headline: &str) -> Option<String> {
    // Byte offsets come from the original text; " at " is ASCII so the match
    // always starts on a char boundary.
    let at = headline
        .as_bytes()
        .windows(4)
        .position(|w| w.eq_ignore_ascii_case(b" at "));
    let title = match at {
        Some(idx) => &headline[..idx],
        None if headline.contains('|') => headline.split('|').next().unwrap_or_default(),
        None => headline,
    };
    clean(Some(title.to_string()))
}

fn normalize_location(location: TextOr<StructuredLocation>) -> Option<String> {
    match location {
        TextOr::Text(text) => clean(Some(text)),
        TextOr::Structured(parts) => {
            let joined = [parts.city, parts.region, parts.country]
                .into_iter()
                .filter_map(clean)
                .collect::<Vec<_>>()
                .join(", ");
            clean(Some(joined))
        }
        TextOr::Missing => None,
    }
}

fn normalize_education(education: TextOr<Vec<EducationEntry>>) -> Vec<Education> {
    match education {
        TextOr::Structured(entries) => entries
            .into_iter()
            .filter(|e| e.school.is_some() || e.degree.is_some())
            .map(|e| {
                let degree = clean(e.degree);
                Education {
                    level: degree
                        .as_deref()
                        .map(DegreeLevel::classify)
                        .unwrap_or_default(),
                    school: clean(e.school),
                    degree,
                }
            })
            .collect(),
        TextOr::Text(text) => text
            .split(['\n', ';'])
            .filter_map(|line| clean(Some(line.to_string())))
            .map(|line| Education {
                level: DegreeLevel::classify(&line),
                school: None,
                degree: Some(line),
            })
            .collect(),
        TextOr::Missing => Vec::new(),
    }
}

/// Free-text or numeric durations to months: "2 years", "18 months",
/// "1 year 6 months", "1.5 yrs". Bare numbers are read as months.
fn duration_months(field: &DurationField) -> Option<u32> {
    match field {
        DurationField::Months(m) => Some(months_from_f64(*m)),
        DurationField::Text(text) => parse_duration_text(text),
    }
}

pub(crate) fn parse_duration_text(text: &str) -> Option<u32> {
    let lower = text.to_lowercase();
    let tokens: Vec<&str> = lower.split_whitespace().collect();
    let mut total = 0.0_f64;
    let mut matched = false;

    let mut i = 0;
    while i < tokens.len() {
        // Handles "2 years" as well as "2years" / "6mos".
        let token = tokens[i];
        let split_at = token
            .find(|c: char| !(c.is_ascii_digit() || c == '.'))
            .unwrap_or(token.len());
        let (number, attached_unit) = token.split_at(split_at);

        if let Ok(value) = number.parse::<f64>() {
            let unit = if attached_unit.is_empty() {
                i += 1;
                tokens.get(i).copied().unwrap_or_default()
            } else {
                attached_unit
            };
            if unit.starts_with('y') {
                total += value * 12.0;
                matched = true;
            } else if unit.starts_with("mo") || unit == "m" {
                total += value;
                matched = true;
            }
        }
        i += 1;
    }

    matched.then(|| months_from_f64(total))
}

fn tier_for_employer(company: &str) -> CompanyTier {
    let lower = company.to_lowercase();
    if lower.trim().is_empty() {
        return CompanyTier::Unknown;
    }
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    if ELITE_EMPLOYERS.iter().any(|e| tokens.contains(e)) {
        CompanyTier::Elite
    } else if GROWTH_MARKERS.iter().any(|m| tokens.contains(m)) {
        CompanyTier::Growth
    } else {
        CompanyTier::Established
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profile_json() -> Value {
        json!({
            "name": "Sarah Johnson",
            "linkedinUrl": "https://linkedin.com/in/sarah-johnson-123",
            "headline": "Senior Software Engineer at TechCorp",
            "location": "San Francisco, CA",
            "education": [
                {"school": "Stanford University", "degree": "MS Computer Science"},
                {"school": "UC Berkeley", "degree": "BS Computer Science"}
            ],
            "companies": [
                {"name": "TechCorp", "title": "Senior Software Engineer", "duration": "2 years"},
                {"name": "StartupXYZ", "title": "Software Engineer", "duration": "3 years"}
            ],
            "skills": ["Python", "  Kubernetes ", ""],
            "avgTenureYears": 2.0
        })
    }

    #[test]
    fn test_normalize_full_profile() {
        let record = normalize_profile("coresignal", profile_json()).unwrap();
        assert_eq!(record.identity, "https://linkedin.com/in/sarah-johnson-123");
        assert_eq!(record.current_role.as_deref(), Some("Senior Software Engineer"));
        assert_eq!(record.tenure_months, Some(24));
        assert_eq!(record.education[0].level, DegreeLevel::Professional);
        assert_eq!(record.role_history.len(), 2);
        assert_eq!(record.role_history[1].duration_months, Some(36));
        assert_eq!(record.company_tier, CompanyTier::Established);
        assert_eq!(record.skills.len(), 2);
        assert!(record.skills.contains("Kubernetes"));
        assert_eq!(record.sources, vec!["coresignal".to_string()]);
        assert_eq!(record.raw_source_payload, profile_json());
    }

    #[test]
    fn test_structured_location_and_text_education() {
        let record = normalize_profile(
            "p",
            json!({
                "profile_url": "https://example.com/u/1",
                "full_name": "Ana Ruiz",
                "location": {"city": "Austin", "state": "TX", "country": null},
                "education": "PhD Statistics; BA Mathematics",
                "tenureMonths": 14.4
            }),
        )
        .unwrap();
        assert_eq!(record.location.as_deref(), Some("Austin, TX"));
        assert_eq!(record.education.len(), 2);
        assert_eq!(record.education[0].level, DegreeLevel::Doctorate);
        assert_eq!(record.education[1].level, DegreeLevel::Bachelor);
        assert_eq!(record.tenure_months, Some(14));
        assert!(record.role_history.is_empty());
    }

    #[test]
    fn test_missing_identity_or_name_is_rejected() {
        assert!(normalize_profile("p", json!({"name": "No Url"})).is_err());
        assert!(normalize_profile("p", json!({"linkedinUrl": "https://x/y"})).is_err());
        assert!(normalize_profile("p", json!({"linkedinUrl": "https://x/y", "name": 42})).is_err());
    }

    #[test]
    fn test_search_page_drops_bad_records_keeps_rest() {
        let body = json!({
            "results": [
                profile_json(),
                {"name": "Missing Url"},
                "not an object",
                {"linkedinUrl": "https://x/2", "name": "Second"}
            ]
        })
        .to_string();
        let records = parse_search_page("p", &body).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].identity, "https://x/2");
    }

    #[test]
    fn test_search_page_bad_envelope_fails() {
        let err = parse_search_page("p", "<html>oops</html>").unwrap_err();
        assert!(matches!(err, SourceError::MalformedResponse { .. }));
        assert!(parse_search_page("p", r#"{"total": 3}"#).is_err());
    }

    #[test]
    fn test_profile_wrapped_or_bare() {
        let wrapped = json!({"profile": profile_json()}).to_string();
        assert_eq!(parse_profile("p", &wrapped).unwrap().len(), 1);
        let bare = profile_json().to_string();
        assert_eq!(parse_profile("p", &bare).unwrap().len(), 1);
        assert!(parse_profile("p", r#"{"name": "x"}"#).unwrap().is_empty());
    }

    #[test]
    fn test_parse_duration_text_variants() {
        assert_eq!(parse_duration_text("2 years"), Some(24));
        assert_eq!(parse_duration_text("18 months"), Some(18));
        assert_eq!(parse_duration_text("1 year 6 months"), Some(18));
        assert_eq!(parse_duration_text("1.5 yrs"), Some(18));
        assert_eq!(parse_duration_text("6mos"), Some(6));
        assert_eq!(parse_duration_text("a while"), None);
    }

    #[test]
    fn test_company_rating_and_employer_tiers() {
        let mut raw = profile_json();
        raw["companyRating"] = json!(0.8);
        let record = normalize_profile("p", raw).unwrap();
        assert_eq!(record.company_tier, CompanyTier::Rated(8.0));

        assert_eq!(tier_for_employer("Google LLC"), CompanyTier::Elite);
        assert_eq!(tier_for_employer("Acme AI"), CompanyTier::Growth);
        assert_eq!(tier_for_employer("Ametek"), CompanyTier::Established);
        assert_eq!(tier_for_employer(""), CompanyTier::Unknown);
    }

    #[test]
    fn test_title_from_headline() {
        assert_eq!(
            title_from_headline("Staff Engineer at Stripe").as_deref(),
            Some("Staff Engineer")
        );
        assert_eq!(
            title_from_headline("Full Stack Developer | React | Node.js").as_deref(),
            Some("Full Stack Developer")
        );
        assert_eq!(
            title_from_headline("Lead Designer AT Figma").as_deref(),
            Some("Lead Designer")
        );
    }

    #[test]
    fn test_non_ascii_headline_keeps_char_boundaries() {
        // Lower-casing 'İ' grows it by a byte, so offsets must come from the original text.
        assert_eq!(
            title_from_headline("İİİİİ at Éclair").as_deref(),
            Some("İİİİİ")
        );
        let record = normalize_profile(
            "p",
            json!({
                "linkedinUrl": "https://x/unicode",
                "name": "A",
                "headline": "Ingénieure Logiciel Senior at Société Générale"
            }),
        )
        .unwrap();
        assert_eq!(record.current_role.as_deref(), Some("Ingénieure Logiciel Senior"));
    }
}
