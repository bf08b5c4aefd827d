//! Per-criterion sub-scores. Every function returns a value in [0, 10].

use crate::models::candidate::{CandidateRecord, CompanyTier, DegreeLevel};
use crate::models::job::JobSpec;
use crate::scoring::skills::skill_credits;

/// Used when a criterion has nothing to compare against.
pub const NEUTRAL_SCORE: f64 = 5.0;

const PRESTIGIOUS_SCHOOLS: &[&str] = &[
    "stanford", "mit", "massachusetts institute of technology", "harvard", "berkeley", "cmu",
    "carnegie mellon", "caltech", "oxford", "cambridge", "eth zurich",
];

/// Cities that count as one commuting area.
const METRO_AREAS: &[&[&str]] = &[
    &[
        "san francisco", "oakland", "san jose", "palo alto", "mountain view", "sunnyvale",
        "berkeley", "menlo park", "redwood city", "bay area",
    ],
    &["new york", "new york city", "nyc", "brooklyn", "manhattan", "jersey city", "hoboken"],
    &["seattle", "bellevue", "redmond", "kirkland"],
    &["los angeles", "santa monica", "pasadena", "irvine"],
    &["boston", "cambridge", "somerville"],
    &["austin", "round rock"],
    &["london", "greater london"],
];

pub fn skills_score(job: &JobSpec, candidate: &CandidateRecord) -> f64 {
    if job.skills.is_empty() {
        return NEUTRAL_SCORE;
    }
    let credits = skill_credits(&job.skills, &candidate.skills);
    let earned: f64 = credits.iter().map(|(_, credit)| credit).sum();
    (earned / credits.len() as f64 * 10.0).clamp(0.0, 10.0)
}

fn degree_points(level: DegreeLevel) -> f64 {
    match level {
        DegreeLevel::Doctorate => 10.0,
        DegreeLevel::Professional => 8.5,
        DegreeLevel::Bachelor => 7.0,
        DegreeLevel::Associate => 5.0,
        DegreeLevel::Unspecified => 4.0,
        DegreeLevel::Secondary => 3.5,
    }
}

/// Highest degree across entries, plus one point for a well-known school.
pub fn education_score(candidate: &CandidateRecord) -> f64 {
    let best = candidate
        .education
        .iter()
        .map(|e| degree_points(e.level))
        .reduce(f64::max)
        .unwrap_or_else(|| degree_points(DegreeLevel::Unspecified));

    let school_bonus = candidate
        .education
        .iter()
        .filter_map(|e| e.school.as_deref())
        .any(is_prestigious_school);

    (best + if school_bonus { 1.0 } else { 0.0 }).min(10.0)
}

fn is_prestigious_school(school: &str) -> bool {
    let lower = school.to_lowercase();
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    PRESTIGIOUS_SCHOOLS.iter().any(|name| {
        if name.contains(' ') {
            lower.contains(name)
        } else {
            tokens.contains(name)
        }
    })
}

/// Seniority ladder inferred from a title. Higher is more senior.
pub fn seniority_level(title: &str) -> u8 {
    let lower = title.to_lowercase().replace('.', "");
    let tokens: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .collect();
    let has = |words: &[&str]| tokens.iter().any(|t| words.contains(t));

    if has(&["chief", "cto", "ceo", "cio", "vp", "svp", "evp"])
        || lower.contains("vice president")
        || lower.contains("head of")
    {
        7
    } else if has(&["director"]) {
        6
    } else if has(&["principal", "distinguished", "architect"]) {
        5
    } else if has(&["staff", "lead", "manager"]) {
        4
    } else if has(&["senior", "sr"]) {
        3
    } else if has(&["junior", "jr", "graduate", "entry"]) {
        1
    } else if has(&["intern", "internship", "trainee", "apprentice"]) {
        0
    } else {
        2
    }
}

/// Scores the direction of the candidate's title progression.
///
/// Strictly non-declining progression with at least one promotion scores
/// 8–10, flat history 5, mixed 3–7, and steady decline 1–3.
pub fn trajectory_score(candidate: &CandidateRecord) -> f64 {
    if candidate.role_history.len() < 2 {
        return NEUTRAL_SCORE;
    }

    // Oldest role first.
    let levels: Vec<i32> = candidate
        .role_history
        .iter()
        .rev()
        .map(|r| i32::from(seniority_level(&r.title)))
        .collect();

    let (ups, downs) = levels
        .windows(2)
        .fold((0_i32, 0_i32), |(up, down), pair| match pair[1].cmp(&pair[0]) {
            std::cmp::Ordering::Greater => (up + 1, down),
            std::cmp::Ordering::Less => (up, down + 1),
            std::cmp::Ordering::Equal => (up, down),
        });

    match (ups, downs) {
        (0, 0) => NEUTRAL_SCORE,
        (up, 0) => (7.0 + 1.5 * f64::from(up)).min(10.0),
        (0, down) => (4.0 - f64::from(down)).max(1.0),
        (up, down) => (5.0 + f64::from(up - down)).clamp(3.0, 7.0),
    }
}

pub fn company_score(candidate: &CandidateRecord) -> f64 {
    match candidate.company_tier {
        CompanyTier::Elite => 10.0,
        CompanyTier::Growth => 7.5,
        CompanyTier::Established => 6.5,
        CompanyTier::Unknown => NEUTRAL_SCORE,
        CompanyTier::Rated(rating) if rating.is_finite() => rating.clamp(0.0, 10.0),
        CompanyTier::Rated(_) => NEUTRAL_SCORE,
    }
}

fn location_parts(location: &str) -> Vec<String> {
    location
        .split(',')
        .map(|p| p.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase())
        .filter(|p| !p.is_empty())
        .collect()
}

fn metro_of(city: &str) -> Option<usize> {
    METRO_AREAS.iter().position(|area| area.contains(&city))
}

/// Exact match 10, same city 9, same metro area 8, same state/region 6,
/// otherwise 2. Remote roles score 10 for everyone.
pub fn location_score(job: &JobSpec, candidate: &CandidateRecord) -> f64 {
    if job.is_remote() {
        return 10.0;
    }
    let candidate_location = match candidate.location.as_deref() {
        Some(loc) if !loc.trim().is_empty() => loc,
        _ => return NEUTRAL_SCORE,
    };
    if job.location.trim().is_empty() {
        return NEUTRAL_SCORE;
    }

    let job_parts = location_parts(&job.location);
    let candidate_parts = location_parts(candidate_location);
    if job_parts == candidate_parts {
        return 10.0;
    }

    match (job_parts.first(), candidate_parts.first()) {
        (Some(job_city), Some(candidate_city)) if job_city == candidate_city => return 9.0,
        (Some(job_city), Some(candidate_city)) => {
            if let (Some(a), Some(b)) = (metro_of(job_city), metro_of(candidate_city)) {
                if a == b {
                    return 8.0;
                }
            }
        }
        _ => {}
    }

    match (job_parts.get(1), candidate_parts.get(1)) {
        (Some(job_region), Some(candidate_region)) if job_region == candidate_region => 6.0,
        _ => 2.0,
    }
}

/// Banded, non-monotonic: 1–4 years is the healthy band.
pub fn tenure_score(candidate: &CandidateRecord) -> f64 {
    match candidate.tenure_months {
        None => NEUTRAL_SCORE,
        Some(m) if m < 6 => 2.0,
        Some(m) if m < 12 => 6.0,
        Some(m) if m <= 48 => 10.0,
        Some(m) if m <= 84 => 7.0,
        Some(_) => 4.0,
    }
}
