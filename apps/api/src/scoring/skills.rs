//! Skill canonicalization and synonym/related-skill matching.

use std::collections::BTreeSet;

/// Aliases folded onto one canonical spelling before any comparison.
const SYNONYMS: &[(&str, &str)] = &[
    ("k8s", "kubernetes"),
    ("js", "javascript"),
    ("ecmascript", "javascript"),
    ("ts", "typescript"),
    ("golang", "go"),
    ("torch", "pytorch"),
    ("tf", "tensorflow"),
    ("postgres", "postgresql"),
    ("psql", "postgresql"),
    ("nodejs", "node.js"),
    ("node", "node.js"),
    ("reactjs", "react"),
    ("react.js", "react"),
    ("vuejs", "vue.js"),
    ("vue", "vue.js"),
    ("angularjs", "angular"),
    ("ml", "machine learning"),
    ("dl", "deep learning"),
    ("amazon web services", "aws"),
    ("google cloud", "gcp"),
    ("google cloud platform", "gcp"),
    ("microsoft azure", "azure"),
    ("py", "python"),
    ("python3", "python"),
    ("c++", "cpp"),
    ("csharp", "c#"),
    ("springboot", "spring boot"),
    ("sklearn", "scikit-learn"),
    ("mongo", "mongodb"),
];

/// Skills in the same family earn half credit for one another.
const FAMILIES: &[&[&str]] = &[
    &["pytorch", "tensorflow", "jax", "keras", "mxnet"],
    &["react", "vue.js", "angular", "svelte"],
    &["aws", "gcp", "azure"],
    &["postgresql", "mysql", "sqlite", "mariadb", "sql server"],
    &["mongodb", "dynamodb", "cassandra", "couchbase"],
    &["docker", "kubernetes", "podman", "nomad"],
    &["kafka", "rabbitmq", "pulsar", "kinesis"],
    &["django", "flask", "fastapi"],
    &["javascript", "typescript"],
    &["spring boot", "micronaut", "quarkus"],
    &["scikit-learn", "xgboost", "lightgbm"],
    &["machine learning", "deep learning"],
];

/// Lower-cases, trims, collapses whitespace, and resolves known aliases.
pub fn canonical_skill(raw: &str) -> String {
    let collapsed = raw
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase();
    SYNONYMS
        .iter()
        .find(|(alias, _)| *alias == collapsed)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or(collapsed)
}

fn family_of(canonical: &str) -> Option<usize> {
    FAMILIES
        .iter()
        .position(|family| family.contains(&canonical))
}

/// Credit earned per required skill: 1.0 exact, 0.5 related, 0.0 missing.
///
/// A candidate skill that exactly matches one required skill cannot also
/// grant related credit to another required skill.
pub fn skill_credits<'a, J, C>(required: J, held: C) -> Vec<(String, f64)>
where
    J: IntoIterator<Item = &'a String>,
    C: IntoIterator<Item = &'a String>,
{
    let required: BTreeSet<String> = required.into_iter().map(|s| canonical_skill(s)).collect();
    let held: BTreeSet<String> = held.into_iter().map(|s| canonical_skill(s)).collect();

    let spare: Vec<&String> = held.iter().filter(|s| !required.contains(*s)).collect();

    required
        .into_iter()
        .map(|skill| {
            let credit = if held.contains(&skill) {
                1.0
            } else {
                match family_of(&skill) {
                    Some(family) if spare.iter().any(|s| family_of(s) == Some(family)) => 0.5,
                    _ => 0.0,
                }
            };
            (skill, credit)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_canonical_skill_resolves_aliases_and_case() {
        assert_eq!(canonical_skill("K8s"), "kubernetes");
        assert_eq!(canonical_skill("  PyTorch "), "pytorch");
        assert_eq!(canonical_skill("Google   Cloud"), "gcp");
        assert_eq!(canonical_skill("Rust"), "rust");
    }

    #[test]
    fn test_exact_match_case_insensitive() {
        let credits = skill_credits(&strings(&["PyTorch"]), &strings(&["pytorch"]));
        assert_eq!(credits, vec![("pytorch".to_string(), 1.0)]);
    }

    #[test]
    fn test_related_skill_earns_half() {
        let credits = skill_credits(&strings(&["TensorFlow"]), &strings(&["JAX"]));
        assert_eq!(credits[0].1, 0.5);
    }

    #[test]
    fn test_exact_match_does_not_double_as_related() {
        let credits = skill_credits(
            &strings(&["PyTorch", "TensorFlow"]),
            &strings(&["PyTorch", "Docker"]),
        );
        let total: f64 = credits.iter().map(|(_, c)| c).sum();
        assert_eq!(total, 1.0);
    }

    #[test]
    fn test_unrelated_skill_earns_nothing() {
        let credits = skill_credits(&strings(&["Kafka"]), &strings(&["Photoshop"]));
        assert_eq!(credits[0].1, 0.0);
    }
}
