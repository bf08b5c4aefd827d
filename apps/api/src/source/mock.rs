//! Offline transport serving a fixed synthetic roster in the provider's own
//! wire shape, so mock mode exercises the same normalization path.

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::debug;

use crate::source::provider::{ENRICH_PATH, SEARCH_PATH};
use crate::source::transport::{ProviderRequest, ProviderResponse, ProviderTransport, TransportError};

#[derive(Debug, Default, Clone)]
pub struct MockTransport;

impl MockTransport {
    pub fn new() -> Self {
        Self
    }

    fn roster() -> Vec<Value> {
        vec![
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
                    {"name": "StartupXYZ", "title": "Software Engineer", "duration": "3 years"},
                    {"name": "BigTech Inc", "title": "Junior Developer", "duration": "1 year"}
                ],
                "skills": ["Python", "JavaScript", "React", "Node.js", "AWS", "Docker", "Kubernetes"],
                "avgTenureYears": 2.0
            }),
            json!({
                "name": "Michael Chen",
                "linkedinUrl": "https://linkedin.com/in/michael-chen-456",
                "headline": "Full Stack Developer | React | Node.js | Python",
                "location": "New York, NY",
                "education": [{"school": "MIT", "degree": "BS Computer Science"}],
                "companies": [
                    {"name": "FinTech Solutions", "title": "Full Stack Developer", "duration": "3 years"},
                    {"name": "Digital Innovations", "title": "Frontend Developer", "duration": "2 years"}
                ],
                "skills": ["React", "Node.js", "Python", "TypeScript", "MongoDB", "PostgreSQL", "GraphQL"],
                "avgTenureYears": 2.5
            }),
            json!({
                "name": "Emily Rodriguez",
                "linkedinUrl": "https://linkedin.com/in/emily-rodriguez-789",
                "headline": "Software Engineer specializing in Backend Development",
                "location": "Austin, TX",
                "education": [{"school": "University of Texas", "degree": "BS Computer Science"}],
                "companies": [
                    {"name": "CloudTech", "title": "Backend Engineer", "duration": "2 years"},
                    {"name": "DataFlow Inc", "title": "Software Engineer", "duration": "1 year"}
                ],
                "skills": ["Python", "Java", "Spring Boot", "PostgreSQL", "Redis", "Kafka", "Docker"],
                "avgTenureYears": 1.5
            }),
            json!({
                "name": "David Kim",
                "linkedinUrl": "https://linkedin.com/in/david-kim-101",
                "headline": "Senior Frontend Developer | React | Vue.js | UI/UX",
                "location": "Seattle, WA",
                "education": [{"school": "University of Washington", "degree": "BS Computer Science"}],
                "companies": [
                    {"name": "WebSolutions", "title": "Senior Frontend Developer", "duration": "4 years"},
                    {"name": "DesignStudio", "title": "Frontend Developer", "duration": "2 years"}
                ],
                "skills": ["React", "Vue.js", "JavaScript", "TypeScript", "CSS3", "SASS", "Webpack"],
                "avgTenureYears": 3.0
            }),
            json!({
                "name": "Lisa Thompson",
                "linkedinUrl": "https://linkedin.com/in/lisa-thompson-202",
                "headline": "DevOps Engineer | AWS | Kubernetes | CI/CD",
                "location": "Denver, CO",
                "education": [{"school": "Colorado State University", "degree": "BS Information Technology"}],
                "companies": [
                    {"name": "CloudOps", "title": "DevOps Engineer", "duration": "3 years"},
                    {"name": "InfraTech", "title": "System Administrator", "duration": "2 years"}
                ],
                "skills": ["AWS", "Kubernetes", "Docker", "Jenkins", "Terraform", "Ansible", "Linux"],
                "avgTenureYears": 2.5
            }),
            json!({
                "name": "Alex Martinez",
                "linkedinUrl": "https://linkedin.com/in/alex-martinez-303",
                "headline": "Machine Learning Engineer | Python | TensorFlow | Data Science",
                "location": "Boston, MA",
                "education": [
                    {"school": "Harvard University", "degree": "MS Data Science"},
                    {"school": "Boston University", "degree": "BS Mathematics"}
                ],
                "companies": [
                    {"name": "AITech", "title": "ML Engineer", "duration": "2 years"},
                    {"name": "DataCorp", "title": "Data Scientist", "duration": "1 year"}
                ],
                "skills": ["Python", "TensorFlow", "PyTorch", "Scikit-learn", "Pandas", "NumPy", "SQL"],
                "avgTenureYears": 1.5
            }),
        ]
    }

    fn search(request: &ProviderRequest) -> ProviderResponse {
        let param = |key: &str| {
            request
                .query
                .iter()
                .find(|(k, _)| k == key)
                .and_then(|(_, v)| v.parse::<usize>().ok())
        };
        let limit = param("limit").unwrap_or(usize::MAX);
        let offset = param("offset").unwrap_or(0);

        let results: Vec<Value> = Self::roster().into_iter().skip(offset).take(limit).collect();
        ProviderResponse::ok(json!({ "results": results }).to_string())
    }

    fn enrich(request: &ProviderRequest) -> ProviderResponse {
        let identity = request
            .body
            .as_ref()
            .and_then(|b| b.get("linkedin_url"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let Some(base) = Self::roster()
            .into_iter()
            .find(|p| p["linkedinUrl"].as_str() == Some(identity))
        else {
            return ProviderResponse::status(404);
        };

        let name = base["name"].as_str().unwrap_or_default();
        let headline = base["headline"].as_str().unwrap_or_default();
        ProviderResponse::ok(
            json!({
                "profile": {
                    "linkedinUrl": identity,
                    "name": name,
                    "summary": format!("{name}: {headline}. Open to new opportunities."),
                    "additionalSkills": ["Git", "Agile", "CI/CD"]
                }
            })
            .to_string(),
        )
    }
}

#[async_trait]
impl ProviderTransport for MockTransport {
    async fn send(&self, request: &ProviderRequest) -> Result<ProviderResponse, TransportError> {
        debug!("mock transport: {:?} {}", request.method, request.path);
        Ok(match request.path.as_str() {
            SEARCH_PATH => Self::search(request),
            ENRICH_PATH => Self::enrich(request),
            _ => ProviderResponse::status(404),
        })
    }
}
