pub mod health;
pub mod runs;

use axum::{
    routing::{get, post},
    Router,
};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health_handler))
        // Runs API
        .route("/api/v1/runs", post(runs::handle_submit_run))
        .route("/api/v1/runs/batch", post(runs::handle_submit_batch))
        .route("/api/v1/runs/:job_id", get(runs::handle_get_run))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, Config, ProviderConfig};
    use crate::pipeline::PipelineSettings;
    use crate::source::retry::RetryPolicy;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tower::ServiceExt;

    fn mock_config() -> Config {
        Config {
            provider: ProviderConfig {
                name: "mock".to_string(),
                base_url: String::new(),
                api_key: String::new(),
                use_mock: true,
                request_timeout: Duration::from_secs(5),
                rate_limit_delay: Duration::ZERO,
                retry: RetryPolicy::default(),
            },
            cache: CacheConfig {
                enabled: true,
                redis_url: None,
                ttl: Duration::from_secs(60),
                op_timeout: Duration::from_secs(1),
            },
            pipeline: PipelineSettings::default(),
            port: 0,
            rust_log: "info".to_string(),
        }
    }

    fn app() -> Router {
        build_router(AppState::from_config(mock_config()).unwrap())
    }

    async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(body.map_or_else(Body::empty, |b| Body::from(b.to_string())))
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn devops_job(id: &str) -> Value {
        json!({
            "id": id,
            "title": "DevOps Engineer",
            "company": "Windfall Data",
            "location": "Denver, CO",
            "skills": ["Kubernetes", "AWS", "Terraform"]
        })
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body) = call(&app(), "GET", "/health", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["provider"]["mock"], true);
    }

    #[tokio::test]
    async fn test_submit_then_query_state() {
        let app = app();
        let (status, body) = call(
            &app,
            "POST",
            "/api/v1/runs",
            Some(json!({ "job": devops_job("job-1"), "max_candidates": 3, "draft_outreach": true })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let ranked = body["result"]["candidates"].as_array().unwrap();
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0]["candidate"]["name"], "Lisa Thompson");
        assert_eq!(body["outreach"].as_array().unwrap().len(), 3);

        let (status, snapshot) = call(&app, "GET", "/api/v1/runs/job-1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["state"], "completed");
    }

    #[tokio::test]
    async fn test_unknown_run_is_404() {
        let (status, body) = call(&app(), "GET", "/api/v1/runs/nope", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }

    #[tokio::test]
    async fn test_bad_weights_rejected_with_400() {
        let (status, body) = call(
            &app(),
            "POST",
            "/api/v1/runs",
            Some(json!({
                "job": devops_job("job-1"),
                "weights": {
                    "education": 0.3, "trajectory": 0.2, "company": 0.15,
                    "skills": 0.25, "location": 0.1, "tenure": 0.1
                }
            })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "CONFIGURATION_ERROR");
    }

    #[tokio::test]
    async fn test_batch_reports_per_job_outcomes() {
        let mut untitled = devops_job("job-2");
        untitled["title"] = json!("");
        let (status, body) = call(
            &app(),
            "POST",
            "/api/v1/runs/batch",
            Some(json!({ "jobs": [{ "job": devops_job("job-1") }, { "job": untitled }] })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let runs = body["runs"].as_array().unwrap();
        assert_eq!(runs.len(), 2);
        assert!(runs[0]["run"]["result"]["candidates"].is_array());
        assert_eq!(runs[1]["error"]["code"], "CONFIGURATION_ERROR");

        let (status, _) = call(&app(), "POST", "/api/v1/runs/batch", Some(json!({ "jobs": [] }))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
