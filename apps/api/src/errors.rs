use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::outreach::OutreachError;
use crate::pipeline::PipelineError;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("Outreach error: {0}")]
    Outreach(#[from] OutreachError),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status, stable error code, and client-facing message.
    pub fn parts(&self) -> (StatusCode, &'static str, String) {
        match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg.clone()),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone()),
            AppError::Pipeline(e) => {
                let status = match e {
                    PipelineError::Configuration(_) => StatusCode::BAD_REQUEST,
                    PipelineError::DuplicateRun { .. } => StatusCode::CONFLICT,
                    PipelineError::Failed { .. } => StatusCode::BAD_GATEWAY,
                    PipelineError::Overloaded => StatusCode::SERVICE_UNAVAILABLE,
                    PipelineError::TimedOut { .. } => StatusCode::GATEWAY_TIMEOUT,
                };
                (status, pipeline_code(e), e.to_string())
            }
            AppError::Outreach(e) => {
                tracing::error!("Outreach error: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "OUTREACH_ERROR",
                    "Outreach drafting failed".to_string(),
                )
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal server error occurred".to_string(),
                )
            }
        }
    }
}

fn pipeline_code(e: &PipelineError) -> &'static str {
    match e {
        PipelineError::Configuration(_) => "CONFIGURATION_ERROR",
        PipelineError::DuplicateRun { .. } => "DUPLICATE_RUN",
        PipelineError::Overloaded => "OVERLOADED",
        PipelineError::TimedOut { .. } => "TIMED_OUT",
        PipelineError::Failed { source, .. } => match source.kind() {
            crate::source::SourceErrorKind::AuthError => "UPSTREAM_AUTH_ERROR",
            crate::source::SourceErrorKind::RateLimited => "UPSTREAM_RATE_LIMITED",
            crate::source::SourceErrorKind::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            crate::source::SourceErrorKind::MalformedResponse => "UPSTREAM_MALFORMED_RESPONSE",
        },
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = self.parts();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
