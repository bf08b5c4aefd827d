use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::state::AppState;

/// GET /health
/// Returns service status plus the provider mode and cache backend in use.
pub async fn health_handler(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    let cache_backend = if config.cache.redis_url.is_some() {
        "redis"
    } else {
        "memory"
    };
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "service": "scout-api",
        "provider": {
            "name": config.provider.name,
            "mock": config.provider.use_mock
        },
        "cache": {
            "enabled": config.cache.enabled,
            "backend": cache_backend
        }
    }))
}
