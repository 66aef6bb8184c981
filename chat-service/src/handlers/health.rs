use crate::services::get_metrics;
use crate::startup::AppState;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

const SERVICE_NAME: &str = "chat-service";

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.chat.store().health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": SERVICE_NAME,
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => {
            tracing::warn!(error = %e, "Health check failed - store unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(json!({
                    "status": "unhealthy",
                    "service": SERVICE_NAME,
                    "error": "store unavailable"
                })),
            )
        }
    }
}

pub async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.chat.store().health_check().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            tracing::warn!(error = %e, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

/// Liveness summary for the frontend.
pub async fn status(State(state): State<AppState>) -> impl IntoResponse {
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "env": state.config.environment.as_str()
    }))
}

pub async fn root() -> &'static str {
    "Backend is running"
}

pub async fn not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "API endpoint not found" })),
    )
}
