//! Health check and metrics endpoints

use axum::{
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};

use crate::http::{AppError, AppState};

/// Health check router
pub fn create_health_router() -> Router<AppState> {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics))
}

/// Basic health check (always returns OK if server is running)
pub async fn health_check() -> impl IntoResponse {
    "OK"
}

/// Prometheus text exposition
pub async fn metrics() -> Result<impl IntoResponse, AppError> {
    let body = chunkrelay_core::metrics::gather_metrics().map_err(|e| {
        tracing::error!("Failed to gather metrics: {}", e);
        AppError::internal_server_error("Failed to gather metrics")
    })?;

    Ok((
        StatusCode::OK,
        [(header::CONTENT_TYPE, prometheus::TEXT_FORMAT)],
        body,
    ))
}
