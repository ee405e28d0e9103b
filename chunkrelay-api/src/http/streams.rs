//! Read-only stream statistics for monitoring

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use chunkrelay_core::relay::StreamStats;

use crate::http::{AppError, AppResult, AppState};

pub fn create_streams_router() -> Router<AppState> {
    Router::new()
        .route("/streams", get(list_streams))
        .route("/streams/{stream_id}", get(get_stream))
}

/// GET /streams
pub async fn list_streams(State(state): State<AppState>) -> Json<Vec<StreamStats>> {
    Json(state.relay.registry().snapshot())
}

/// GET /streams/{stream_id}
pub async fn get_stream(
    State(state): State<AppState>,
    Path(stream_id): Path<String>,
) -> AppResult<Json<StreamStats>> {
    state
        .relay
        .registry()
        .stats(&stream_id)
        .map(Json)
        .ok_or_else(|| AppError::not_found("Stream not found").with_details(stream_id))
}
