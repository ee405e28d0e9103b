// Module: http
// HTTP transport for the chunk relay, compatible with the browser client

pub mod chunks;
pub mod error;
pub mod health;
pub mod streams;

use axum::{extract::DefaultBodyLimit, Router};
use chunkrelay_core::ChunkRelay;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

pub use error::{AppError, AppResult};

/// Room for multipart boundaries and the text fields around the chunk
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub relay: Arc<ChunkRelay>,
}

impl AppState {
    #[must_use]
    pub fn new(relay: Arc<ChunkRelay>) -> Self {
        Self { relay }
    }
}

/// Build the relay router.
///
/// `static_dir`, when set, is served as the fallback so the browser client
/// and the API share one origin.
pub fn create_router(state: AppState, static_dir: Option<&str>) -> Router {
    let body_limit = state
        .relay
        .limits()
        .max_chunk_bytes
        .saturating_add(MULTIPART_OVERHEAD);

    let router = Router::new()
        .merge(chunks::create_chunk_router())
        .merge(streams::create_streams_router())
        .merge(health::create_health_router())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http());

    // Apply state to all routes (must be last)
    let router = router.with_state(state);

    match static_dir {
        Some(dir) => {
            tracing::info!("Serving static files from {}", dir);
            router.fallback_service(ServeDir::new(dir))
        }
        None => router,
    }
}
