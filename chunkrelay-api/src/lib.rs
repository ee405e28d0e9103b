//! HTTP API for the chunk relay

pub mod http;

use std::net::SocketAddr;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

pub use http::{create_router, AppError, AppResult, AppState};

/// Bind `address` and serve `state` until `shutdown` is cancelled.
pub async fn serve(
    address: &str,
    state: AppState,
    static_dir: Option<&str>,
    shutdown: CancellationToken,
) -> anyhow::Result<()> {
    let app = create_router(state, static_dir);
    let listener = TcpListener::bind(address).await?;
    let local: SocketAddr = listener.local_addr()?;

    tracing::info!("HTTP server listening on http://{}", local);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    tracing::info!("HTTP server stopped");
    Ok(())
}
