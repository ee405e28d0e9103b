//! Relay server lifecycle
//!
//! Manages the startup and shutdown of all server components:
//! - HTTP transport
//! - Retention sweeper
//! - Archive workers

use std::sync::Arc;
use std::time::Duration;

use chunkrelay_api::AppState;
use chunkrelay_core::archive::{ArchiveQueue, ArchiveWorkers, Archiver, ObjectStoreArchiver, PinataArchiver};
use chunkrelay_core::config::{ArchiveBackend, ArchiveConfig};
use chunkrelay_core::{ChunkRelay, Config, RelayLimits, RetentionPolicy, StreamRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

pub struct RelayServer {
    config: Config,
    relay: Arc<ChunkRelay>,
    archive_workers: Option<ArchiveWorkers>,
}

impl RelayServer {
    /// Wire the relay, its archive queue and workers from configuration.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn build(config: Config) -> anyhow::Result<Self> {
        let (archive_queue, archive_workers) = match build_archiver(&config.archive)? {
            Some(archiver) => {
                let (queue, workers) = ArchiveQueue::start(
                    archiver,
                    config.archive.workers,
                    config.archive.queue_capacity,
                );
                (Some(queue), Some(workers))
            }
            None => {
                info!("Archival disabled");
                (None, None)
            }
        };

        let relay = Arc::new(ChunkRelay::new(
            Arc::new(StreamRegistry::new()),
            RelayLimits::from(&config.relay),
            archive_queue,
        ));

        Ok(Self {
            config,
            relay,
            archive_workers,
        })
    }

    /// Start all components and wait for a shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        let shutdown = CancellationToken::new();

        let sweeper = self
            .relay
            .sweeper(RetentionPolicy::from(&self.config.relay))
            .spawn(shutdown.child_token());

        let address = self.config.http_address();
        let static_dir = self.config.server.static_dir.clone();
        let state = AppState::new(Arc::clone(&self.relay));
        let http_shutdown = shutdown.child_token();
        let mut http_handle = tokio::spawn(async move {
            chunkrelay_api::serve(&address, state, static_dir.as_deref(), http_shutdown).await
        });

        info!("All servers started successfully");

        tokio::select! {
            result = &mut http_handle => {
                match result {
                    Ok(Ok(())) => warn!("HTTP server stopped"),
                    Ok(Err(e)) => error!("HTTP server failed: {}", e),
                    Err(e) => error!("HTTP server task panicked: {}", e),
                }
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
            }
        }

        shutdown.cancel();
        if !http_handle.is_finished() {
            if let Err(e) = http_handle.await {
                error!("HTTP server task failed during shutdown: {}", e);
            }
        }
        if let Err(e) = sweeper.await {
            error!("Retention sweeper task failed: {}", e);
        }

        if let Some(workers) = self.archive_workers {
            let grace = Duration::from_secs(self.config.archive.shutdown_grace_seconds);
            workers.shutdown(grace).await;
        }

        info!(
            streams = self.relay.registry().len(),
            "Chunk relay stopped, buffered chunks discarded"
        );
        Ok(())
    }
}

/// Build the archiver selected by `archive.backend`, if any
fn build_archiver(config: &ArchiveConfig) -> anyhow::Result<Option<Arc<dyn Archiver>>> {
    let archiver: Arc<dyn Archiver> = match config.backend {
        ArchiveBackend::None => return Ok(None),
        ArchiveBackend::Pinata => Arc::new(PinataArchiver::new(&config.pinata)?),
        ArchiveBackend::S3 => Arc::new(ObjectStoreArchiver::s3(&config.s3)?),
        ArchiveBackend::Fs => Arc::new(ObjectStoreArchiver::fs(&config.fs)?),
        ArchiveBackend::Memory => {
            warn!("Memory archive backend selected, archived chunks are lost on exit");
            Arc::new(ObjectStoreArchiver::memory()?)
        }
    };

    info!(backend = archiver.name(), "Archival enabled");
    Ok(Some(archiver))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
