use crate::archive::{suggested_name, ArchiveItem, ArchiveQueue};
use crate::config::RelayConfig;
use crate::error::{RelayError, RelayResult};
use crate::metrics;
use crate::relay::registry::StreamRegistry;
use crate::relay::sweeper::{RetentionPolicy, RetentionSweeper};
use bytes::Bytes;
use chrono::Utc;
use std::sync::Arc;
use tokio::time::Instant;
use tracing::{debug, trace};

/// Outcome of a retrieval call. None of these are errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Retrieval {
    Found { payload: Bytes, content_type: String },
    /// The stream exists but holds no chunk at that index (not produced yet, or already trimmed)
    NotYetAvailable,
    /// No stream with that id
    StreamAbsent,
}

impl Retrieval {
    #[must_use]
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::Found { .. } => "found",
            Self::NotYetAvailable => "not_yet_available",
            Self::StreamAbsent => "stream_absent",
        }
    }
}

/// Limits enforced on ingest
#[derive(Debug, Clone, Copy)]
pub struct RelayLimits {
    pub max_chunk_bytes: usize,
}

impl Default for RelayLimits {
    fn default() -> Self {
        Self::from(&RelayConfig::default())
    }
}

impl From<&RelayConfig> for RelayLimits {
    fn from(config: &RelayConfig) -> Self {
        Self {
            max_chunk_bytes: config.max_chunk_bytes,
        }
    }
}

/// Ingest and retrieval paths over a shared [`StreamRegistry`].
///
/// Neither path ever deletes chunks; the [`RetentionSweeper`] owns removal.
pub struct ChunkRelay {
    registry: Arc<StreamRegistry>,
    limits: RelayLimits,
    archive: Option<ArchiveQueue>,
}

impl ChunkRelay {
    #[must_use]
    pub fn new(registry: Arc<StreamRegistry>, limits: RelayLimits, archive: Option<ArchiveQueue>) -> Self {
        Self {
            registry,
            limits,
            archive,
        }
    }

    /// Append a chunk to `stream_id` and return its index.
    pub fn ingest(&self, stream_id: &str, content_type: &str, payload: Bytes) -> RelayResult<u64> {
        self.ingest_named(stream_id, content_type, payload, None)
    }

    /// Like [`ChunkRelay::ingest`], with the uploaded file name used to name the archived copy.
    pub fn ingest_named(
        &self,
        stream_id: &str,
        content_type: &str,
        payload: Bytes,
        file_name: Option<&str>,
    ) -> RelayResult<u64> {
        self.validate_ingest(stream_id, content_type, &payload)?;

        let size = payload.len();
        let (index, stored_type) = loop {
            let stream = self.registry.get_or_create(stream_id, content_type);
            let mut state = stream.lock();
            // The sweeper dropped this entry between lookup and lock
            if state.is_retired() {
                continue;
            }
            let now = Utc::now();
            let index = state.chunks.append(payload.clone(), now);
            state.last_updated = now;
            break (index, state.content_type.clone());
        };

        metrics::CHUNKS_INGESTED.inc();
        metrics::BYTES_INGESTED.inc_by(size as u64);
        debug!(stream_id = %stream_id, index = index, size = size, "Chunk ingested");

        if let Some(archive) = &self.archive {
            archive.enqueue(ArchiveItem {
                stream_id: stream_id.to_string(),
                index,
                suggested_name: suggested_name(&stored_type, file_name, Utc::now()),
                content_type: stored_type,
                payload,
            });
        }

        Ok(index)
    }

    fn validate_ingest(&self, stream_id: &str, content_type: &str, payload: &Bytes) -> RelayResult<()> {
        // Ids are opaque keys and stored as given; whitespace-only counts as missing
        if stream_id.trim().is_empty() {
            return Err(RelayError::invalid_input("streamId is required"));
        }
        if content_type.trim().is_empty() {
            return Err(RelayError::invalid_input("content type is required"));
        }
        if payload.len() > self.limits.max_chunk_bytes {
            return Err(RelayError::InvalidInput(format!(
                "chunk size ({} bytes) exceeds limit ({} bytes)",
                payload.len(),
                self.limits.max_chunk_bytes
            )));
        }
        Ok(())
    }

    /// Look up chunk `index` of `stream_id` on behalf of `consumer_id`.
    ///
    /// If the stream exists, the consumer's cursor is set to `index` before
    /// the lookup and advanced to `index + 1` on a hit. A miss leaves it at
    /// `index`. Unknown streams are never created here.
    pub fn retrieve(&self, stream_id: &str, consumer_id: &str, index: u64) -> RelayResult<Retrieval> {
        self.retrieve_at(stream_id, consumer_id, index, Instant::now())
    }

    pub(crate) fn retrieve_at(
        &self,
        stream_id: &str,
        consumer_id: &str,
        index: u64,
        now: Instant,
    ) -> RelayResult<Retrieval> {
        if stream_id.is_empty() {
            return Err(RelayError::invalid_input("streamId is required"));
        }
        if consumer_id.is_empty() {
            return Err(RelayError::invalid_input("clientId is required"));
        }

        let retrieval = match self.registry.get(stream_id) {
            None => Retrieval::StreamAbsent,
            Some(stream) => {
                let mut state = stream.lock();
                if state.is_retired() {
                    Retrieval::StreamAbsent
                } else {
                    state.cursors.touch(consumer_id, index, now);
                    let payload = state.chunks.get(index).map(|chunk| chunk.payload.clone());
                    match payload {
                        Some(payload) => {
                            state.cursors.touch(consumer_id, index.saturating_add(1), now);
                            Retrieval::Found {
                                payload,
                                content_type: state.content_type.clone(),
                            }
                        }
                        None => Retrieval::NotYetAvailable,
                    }
                }
            }
        };

        metrics::RETRIEVALS
            .with_label_values(&[retrieval.outcome()])
            .inc();
        trace!(
            stream_id = %stream_id,
            consumer_id = %consumer_id,
            index = index,
            outcome = retrieval.outcome(),
            "Chunk retrieval"
        );

        Ok(retrieval)
    }

    /// Build a sweeper over this relay's registry.
    #[must_use]
    pub fn sweeper(&self, policy: RetentionPolicy) -> RetentionSweeper {
        RetentionSweeper::new(Arc::clone(&self.registry), policy)
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<StreamRegistry> {
        &self.registry
    }

    #[must_use]
    pub fn limits(&self) -> RelayLimits {
        self.limits
    }
}
