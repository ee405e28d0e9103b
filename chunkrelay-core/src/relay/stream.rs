// Per-stream state and its lock.
//
// Ingest, retrieve, and the sweeper all read-modify-write the same chunk
// store and cursor map, so a stream's state sits behind one mutex.

use crate::relay::chunk::ChunkStore;
use crate::relay::cursor::CursorTracker;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::Serialize;

/// Mutable state of one stream
#[derive(Debug)]
pub struct StreamState {
    /// Set by the first ingested chunk; later content types are ignored
    pub content_type: String,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
    pub chunks: ChunkStore,
    pub cursors: CursorTracker,
    /// Set once the registry has dropped this entry. Writers holding a stale
    /// handle must look the stream up again.
    pub(crate) retired: bool,
}

impl StreamState {
    fn new(content_type: String, now: DateTime<Utc>) -> Self {
        Self {
            content_type,
            created_at: now,
            last_updated: now,
            chunks: ChunkStore::new(),
            cursors: CursorTracker::new(),
            retired: false,
        }
    }

    /// A stream with no chunks and no consumers may be removed
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.chunks.is_empty() && self.cursors.is_empty()
    }

    #[must_use]
    pub fn is_retired(&self) -> bool {
        self.retired
    }
}

/// Shared handle to a stream held by the registry
#[derive(Debug)]
pub struct StreamEntry {
    stream_id: String,
    state: Mutex<StreamState>,
}

impl StreamEntry {
    pub(crate) fn new(stream_id: String, content_type: String) -> Self {
        Self {
            stream_id,
            state: Mutex::new(StreamState::new(content_type, Utc::now())),
        }
    }

    #[must_use]
    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    pub fn lock(&self) -> MutexGuard<'_, StreamState> {
        self.state.lock()
    }

    #[must_use]
    pub fn stats(&self) -> StreamStats {
        let state = self.lock();
        StreamStats {
            stream_id: self.stream_id.clone(),
            content_type: state.content_type.clone(),
            chunk_count: state.chunks.len(),
            first_index: state.chunks.first_index(),
            next_index: state.chunks.next_index(),
            total_bytes: state.chunks.total_bytes(),
            consumer_count: state.cursors.len(),
            created_at: state.created_at,
            last_updated: state.last_updated,
        }
    }
}

/// Point-in-time view of a stream for monitoring
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamStats {
    pub stream_id: String,
    pub content_type: String,
    pub chunk_count: usize,
    pub first_index: Option<u64>,
    pub next_index: u64,
    pub total_bytes: usize,
    pub consumer_count: usize,
    pub created_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}
