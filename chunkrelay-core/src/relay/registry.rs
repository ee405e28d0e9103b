// Stream registry: stream id → stream entry.
//
// Streams are created by the first ingested chunk and only ever removed by
// the retention sweeper once they hold no chunks and no consumers.
// Retrieval looks streams up but never creates them.

use crate::metrics;
use crate::relay::stream::{StreamEntry, StreamStats};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Default)]
pub struct StreamRegistry {
    streams: DashMap<String, Arc<StreamEntry>>,
}

impl StreamRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the stream for `stream_id`, creating it with `content_type` if absent.
    ///
    /// Concurrent callers for the same unseen id all receive the same entry;
    /// the content type of whoever created it wins.
    pub fn get_or_create(&self, stream_id: &str, content_type: &str) -> Arc<StreamEntry> {
        match self.streams.entry(stream_id.to_string()) {
            Entry::Occupied(entry) => Arc::clone(entry.get()),
            Entry::Vacant(entry) => {
                let stream = Arc::new(StreamEntry::new(
                    stream_id.to_string(),
                    content_type.to_string(),
                ));
                entry.insert(Arc::clone(&stream));
                metrics::ACTIVE_STREAMS.inc();
                info!(stream_id = %stream_id, content_type = %content_type, "Stream created");
                stream
            }
        }
    }

    #[must_use]
    pub fn get(&self, stream_id: &str) -> Option<Arc<StreamEntry>> {
        self.streams.get(stream_id).map(|entry| Arc::clone(entry.value()))
    }

    /// Unconditionally drop a stream and everything it holds.
    ///
    /// The entry is marked retired while the shard lock is still held, so an
    /// ingest holding an older handle cannot append after the removal.
    pub fn remove(&self, stream_id: &str) -> Option<Arc<StreamEntry>> {
        let (_, stream) = self.streams.remove_if(stream_id, |_, stream| {
            stream.lock().retired = true;
            true
        })?;
        metrics::ACTIVE_STREAMS.dec();
        debug!(stream_id = %stream_id, "Stream removed from registry");
        Some(stream)
    }

    /// Drop a stream only if it currently has no chunks and no consumers.
    ///
    /// The check and the removal happen under both the map shard lock and
    /// the stream lock, so a chunk appended concurrently keeps the stream alive.
    pub fn remove_if_empty(&self, stream_id: &str) -> bool {
        let removed = self
            .streams
            .remove_if(stream_id, |_, stream| {
                let mut state = stream.lock();
                if state.is_idle() {
                    state.retired = true;
                    true
                } else {
                    false
                }
            })
            .is_some();

        if removed {
            metrics::ACTIVE_STREAMS.dec();
        }
        removed
    }

    /// Handles to every stream currently registered.
    ///
    /// Collected up front so callers can lock streams or mutate the map
    /// without holding a shard guard.
    #[must_use]
    pub fn entries(&self) -> Vec<Arc<StreamEntry>> {
        self.streams
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect()
    }

    #[must_use]
    pub fn stream_ids(&self) -> Vec<String> {
        self.streams.iter().map(|entry| entry.key().clone()).collect()
    }

    #[must_use]
    pub fn stats(&self, stream_id: &str) -> Option<StreamStats> {
        self.get(stream_id).map(|stream| stream.stats())
    }

    /// Stats for every stream, ordered by stream id
    #[must_use]
    pub fn snapshot(&self) -> Vec<StreamStats> {
        let mut stats: Vec<StreamStats> = self.entries().iter().map(|s| s.stats()).collect();
        stats.sort_by(|a, b| a.stream_id.cmp(&b.stream_id));
        stats
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.streams.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
