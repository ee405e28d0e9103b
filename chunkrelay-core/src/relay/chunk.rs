use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// One indexed payload within a stream
#[derive(Debug, Clone)]
pub struct Chunk {
    /// Sequence index, assigned in ingest order
    pub index: u64,
    pub payload: Bytes,
    pub created_at: DateTime<Utc>,
}

/// Result of trimming the front of a [`ChunkStore`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TrimOutcome {
    pub removed: usize,
    pub bytes: usize,
}

/// Ordered chunk sequence for a single stream.
///
/// Indices held are always the dense run `first_index()..next_index()`:
/// appends go to the back with the next counter value and trimming only
/// pops from the front, so a lookup is an offset from the front chunk.
#[derive(Debug, Default)]
pub struct ChunkStore {
    chunks: VecDeque<Chunk>,
    /// Never decreases, never reused after a trim
    next_index: u64,
    total_bytes: usize,
}

impl ChunkStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a payload and return the index assigned to it.
    pub fn append(&mut self, payload: Bytes, now: DateTime<Utc>) -> u64 {
        let index = self.next_index;
        self.total_bytes += payload.len();
        self.chunks.push_back(Chunk {
            index,
            payload,
            created_at: now,
        });
        self.next_index += 1;
        index
    }

    #[must_use]
    pub fn get(&self, index: u64) -> Option<&Chunk> {
        let first = self.chunks.front()?.index;
        let offset = usize::try_from(index.checked_sub(first)?).ok()?;
        let chunk = self.chunks.get(offset)?;
        debug_assert_eq!(chunk.index, index);
        Some(chunk)
    }

    /// Remove every chunk with `index < floor`, oldest first.
    pub fn trim_below(&mut self, floor: u64) -> TrimOutcome {
        let mut outcome = TrimOutcome::default();
        while self.chunks.front().is_some_and(|c| c.index < floor) {
            if let Some(chunk) = self.chunks.pop_front() {
                outcome.removed += 1;
                outcome.bytes += chunk.payload.len();
            }
        }
        self.total_bytes = self.total_bytes.saturating_sub(outcome.bytes);
        outcome
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Index of the oldest retained chunk
    #[must_use]
    pub fn first_index(&self) -> Option<u64> {
        self.chunks.front().map(|c| c.index)
    }

    /// Index the next append will receive
    #[must_use]
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    #[must_use]
    pub fn total_bytes(&self) -> usize {
        self.total_bytes
    }
}
