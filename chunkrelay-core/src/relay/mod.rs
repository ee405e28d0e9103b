// In-memory chunk relay
//
// Components:
// - chunk: per-stream ordered chunk store with monotonic indices
// - cursor: per-stream consumer positions and last activity
// - stream: one stream's state behind its lock
// - registry: stream id → stream, created on first ingest
// - service: ingest and retrieve
// - sweeper: periodic eviction, trimming and stream removal

pub mod chunk;
pub mod cursor;
pub mod registry;
pub mod service;
pub mod stream;
pub mod sweeper;

pub use chunk::{Chunk, ChunkStore, TrimOutcome};
pub use cursor::{ConsumerCursor, CursorTracker};
pub use registry::StreamRegistry;
pub use service::{ChunkRelay, RelayLimits, Retrieval};
pub use stream::{StreamEntry, StreamState, StreamStats};
pub use sweeper::{RetentionPolicy, RetentionSweeper, SweepReport};
