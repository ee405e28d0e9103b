//! Chunk relay core
//!
//! In-memory buffering of producer chunks per stream, consumer cursors,
//! periodic retention, and best-effort archival of every ingested chunk.

pub mod archive;
pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod relay;

pub use config::Config;
pub use error::{RelayError, RelayResult};
pub use relay::{ChunkRelay, RelayLimits, Retrieval, RetentionPolicy, RetentionSweeper, StreamRegistry};
