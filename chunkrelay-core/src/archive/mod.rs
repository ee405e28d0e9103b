// Archival of ingested chunks to long-term storage
//
// Archival is a best-effort copy taken off the delivery path:
// - ingest hands an ArchiveItem to the ArchiveQueue and returns immediately
// - a small worker pool drains the queue into an Archiver
// - failures are logged and counted, never retried, never reported to the producer
//
// Backends:
// - PinataArchiver: pins the payload to IPFS through the Pinata HTTP API
// - ObjectStoreArchiver: writes the payload through OpenDAL (S3, local fs, memory)

pub mod object;
pub mod pinata;
pub mod queue;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use thiserror::Error;

pub use object::ObjectStoreArchiver;
pub use pinata::PinataArchiver;
pub use queue::{ArchiveQueue, ArchiveWorkers};

/// Extension used when neither the upload nor the content type names one.
const DEFAULT_EXTENSION: &str = "webm";

/// A chunk copy waiting to be archived
#[derive(Debug, Clone)]
pub struct ArchiveItem {
    pub stream_id: String,
    pub index: u64,
    pub content_type: String,
    /// e.g. "chunk_1718000000000.webm"
    pub suggested_name: String,
    pub payload: Bytes,
}

/// Where an archived chunk ended up
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveReceipt {
    pub location: String,
}

#[derive(Error, Debug)]
pub enum ArchiveError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Archive rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Invalid archive response: {0}")]
    InvalidResponse(String),

    #[error("Storage error: {0}")]
    Storage(#[from] opendal::Error),
}

/// Destination for archived chunks
#[async_trait]
pub trait Archiver: Send + Sync {
    /// Short backend name used in logs and metrics
    fn name(&self) -> &'static str;

    async fn archive(&self, item: &ArchiveItem) -> Result<ArchiveReceipt, ArchiveError>;
}

/// Build the archive file name for a chunk: `chunk_{unix_millis}.{ext}`.
///
/// The extension is taken from the uploaded file name when it has one,
/// otherwise from the content type.
#[must_use]
pub fn suggested_name(content_type: &str, file_name: Option<&str>, now: DateTime<Utc>) -> String {
    let extension = file_name
        .and_then(|name| name.rsplit_once('.'))
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or_else(|| extension_for(content_type));

    format!("chunk_{}.{}", now.timestamp_millis(), extension)
}

fn extension_for(content_type: &str) -> &'static str {
    let essence = content_type.split(';').next().unwrap_or_default().trim();
    match essence.to_ascii_lowercase().as_str() {
        "video/webm" | "audio/webm" => "webm",
        "video/mp4" | "audio/mp4" => "mp4",
        _ => DEFAULT_EXTENSION,
    }
}
