// Object storage archiver backed by OpenDAL
//
// Supports:
// - AWS S3 and S3-compatible stores (Minio, Aliyun OSS, ...)
// - Local filesystem directory
// - In-memory operator (tests, dry runs)

use super::{ArchiveError, ArchiveItem, ArchiveReceipt, Archiver};
use crate::config::{FsArchiveConfig, S3ArchiveConfig};
use async_trait::async_trait;
use opendal::{services, Operator};

pub struct ObjectStoreArchiver {
    operator: Operator,
    /// Key prefix, e.g. "chunks/"
    prefix: String,
    scheme: &'static str,
}

impl ObjectStoreArchiver {
    pub fn s3(config: &S3ArchiveConfig) -> Result<Self, ArchiveError> {
        tracing::info!(
            "Initializing S3 archive: bucket={}, endpoint={}",
            config.bucket,
            config.endpoint
        );

        let mut builder = services::S3::default()
            .endpoint(&config.endpoint)
            .access_key_id(&config.access_key_id)
            .secret_access_key(&config.secret_access_key)
            .bucket(&config.bucket);

        if let Some(region) = &config.region {
            builder = builder.region(region);
        }

        let operator = Operator::new(builder)?.finish();
        Ok(Self::with_operator(operator, &config.prefix, "s3"))
    }

    pub fn fs(config: &FsArchiveConfig) -> Result<Self, ArchiveError> {
        tracing::info!("Initializing filesystem archive: root={}", config.root);

        let builder = services::Fs::default().root(&config.root);
        let operator = Operator::new(builder)?.finish();
        Ok(Self::with_operator(operator, &config.prefix, "fs"))
    }

    pub fn memory() -> Result<Self, ArchiveError> {
        let operator = Operator::new(services::Memory::default())?.finish();
        Ok(Self::with_operator(operator, "", "memory"))
    }

    #[must_use]
    pub fn with_operator(operator: Operator, prefix: &str, scheme: &'static str) -> Self {
        Self {
            operator,
            prefix: prefix.to_string(),
            scheme,
        }
    }

    /// Underlying operator, for reading archived objects back
    #[must_use]
    pub fn operator(&self) -> &Operator {
        &self.operator
    }

    /// Object key for an item: `{prefix}{stream_id}/{suggested_name}`.
    ///
    /// Path separators in the stream id are replaced so a producer cannot
    /// write outside its own directory.
    #[must_use]
    pub fn object_key(&self, item: &ArchiveItem) -> String {
        let stream_dir: String = item
            .stream_id
            .chars()
            .map(|c| if matches!(c, '/' | '\\') || c.is_control() { '_' } else { c })
            .collect();
        let stream_dir = if stream_dir == "." || stream_dir == ".." {
            "_".to_string()
        } else {
            stream_dir
        };
        format!("{}{}/{}", self.prefix, stream_dir, item.suggested_name)
    }
}

#[async_trait]
impl Archiver for ObjectStoreArchiver {
    fn name(&self) -> &'static str {
        self.scheme
    }

    async fn archive(&self, item: &ArchiveItem) -> Result<ArchiveReceipt, ArchiveError> {
        let key = self.object_key(item);
        self.operator.write(&key, item.payload.clone()).await?;

        tracing::trace!("Archived {} ({} bytes)", key, item.payload.len());

        Ok(ArchiveReceipt {
            location: format!("{}://{}", self.scheme, key),
        })
    }
}
