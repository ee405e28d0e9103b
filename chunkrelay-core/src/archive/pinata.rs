// Pinata archiver: pins each chunk to IPFS through the pinning HTTP API.

use super::{ArchiveError, ArchiveItem, ArchiveReceipt, Archiver};
use crate::config::PinataConfig;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

pub struct PinataArchiver {
    client: reqwest::Client,
    endpoint: String,
    jwt: String,
    gateway: String,
}

#[derive(Debug, Deserialize)]
struct PinResponse {
    #[serde(rename = "IpfsHash")]
    ipfs_hash: String,
}

impl PinataArchiver {
    pub fn new(config: &PinataConfig) -> Result<Self, ArchiveError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds.max(1)))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            jwt: config.jwt.clone(),
            gateway: config.gateway.trim_end_matches('/').to_string(),
        })
    }

    /// Public link to pinned content
    fn gateway_url(&self, hash: &str) -> String {
        if self.gateway.starts_with("http://") || self.gateway.starts_with("https://") {
            format!("{}/ipfs/{hash}", self.gateway)
        } else {
            format!("https://{}/ipfs/{hash}", self.gateway)
        }
    }

    fn build_form(item: &ArchiveItem) -> Result<Form, ArchiveError> {
        let file = Part::stream_with_length(
            reqwest::Body::from(item.payload.clone()),
            item.payload.len() as u64,
        )
        .file_name(item.suggested_name.clone())
        .mime_str(&item.content_type)?;

        let metadata = serde_json::json!({
            "name": item.suggested_name,
            "keyvalues": {
                "streamId": item.stream_id,
                "index": item.index,
            },
        });

        Ok(Form::new()
            .part("file", file)
            .text("pinataMetadata", metadata.to_string()))
    }
}

/// Pull a readable message out of an error body.
///
/// The API answers either `{"error": "..."}` or `{"error": {"reason": ..., "details": ...}}`.
fn error_message(body: &str) -> String {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    match parsed.as_ref().and_then(|v| v.get("error")) {
        Some(serde_json::Value::String(message)) => message.clone(),
        Some(serde_json::Value::Object(err)) => err
            .get("details")
            .or_else(|| err.get("reason"))
            .and_then(serde_json::Value::as_str)
            .unwrap_or("Failed to upload to Pinata")
            .to_string(),
        _ if !body.is_empty() => body.to_string(),
        _ => "Failed to upload to Pinata".to_string(),
    }
}

#[async_trait]
impl Archiver for PinataArchiver {
    fn name(&self) -> &'static str {
        "pinata"
    }

    async fn archive(&self, item: &ArchiveItem) -> Result<ArchiveReceipt, ArchiveError> {
        let form = Self::build_form(item)?;

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.jwt)
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ArchiveError::Rejected {
                status: status.as_u16(),
                message: error_message(&body),
            });
        }

        let pinned: PinResponse = serde_json::from_str(&body)
            .map_err(|e| ArchiveError::InvalidResponse(format!("{e}: {body}")))?;

        debug!(
            stream_id = %item.stream_id,
            index = item.index,
            hash = %pinned.ipfs_hash,
            "Chunk pinned"
        );

        Ok(ArchiveReceipt {
            location: self.gateway_url(&pinned.ipfs_hash),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_message_shapes() {
        assert_eq!(error_message(r#"{"error":"Invalid JWT"}"#), "Invalid JWT");
        assert_eq!(
            error_message(r#"{"error":{"reason":"INVALID","details":"bad file"}}"#),
            "bad file"
        );
        assert_eq!(error_message("upstream down"), "upstream down");
        assert_eq!(error_message(""), "Failed to upload to Pinata");
    }

    #[test]
    fn test_gateway_url() {
        let mut config = PinataConfig {
            gateway: "example.mypinata.cloud/".to_string(),
            ..PinataConfig::default()
        };
        let archiver = PinataArchiver::new(&config).unwrap();
        assert_eq!(
            archiver.gateway_url("QmHash"),
            "https://example.mypinata.cloud/ipfs/QmHash"
        );

        config.gateway = "http://localhost:8080".to_string();
        let archiver = PinataArchiver::new(&config).unwrap();
        assert_eq!(archiver.gateway_url("QmHash"), "http://localhost:8080/ipfs/QmHash");
    }
}
