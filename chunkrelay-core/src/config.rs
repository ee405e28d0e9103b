use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub relay: RelayConfig,
    pub archive: ArchiveConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Directory with the browser client, served as the router fallback
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            static_dir: Some("public".to_string()),
        }
    }
}

/// Chunk buffer limits and retention timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Largest accepted chunk payload in bytes
    pub max_chunk_bytes: usize,
    pub sweep_interval_seconds: u64,
    pub consumer_idle_timeout_seconds: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            max_chunk_bytes: 50 * 1024 * 1024, // 50 MiB
            sweep_interval_seconds: 60,
            consumer_idle_timeout_seconds: 300,
        }
    }
}

impl RelayConfig {
    #[must_use]
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_seconds)
    }

    #[must_use]
    pub fn consumer_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.consumer_idle_timeout_seconds)
    }
}

/// Which archiver receives a copy of every ingested chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArchiveBackend {
    #[default]
    None,
    Pinata,
    S3,
    Fs,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArchiveConfig {
    pub backend: ArchiveBackend,
    /// Number of upload workers draining the queue
    pub workers: usize,
    /// Pending uploads beyond this are dropped
    pub queue_capacity: usize,
    pub shutdown_grace_seconds: u64,
    pub pinata: PinataConfig,
    pub s3: S3ArchiveConfig,
    pub fs: FsArchiveConfig,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            backend: ArchiveBackend::None,
            workers: 4,
            queue_capacity: 256,
            shutdown_grace_seconds: 5,
            pinata: PinataConfig::default(),
            s3: S3ArchiveConfig::default(),
            fs: FsArchiveConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PinataConfig {
    pub jwt: String,
    /// Gateway host used to build links to pinned content (e.g. "example.mypinata.cloud")
    pub gateway: String,
    pub endpoint: String,
    pub timeout_seconds: u64,
}

impl Default for PinataConfig {
    fn default() -> Self {
        Self {
            jwt: String::new(),
            gateway: String::new(),
            endpoint: "https://api.pinata.cloud/pinning/pinFileToIPFS".to_string(),
            timeout_seconds: 30,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct S3ArchiveConfig {
    pub endpoint: String,
    pub bucket: String,
    pub region: Option<String>,
    pub access_key_id: String,
    pub secret_access_key: String,
    /// Key prefix inside the bucket (e.g. "chunks/")
    pub prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FsArchiveConfig {
    pub root: String,
    pub prefix: String,
}

impl Default for FsArchiveConfig {
    fn default() -> Self {
        Self {
            root: "./archive".to_string(),
            prefix: String::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
    pub file_path: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
            file_path: None,
        }
    }
}

impl Config {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // Override with environment variables (CHUNKRELAY_RELAY__MAX_CHUNK_BYTES, etc.)
        builder = builder.add_source(
            Environment::with_prefix("CHUNKRELAY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// Load from environment variables only (for Docker/K8s)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    #[must_use]
    pub fn http_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Check the configuration for values the relay cannot run with.
    ///
    /// Returns every problem found rather than stopping at the first.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.relay.max_chunk_bytes == 0 {
            errors.push("relay.max_chunk_bytes must be greater than 0".to_string());
        }
        if self.relay.sweep_interval_seconds == 0 {
            errors.push("relay.sweep_interval_seconds must be greater than 0".to_string());
        }
        if self.relay.consumer_idle_timeout_seconds == 0 {
            errors.push("relay.consumer_idle_timeout_seconds must be greater than 0".to_string());
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            errors.push(format!(
                "logging.format must be \"json\" or \"pretty\", got \"{}\"",
                self.logging.format
            ));
        }

        let archive = &self.archive;
        if archive.backend != ArchiveBackend::None {
            if archive.workers == 0 {
                errors.push("archive.workers must be greater than 0".to_string());
            }
            if archive.queue_capacity == 0 {
                errors.push("archive.queue_capacity must be greater than 0".to_string());
            }
        }

        match archive.backend {
            ArchiveBackend::Pinata => {
                if archive.pinata.jwt.is_empty() {
                    errors.push("archive.pinata.jwt is required for the pinata backend".to_string());
                }
                if archive.pinata.gateway.is_empty() {
                    errors.push("archive.pinata.gateway is required for the pinata backend".to_string());
                }
            }
            ArchiveBackend::S3 => {
                let s3 = &archive.s3;
                for (value, name) in [
                    (&s3.endpoint, "endpoint"),
                    (&s3.bucket, "bucket"),
                    (&s3.access_key_id, "access_key_id"),
                    (&s3.secret_access_key, "secret_access_key"),
                ] {
                    if value.is_empty() {
                        errors.push(format!("archive.s3.{name} is required for the s3 backend"));
                    }
                }
            }
            ArchiveBackend::Fs => {
                if archive.fs.root.is_empty() {
                    errors.push("archive.fs.root is required for the fs backend".to_string());
                }
            }
            ArchiveBackend::None | ArchiveBackend::Memory => {}
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();

        assert_eq!(config.relay.max_chunk_bytes, 50 * 1024 * 1024);
        assert_eq!(config.relay.sweep_interval(), Duration::from_secs(60));
        assert_eq!(config.relay.consumer_idle_timeout(), Duration::from_secs(300));
        assert_eq!(config.archive.backend, ArchiveBackend::None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_http_address() {
        let config = Config {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
                static_dir: None,
            },
            ..Config::default()
        };

        assert_eq!(config.http_address(), "127.0.0.1:8080");
    }

    #[test]
    fn test_pinata_requires_credentials() {
        let mut config = Config::default();
        config.archive.backend = ArchiveBackend::Pinata;

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.iter().any(|e| e.contains("pinata.jwt")));
        assert!(errors.iter().any(|e| e.contains("pinata.gateway")));

        config.archive.pinata.jwt = "token".to_string();
        config.archive.pinata.gateway = "example.mypinata.cloud".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_s3_reports_every_missing_field() {
        let mut config = Config::default();
        config.archive.backend = ArchiveBackend::S3;
        config.archive.s3.bucket = "chunks".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
        assert!(!errors.iter().any(|e| e.contains("bucket")));
    }

    #[test]
    fn test_zero_limits_rejected() {
        let mut config = Config::default();
        config.relay.max_chunk_bytes = 0;
        config.relay.sweep_interval_seconds = 0;
        config.logging.format = "xml".to_string();

        let errors = config.validate().unwrap_err();
        assert_eq!(errors.len(), 3);
    }

    #[test]
    fn test_load_from_file() {
        use std::io::Write;

        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[relay]\nmax_chunk_bytes = 1024\n\n[archive]\nbackend = \"memory\"\nworkers = 2"
        )
        .unwrap();

        let config = Config::load(file.path().to_str()).unwrap();
        assert_eq!(config.relay.max_chunk_bytes, 1024);
        assert_eq!(config.relay.sweep_interval_seconds, 60);
        assert_eq!(config.archive.backend, ArchiveBackend::Memory);
        assert_eq!(config.archive.workers, 2);
    }

    #[test]
    fn test_archive_backend_names() {
        let backend: ArchiveBackend = serde_json::from_str("\"pinata\"").unwrap();
        assert_eq!(backend, ArchiveBackend::Pinata);
        let backend: ArchiveBackend = serde_json::from_str("\"fs\"").unwrap();
        assert_eq!(backend, ArchiveBackend::Fs);
    }
}
