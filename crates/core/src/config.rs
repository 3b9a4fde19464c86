//! Configuration types shared across crates.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Top-level application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub metadata: MetadataConfig,
}

impl AppConfig {
    /// Configuration for tests: unspecified bucket, temp-friendly defaults.
    pub fn for_testing() -> Self {
        Self::default()
    }
}

/// Server configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Age after which an upload session is considered stale, in hours.
    #[serde(default = "default_stale_upload_hours")]
    pub stale_upload_hours: u64,
}

fn default_bind() -> String {
    "0.0.0.0:2137".to_string()
}

fn default_stale_upload_hours() -> u64 {
    24
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            stale_upload_hours: default_stale_upload_hours(),
        }
    }
}

/// Object storage configuration (S3-compatible).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Bucket name. Required at startup; usually supplied via `--bucket`.
    #[serde(default)]
    pub bucket: String,
    /// Optional endpoint URL (for MinIO, etc.).
    pub endpoint: Option<String>,
    /// AWS region.
    pub region: Option<String>,
    /// AWS access key ID. Falls back to the ambient credential chain if unset.
    pub access_key_id: Option<String>,
    /// AWS secret access key. Falls back to the ambient credential chain if unset.
    pub secret_access_key: Option<String>,
    /// Force path-style URLs (`endpoint/bucket/key`). Required for MinIO.
    #[serde(default)]
    pub force_path_style: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            endpoint: None,
            region: None,
            access_key_id: None,
            secret_access_key: None,
            force_path_style: false,
        }
    }
}

impl StorageConfig {
    /// Validate storage configuration invariants.
    pub fn validate(&self) -> Result<(), String> {
        if self.bucket.is_empty() {
            return Err("storage bucket is required".to_string());
        }
        match (&self.access_key_id, &self.secret_access_key) {
            (Some(_), Some(_)) | (None, None) => Ok(()),
            _ => Err(
                "s3 config requires both access_key_id and secret_access_key when either is set"
                    .to_string(),
            ),
        }
    }
}

/// Metadata index configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetadataConfig {
    /// SQLite database file path.
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

fn default_db_path() -> PathBuf {
    PathBuf::from("registry.db")
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}
