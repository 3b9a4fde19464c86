//! Object storage abstraction and backends for reg.
//!
//! This crate provides:
//! - The [`ObjectStore`] capability: plain object operations, paged
//!   prefix listing with an opaque continuation token, presigned
//!   GET/HEAD URLs, and the multipart upload lifecycle
//! - The S3-compatible backend on the AWS SDK

pub mod backends;
pub mod error;
pub mod traits;

pub use backends::s3::S3Backend;
pub use error::{StorageError, StorageResult};
pub use traits::{ListingPage, ObjectStore, UploadedPart};

use reg_core::config::StorageConfig;
use std::sync::Arc;

/// Create an object store from configuration.
pub async fn from_config(config: &StorageConfig) -> StorageResult<Arc<dyn ObjectStore>> {
    config.validate().map_err(StorageError::Config)?;
    let backend = S3Backend::new(config).await?;
    Ok(Arc::new(backend) as Arc<dyn ObjectStore>)
}
