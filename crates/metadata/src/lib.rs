//! Metadata index for reg.
//!
//! This crate provides the local relational index of bucket metadata:
//! - Tags and the repositories implied by them
//! - Manifest JSON and the per-manifest ordered layer list
//! - Globally digest-keyed layers
//! - Upload sessions coordinating multipart uploads

pub mod error;
pub mod models;
pub mod store;

pub use error::{MetadataError, MetadataResult};
pub use store::{ManifestRepo, MetadataStore, SqliteStore, UploadRepo};

use reg_core::config::MetadataConfig;
use std::sync::Arc;

/// Create a metadata store from configuration.
pub async fn from_config(config: &MetadataConfig) -> MetadataResult<Arc<dyn MetadataStore>> {
    let store = SqliteStore::new(&config.path).await?;
    Ok(Arc::new(store) as Arc<dyn MetadataStore>)
}
