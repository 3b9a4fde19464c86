//! Core domain types for the reg registry frontend.
//!
//! This crate defines the data model shared across all other crates:
//! - Content digests and their textual `algo:hex` form
//! - The OCI image manifest structure (decode-only)
//! - The Docker Registry v2 bucket key layout
//! - Upload session identifiers
//! - Configuration types

pub mod config;
pub mod digest;
pub mod error;
pub mod manifest;
pub mod paths;
pub mod upload;

pub use config::{AppConfig, MetadataConfig, ServerConfig, StorageConfig};
pub use digest::Digest;
pub use error::{Error, Result};
pub use manifest::{Descriptor, ImageManifest};
pub use upload::UploadId;

/// Multipart part size: 5 MiB. Parts are anchored to absolute byte
/// offsets at this granularity so a re-sent chunk re-derives the same
/// part numbers.
pub const PART_SIZE: u64 = 5 * 1024 * 1024;
