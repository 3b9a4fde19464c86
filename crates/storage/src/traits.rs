//! Storage trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;
use std::time::Duration;

/// A single page of a prefix listing.
///
/// `next_token` is an opaque backend token; pass it back to
/// [`ObjectStore::list_page`] to fetch the next page. `None` means the
/// listing is exhausted.
#[derive(Clone, Debug)]
pub struct ListingPage {
    pub keys: Vec<String>,
    pub next_token: Option<String>,
}

/// A part recorded by the backend for an in-flight multipart upload.
///
/// `etag` must be echoed back verbatim on completion.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UploadedPart {
    pub part_number: i32,
    pub etag: String,
}

/// Object store capability over a single bucket.
///
/// Multipart uploads are exposed explicitly (rather than behind a
/// writer handle) because registry upload sessions span many HTTP
/// requests: the multipart id is persisted in the metadata index and
/// rebound on every chunk.
#[async_trait]
pub trait ObjectStore: Send + Sync + 'static {
    /// Get an object's content.
    async fn get(&self, key: &str) -> StorageResult<Bytes>;

    /// Put an object.
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()>;

    /// Delete an object.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Server-side copy of an object.
    async fn copy(&self, from: &str, to: &str) -> StorageResult<()>;

    /// List one page of keys under a prefix, resuming from `token`.
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> StorageResult<ListingPage>;

    /// Mint a presigned GET URL valid for `expires_in`.
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Mint a presigned HEAD URL valid for `expires_in`.
    async fn presign_head(&self, key: &str, expires_in: Duration) -> StorageResult<String>;

    /// Begin a multipart upload, returning the backend upload id.
    async fn create_multipart(&self, key: &str) -> StorageResult<String>;

    /// Upload one part of a multipart upload.
    async fn upload_part(
        &self,
        key: &str,
        multipart_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> StorageResult<()>;

    /// List the parts uploaded so far, in part-number order.
    async fn list_parts(&self, key: &str, multipart_id: &str) -> StorageResult<Vec<UploadedPart>>;

    /// Complete a multipart upload from the given parts.
    async fn complete_multipart(
        &self,
        key: &str,
        multipart_id: &str,
        parts: &[UploadedPart],
    ) -> StorageResult<()>;

    /// Abort a multipart upload, discarding uploaded parts.
    async fn abort_multipart(&self, key: &str, multipart_id: &str) -> StorageResult<()>;

    /// Static identifier of the backend type, for logging.
    fn backend_name(&self) -> &'static str;
}
