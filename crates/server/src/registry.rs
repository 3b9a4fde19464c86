//! Registry coordinator: read paths and manifest ingestion.
//!
//! The coordinator composes the object store and the metadata index.
//! Blob reads never stream through the process: they resolve to a
//! presigned URL the HTTP adapter answers with a redirect. Manifest
//! reads consult the index first and fall back to the bucket, filling
//! the index on the way back.

use crate::error::{ApiError, ApiResult};
use axum::http::Method;
use bytes::Bytes;
use reg_core::{Digest, ImageManifest, paths};
use reg_metadata::MetadataStore;
use reg_storage::ObjectStore;
use std::sync::Arc;
use std::time::Duration;

/// Presigned URL lifetime, independent of the request.
pub const PRESIGN_EXPIRY: Duration = Duration::from_secs(15 * 60);

/// Registry coordinator over one bucket and one index.
pub struct Registry {
    pub(crate) storage: Arc<dyn ObjectStore>,
    pub(crate) metadata: Arc<dyn MetadataStore>,
}

impl Registry {
    /// Create a new registry coordinator.
    pub fn new(storage: Arc<dyn ObjectStore>, metadata: Arc<dyn MetadataStore>) -> Self {
        Self { storage, metadata }
    }

    /// Access to the metadata index (used at shutdown and by tests).
    pub fn metadata(&self) -> &Arc<dyn MetadataStore> {
        &self.metadata
    }

    /// Resolve a blob request to a presigned URL for the canonical blob
    /// key. Existence is not checked here; a missing blob surfaces when
    /// the client follows the redirect.
    pub async fn get_blob_redirect(
        &self,
        name: &str,
        digest: &str,
        method: &Method,
    ) -> ApiResult<String> {
        let digest = Digest::parse(digest).map_err(|e| ApiError::BadDigest(e.to_string()))?;
        let blob_key = paths::blob_data_key(&digest);
        tracing::debug!(name, %digest, %blob_key, ?method, "resolving blob redirect");

        let url = if *method == Method::GET {
            self.storage.presign_get(&blob_key, PRESIGN_EXPIRY).await?
        } else if *method == Method::HEAD {
            self.storage.presign_head(&blob_key, PRESIGN_EXPIRY).await?
        } else {
            return Err(ApiError::Internal(format!(
                "unsupported blob method: {method}"
            )));
        };
        Ok(url)
    }

    /// Read the textual digest out of a tag's `current/link` object.
    async fn get_manifest_digest(&self, repo: &str, tag: &str) -> ApiResult<Digest> {
        let link_key = paths::tag_current_key(repo, tag);
        tracing::debug!(repo, tag, %link_key, "reading tag pointer");

        let body = match self.storage.get(&link_key).await {
            Ok(body) => body,
            Err(reg_storage::StorageError::NotFound(_)) => {
                return Err(ApiError::NotFound(format!("manifest for {repo}:{tag}")));
            }
            Err(e) => return Err(e.into()),
        };

        let text = std::str::from_utf8(&body)
            .map_err(|e| ApiError::Internal(format!("invalid link file for {repo}:{tag}: {e}")))?;
        Digest::parse(text.trim())
            .map_err(|e| ApiError::Internal(format!("invalid link file for {repo}:{tag}: {e}")))
    }

    /// Fetch a manifest by `(name, reference)`: index first, bucket on a
    /// miss. Returns the decoded form and the exact raw bytes.
    pub async fn get_manifest(
        &self,
        name: &str,
        reference: &str,
    ) -> ApiResult<(ImageManifest, Bytes)> {
        match self.metadata.get_manifest(name, reference).await {
            Ok(raw) => {
                let manifest = ImageManifest::decode(&raw)
                    .map_err(|e| ApiError::Internal(e.to_string()))?;
                return Ok((manifest, Bytes::from(raw)));
            }
            Err(e) if e.is_not_found() => {}
            Err(e) => {
                tracing::warn!(name, reference, error = %e, "index lookup failed, falling back to bucket");
            }
        }

        let digest = self.get_manifest_digest(name, reference).await?;
        let blob_key = paths::blob_data_key(&digest);
        tracing::debug!(%blob_key, "reading manifest blob");
        let raw = self.storage.get(&blob_key).await?;
        let manifest =
            ImageManifest::decode(&raw).map_err(|e| ApiError::Internal(e.to_string()))?;

        // Cache fill is best effort; a failing index never fails the read.
        if let Err(e) = self
            .metadata
            .put_manifest(name, reference, &raw, &manifest)
            .await
        {
            tracing::error!(name, reference, error = %e, "failed to cache manifest in index");
        }

        Ok((manifest, raw))
    }

    /// Ingest a manifest: blob write, the three link pointers, then the
    /// index row. Each object-store write is idempotent, so a partial
    /// failure leaves the bucket in a state a retry repairs.
    pub async fn put_manifest(
        &self,
        name: &str,
        reference: &str,
        raw: Bytes,
    ) -> ApiResult<Digest> {
        let digest = Digest::from_bytes(&raw);
        let manifest =
            ImageManifest::decode(&raw).map_err(|e| ApiError::Internal(e.to_string()))?;

        let blob_key = paths::blob_data_key(&digest);
        tracing::debug!(%blob_key, "writing manifest blob");
        self.storage.put(&blob_key, raw.clone()).await?;

        let link_body = Bytes::from(digest.to_string());
        for link_key in [
            paths::tag_current_key(name, reference),
            paths::tag_index_key(name, reference, &digest),
            paths::revision_key(name, &digest),
        ] {
            tracing::debug!(%link_key, "writing manifest link");
            self.storage.put(&link_key, link_body.clone()).await?;
        }

        if let Err(e) = self
            .metadata
            .put_manifest(name, reference, &raw, &manifest)
            .await
        {
            tracing::error!(name, reference, error = %e, "failed to store manifest in index");
        }

        Ok(digest)
    }

    /// List the tags of a repository: index first, bucket scan on an
    /// empty index, caching the scanned tags best effort.
    pub async fn list_tags(&self, name: &str) -> ApiResult<Vec<String>> {
        match self.metadata.list_tags(name).await {
            Ok(tags) if !tags.is_empty() => return Ok(tags),
            Ok(_) => {}
            Err(e) => {
                tracing::warn!(name, error = %e, "index tag listing failed, falling back to bucket");
            }
        }

        let prefix = paths::tags_prefix(name);
        let mut tags = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let page = self.storage.list_page(&prefix, token.as_deref()).await?;
            tags.extend(
                page.keys
                    .iter()
                    .filter_map(|key| paths::tag_from_key(key, name)),
            );
            match page.next_token {
                Some(next) => token = Some(next),
                None => break,
            }
        }

        if let Err(e) = self.metadata.put_tags(name, &tags).await {
            tracing::error!(name, error = %e, "failed to cache tags in index");
        }

        Ok(tags)
    }

    /// Paginated repository listing, delegated to the index.
    pub async fn list_repositories(
        &self,
        token: Option<&str>,
        limit: u32,
    ) -> ApiResult<(Vec<String>, Option<String>)> {
        Ok(self.metadata.list_repositories(token, limit).await?)
    }
}
