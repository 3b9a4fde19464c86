//! Blob upload session state machine.
//!
//! A session binds a client-facing upload id to a multipart upload in
//! the object store. Chunks are strictly serial and offset-ordered: the
//! `offset == uploaded_size` check is the only guard, and the session
//! row update after a successful part write is the commit point. A
//! cancelled chunk leaves its partial parts behind; the offset check on
//! the next attempt is the recovery mechanism.

use crate::error::{ApiError, ApiResult};
use crate::registry::Registry;
use bytes::{Bytes, BytesMut};
use futures::StreamExt;
use futures::stream::BoxStream;
use reg_core::{Digest, PART_SIZE, UploadId, paths};
use reg_metadata::models::UploadSessionRow;
use time::OffsetDateTime;

/// Incoming chunk body as a byte stream.
pub type ChunkStream = BoxStream<'static, std::io::Result<Bytes>>;

/// Part number for the part beginning at `offset`.
///
/// Parts are anchored to absolute byte ranges so that re-sending the
/// same offset after a crash re-derives the same part number.
fn part_number(offset: i64) -> i32 {
    (offset / PART_SIZE as i64) as i32 + 1
}

impl Registry {
    /// Start an upload session: scratch key, backing multipart upload,
    /// session row.
    pub async fn start_upload(&self, repo: &str, upload_id: UploadId) -> ApiResult<()> {
        let object_key = paths::upload_scratch_key(&upload_id);
        let multipart_id = self.storage.create_multipart(&object_key).await?;
        tracing::debug!(%upload_id, repo, %object_key, %multipart_id, "started upload session");

        let now = OffsetDateTime::now_utc();
        self.metadata
            .create_session(&UploadSessionRow {
                upload_id: *upload_id.as_uuid(),
                repository: repo.to_string(),
                digest: None,
                multipart_id: Some(multipart_id),
                object_key,
                created_at: now,
                last_activity: now,
                uploaded_size: 0,
            })
            .await?;
        Ok(())
    }

    /// Ingest one chunk at `offset`, returning the number of bytes
    /// accepted.
    ///
    /// The body is consumed as a stream and split on 5 MiB part
    /// boundaries, so a chunk larger than one part never assigns two
    /// ranges the same part number and peak buffering stays at one part.
    pub async fn upload_chunk(
        &self,
        upload_id: UploadId,
        offset: i64,
        mut body: ChunkStream,
    ) -> ApiResult<i64> {
        let session = self
            .metadata
            .get_session(*upload_id.as_uuid())
            .await?
            .ok_or_else(|| ApiError::SessionMissing(upload_id.to_string()))?;

        // Recovery for a start that failed after creating the row: bind
        // a multipart upload now and persist it before accepting bytes.
        let multipart_id = match session.multipart_id {
            Some(id) => id,
            None => {
                let id = self.storage.create_multipart(&session.object_key).await?;
                self.metadata
                    .update_session(*upload_id.as_uuid(), &id, session.uploaded_size)
                    .await?;
                id
            }
        };

        if offset != session.uploaded_size {
            return Err(ApiError::OutOfOrderChunk {
                expected: session.uploaded_size,
                got: offset,
            });
        }
        // A previous short chunk ended mid-part; accepting more bytes
        // would re-derive an already-used part number.
        if offset % PART_SIZE as i64 != 0 {
            return Err(ApiError::BadRange(format!(
                "chunk offset {offset} is not aligned to the {PART_SIZE}-byte part size"
            )));
        }

        let mut part_offset = offset;
        let mut buffer = BytesMut::new();
        while let Some(chunk) = body.next().await {
            let data =
                chunk.map_err(|e| ApiError::Internal(format!("failed to read chunk body: {e}")))?;
            buffer.extend_from_slice(&data);

            while buffer.len() >= PART_SIZE as usize {
                let part = buffer.split_to(PART_SIZE as usize).freeze();
                self.storage
                    .upload_part(
                        &session.object_key,
                        &multipart_id,
                        part_number(part_offset),
                        part,
                    )
                    .await?;
                part_offset += PART_SIZE as i64;
            }
        }

        if !buffer.is_empty() {
            let len = buffer.len() as i64;
            self.storage
                .upload_part(
                    &session.object_key,
                    &multipart_id,
                    part_number(part_offset),
                    buffer.freeze(),
                )
                .await?;
            part_offset += len;
        }

        let accepted = part_offset - offset;
        self.metadata
            .update_session(*upload_id.as_uuid(), &multipart_id, offset + accepted)
            .await?;

        tracing::debug!(%upload_id, offset, accepted, "accepted chunk");
        Ok(accepted)
    }

    /// Finalize an upload under its content-addressed key.
    ///
    /// Cleanup of the scratch object and the session row is best
    /// effort; failure to finalize or copy is fatal.
    pub async fn complete_upload(
        &self,
        upload_id: UploadId,
        expected_digest: &str,
    ) -> ApiResult<Digest> {
        let session = self
            .metadata
            .get_session(*upload_id.as_uuid())
            .await?
            .ok_or_else(|| ApiError::SessionMissing(upload_id.to_string()))?;

        let multipart_id = session.multipart_id.ok_or_else(|| {
            ApiError::Internal(format!("no active multipart upload for {upload_id}"))
        })?;

        let parts = self
            .storage
            .list_parts(&session.object_key, &multipart_id)
            .await?;
        self.storage
            .complete_multipart(&session.object_key, &multipart_id, &parts)
            .await?;

        let digest =
            Digest::parse(expected_digest).map_err(|e| ApiError::BadDigest(e.to_string()))?;
        let final_key = paths::blob_data_key(&digest);
        self.storage.copy(&session.object_key, &final_key).await?;

        if let Err(e) = self.storage.delete(&session.object_key).await {
            tracing::warn!(%upload_id, key = %session.object_key, error = %e, "failed to delete upload scratch object");
        }
        if let Err(e) = self.metadata.delete_session(*upload_id.as_uuid()).await {
            tracing::warn!(%upload_id, error = %e, "failed to delete upload session");
        }

        tracing::debug!(%upload_id, scratch = %session.object_key, %final_key, "completed upload");
        Ok(digest)
    }

    /// Abort an upload session. Idempotent: an unknown session is a
    /// no-op success.
    pub async fn abort_upload(&self, upload_id: UploadId) -> ApiResult<()> {
        let Some(session) = self.metadata.get_session(*upload_id.as_uuid()).await? else {
            return Ok(());
        };

        if let Some(multipart_id) = &session.multipart_id {
            if let Err(e) = self
                .storage
                .abort_multipart(&session.object_key, multipart_id)
                .await
            {
                tracing::warn!(%upload_id, %multipart_id, error = %e, "failed to abort multipart upload");
            }
        }

        if let Err(e) = self.metadata.delete_session(*upload_id.as_uuid()).await {
            tracing::warn!(%upload_id, error = %e, "failed to delete upload session");
        }
        Ok(())
    }

    /// Fetch a session for the status endpoint.
    pub async fn get_upload(&self, upload_id: UploadId) -> ApiResult<UploadSessionRow> {
        self.metadata
            .get_session(*upload_id.as_uuid())
            .await?
            .ok_or_else(|| ApiError::SessionMissing(upload_id.to_string()))
    }

    /// Abort every session idle since before `cutoff`. Individual
    /// failures are logged and skipped.
    pub async fn cleanup_stale_uploads(&self, cutoff: OffsetDateTime) -> ApiResult<usize> {
        let sessions = self.metadata.stale_sessions(cutoff).await?;
        let count = sessions.len();
        for session in sessions {
            let upload_id = UploadId::from(session.upload_id);
            if let Err(e) = self.abort_upload(upload_id).await {
                tracing::warn!(%upload_id, error = %e, "failed to clean up stale upload");
            }
        }
        tracing::info!(count, "cleaned up stale uploads");
        Ok(count)
    }
}
