//! Database models mapping to the metadata schema.

use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Upload session record.
///
/// `uploaded_size` is the authoritative next-expected chunk offset;
/// `multipart_id` is unset until the backing multipart upload is bound.
#[derive(Debug, Clone, FromRow)]
pub struct UploadSessionRow {
    pub upload_id: Uuid,
    pub repository: String,
    pub digest: Option<String>,
    pub multipart_id: Option<String>,
    pub object_key: String,
    pub created_at: OffsetDateTime,
    pub last_activity: OffsetDateTime,
    pub uploaded_size: i64,
}
