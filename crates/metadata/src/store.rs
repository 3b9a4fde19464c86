//! Metadata store trait and SQLite implementation.

use crate::error::{MetadataError, MetadataResult};
use crate::models::UploadSessionRow;
use async_trait::async_trait;
use reg_core::ImageManifest;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use time::OffsetDateTime;
use uuid::Uuid;

/// Manifest, tag, and repository queries.
#[async_trait]
pub trait ManifestRepo {
    /// Look up the raw manifest bytes for `(repo, tag)`.
    ///
    /// Fails with [`MetadataError::NotFound`] when absent; the registry
    /// coordinator uses that as its cache-miss signal.
    async fn get_manifest(&self, repo: &str, tag: &str) -> MetadataResult<Vec<u8>>;

    /// Upsert a manifest with its decoded layer list.
    ///
    /// Registers the tag, replaces the manifest JSON, upserts the layer
    /// rows, and atomically replaces the ordered manifest-layer
    /// cross-reference. All-or-nothing.
    async fn put_manifest(
        &self,
        repo: &str,
        tag: &str,
        raw: &[u8],
        manifest: &ImageManifest,
    ) -> MetadataResult<()>;

    /// List the tag names recorded for a repository. Empty is not an error.
    async fn list_tags(&self, repo: &str) -> MetadataResult<Vec<String>>;

    /// Idempotent bulk tag registration without manifests. Used by the
    /// bootstrap crawler and the tag-list cache fill.
    async fn put_tags(&self, repo: &str, tags: &[String]) -> MetadataResult<()>;

    /// Return up to `limit` distinct repository names sorting strictly
    /// greater than `token` (empty token starts from the beginning),
    /// plus the continuation token for the next page.
    async fn list_repositories(
        &self,
        token: Option<&str>,
        limit: u32,
    ) -> MetadataResult<(Vec<String>, Option<String>)>;

    /// Fast existence check used by the bootstrap crawler to skip
    /// already-indexed tags.
    async fn tag_exists(&self, repo: &str, tag: &str) -> MetadataResult<bool>;
}

/// Upload session persistence.
#[async_trait]
pub trait UploadRepo {
    async fn create_session(&self, session: &UploadSessionRow) -> MetadataResult<()>;

    async fn get_session(&self, upload_id: Uuid) -> MetadataResult<Option<UploadSessionRow>>;

    /// Bind the multipart id and advance the committed offset. Bumps
    /// `last_activity`; this write is the chunk commit point.
    async fn update_session(
        &self,
        upload_id: Uuid,
        multipart_id: &str,
        uploaded_size: i64,
    ) -> MetadataResult<()>;

    async fn delete_session(&self, upload_id: Uuid) -> MetadataResult<()>;

    /// Sessions whose `last_activity` is before `cutoff`.
    async fn stale_sessions(&self, cutoff: OffsetDateTime)
        -> MetadataResult<Vec<UploadSessionRow>>;
}

/// Combined metadata store trait.
#[async_trait]
pub trait MetadataStore: ManifestRepo + UploadRepo + Send + Sync {
    /// Create the schema if it does not exist yet.
    async fn migrate(&self) -> MetadataResult<()>;

    /// Check database connectivity.
    async fn health_check(&self) -> MetadataResult<()>;

    /// Flush and close the underlying pool.
    async fn close(&self);
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tags (
    repository TEXT NOT NULL,
    name TEXT NOT NULL,
    PRIMARY KEY (repository, name)
);
CREATE TABLE IF NOT EXISTS manifests (
    tag_rowid INTEGER PRIMARY KEY,
    manifest_json BLOB NOT NULL
);
CREATE TABLE IF NOT EXISTS layers (
    digest TEXT PRIMARY KEY,
    media_type TEXT NOT NULL,
    size INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS manifest_layers (
    manifest_rowid INTEGER NOT NULL,
    layer_digest TEXT NOT NULL,
    layer_index INTEGER NOT NULL,
    PRIMARY KEY (manifest_rowid, layer_digest, layer_index)
);
CREATE TABLE IF NOT EXISTS upload_sessions (
    upload_id TEXT PRIMARY KEY,
    repository TEXT NOT NULL,
    digest TEXT,
    multipart_id TEXT,
    object_key TEXT NOT NULL,
    created_at TEXT NOT NULL,
    last_activity TEXT NOT NULL,
    uploaded_size INTEGER NOT NULL DEFAULT 0
);
"#;

/// SQLite-based metadata store.
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Open (or create) the index database at `path`.
    pub async fn new(path: impl AsRef<Path>) -> MetadataResult<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| MetadataError::Internal(e.to_string()))?;
            }
        }

        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{}?mode=rwc", path.display()))?
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal)
            // Prevent transient "database is locked" errors under concurrent access.
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            // SQLite permits limited write concurrency; a single connection
            // avoids persistent "database is locked" failures under load.
            .max_connections(1)
            .connect_with(opts)
            .await?;

        let store = Self { pool };
        store.migrate().await?;
        Ok(store)
    }

    /// Get a reference to the connection pool.
    pub fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }
}

#[async_trait]
impl MetadataStore for SqliteStore {
    async fn migrate(&self) -> MetadataResult<()> {
        sqlx::query(SCHEMA_SQL).execute(&self.pool).await?;
        Ok(())
    }

    async fn health_check(&self) -> MetadataResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    async fn close(&self) {
        self.pool.close().await;
    }
}

#[async_trait]
impl ManifestRepo for SqliteStore {
    async fn get_manifest(&self, repo: &str, tag: &str) -> MetadataResult<Vec<u8>> {
        let row: Option<Vec<u8>> = sqlx::query_scalar(
            r#"
            SELECT m.manifest_json FROM manifests m
            JOIN tags t ON t.rowid = m.tag_rowid
            WHERE t.repository = ? AND t.name = ?
            "#,
        )
        .bind(repo)
        .bind(tag)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| MetadataError::NotFound(format!("manifest for {repo}:{tag}")))
    }

    async fn put_manifest(
        &self,
        repo: &str,
        tag: &str,
        raw: &[u8],
        manifest: &ImageManifest,
    ) -> MetadataResult<()> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO tags (repository, name) VALUES (?, ?)
             ON CONFLICT (repository, name) DO NOTHING",
        )
        .bind(repo)
        .bind(tag)
        .execute(&mut *tx)
        .await?;

        let tag_rowid: i64 =
            sqlx::query_scalar("SELECT rowid FROM tags WHERE repository = ? AND name = ?")
                .bind(repo)
                .bind(tag)
                .fetch_one(&mut *tx)
                .await?;

        // manifests.tag_rowid is an INTEGER PRIMARY KEY, so it doubles as
        // the manifest rowid referenced by manifest_layers.
        sqlx::query(
            "INSERT INTO manifests (tag_rowid, manifest_json) VALUES (?, ?)
             ON CONFLICT (tag_rowid) DO UPDATE SET manifest_json = excluded.manifest_json",
        )
        .bind(tag_rowid)
        .bind(raw)
        .execute(&mut *tx)
        .await?;

        for layer in &manifest.layers {
            sqlx::query(
                "INSERT INTO layers (digest, media_type, size) VALUES (?, ?, ?)
                 ON CONFLICT (digest) DO UPDATE SET
                     media_type = excluded.media_type,
                     size = excluded.size",
            )
            .bind(&layer.digest)
            .bind(&layer.media_type)
            .bind(layer.size)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("DELETE FROM manifest_layers WHERE manifest_rowid = ?")
            .bind(tag_rowid)
            .execute(&mut *tx)
            .await?;

        for (index, layer) in manifest.layers.iter().enumerate() {
            sqlx::query(
                "INSERT INTO manifest_layers (manifest_rowid, layer_digest, layer_index)
                 VALUES (?, ?, ?)",
            )
            .bind(tag_rowid)
            .bind(&layer.digest)
            .bind(index as i64)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_tags(&self, repo: &str) -> MetadataResult<Vec<String>> {
        let tags = sqlx::query_scalar("SELECT name FROM tags WHERE repository = ?")
            .bind(repo)
            .fetch_all(&self.pool)
            .await?;
        Ok(tags)
    }

    async fn put_tags(&self, repo: &str, tags: &[String]) -> MetadataResult<()> {
        let mut tx = self.pool.begin().await?;
        for tag in tags {
            sqlx::query(
                "INSERT INTO tags (repository, name) VALUES (?, ?)
                 ON CONFLICT (repository, name) DO NOTHING",
            )
            .bind(repo)
            .bind(tag)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn list_repositories(
        &self,
        token: Option<&str>,
        limit: u32,
    ) -> MetadataResult<(Vec<String>, Option<String>)> {
        let repos: Vec<String> = sqlx::query_scalar(
            "SELECT DISTINCT repository FROM tags WHERE repository > ?
             ORDER BY repository LIMIT ?",
        )
        .bind(token.unwrap_or(""))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let next_token = repos.last().cloned();
        Ok((repos, next_token))
    }

    async fn tag_exists(&self, repo: &str, tag: &str) -> MetadataResult<bool> {
        let row: Option<i32> =
            sqlx::query_scalar("SELECT 1 FROM tags WHERE repository = ? AND name = ?")
                .bind(repo)
                .bind(tag)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.is_some())
    }
}

#[async_trait]
impl UploadRepo for SqliteStore {
    async fn create_session(&self, session: &UploadSessionRow) -> MetadataResult<()> {
        sqlx::query(
            r#"
            INSERT INTO upload_sessions (
                upload_id, repository, digest, multipart_id, object_key,
                created_at, last_activity, uploaded_size
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(session.upload_id)
        .bind(&session.repository)
        .bind(&session.digest)
        .bind(&session.multipart_id)
        .bind(&session.object_key)
        .bind(session.created_at)
        .bind(session.last_activity)
        .bind(session.uploaded_size)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_session(&self, upload_id: Uuid) -> MetadataResult<Option<UploadSessionRow>> {
        let row = sqlx::query_as::<_, UploadSessionRow>(
            "SELECT * FROM upload_sessions WHERE upload_id = ?",
        )
        .bind(upload_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row)
    }

    async fn update_session(
        &self,
        upload_id: Uuid,
        multipart_id: &str,
        uploaded_size: i64,
    ) -> MetadataResult<()> {
        let result = sqlx::query(
            "UPDATE upload_sessions
             SET multipart_id = ?, uploaded_size = ?, last_activity = ?
             WHERE upload_id = ?",
        )
        .bind(multipart_id)
        .bind(uploaded_size)
        .bind(OffsetDateTime::now_utc())
        .bind(upload_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(MetadataError::NotFound(format!(
                "upload session {upload_id}"
            )));
        }
        Ok(())
    }

    async fn delete_session(&self, upload_id: Uuid) -> MetadataResult<()> {
        sqlx::query("DELETE FROM upload_sessions WHERE upload_id = ?")
            .bind(upload_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn stale_sessions(
        &self,
        cutoff: OffsetDateTime,
    ) -> MetadataResult<Vec<UploadSessionRow>> {
        let rows = sqlx::query_as::<_, UploadSessionRow>(
            "SELECT * FROM upload_sessions WHERE last_activity < ?",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }
}
