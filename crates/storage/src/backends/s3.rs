//! S3-compatible storage backend using the AWS SDK.

use crate::error::{StorageError, StorageResult};
use crate::traits::{ListingPage, ObjectStore, UploadedPart};
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::Client;
use aws_sdk_s3::presigning::PresigningConfig;
use aws_sdk_s3::types::{CompletedMultipartUpload, CompletedPart};
use bytes::Bytes;
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use reg_core::config::StorageConfig;
use std::time::Duration;
use tracing::instrument;

/// S3-compatible object store over a single bucket.
pub struct S3Backend {
    client: Client,
    bucket: String,
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .finish_non_exhaustive()
    }
}

impl S3Backend {
    /// Create a new S3 backend from configuration.
    ///
    /// Credentials come from the config when set, otherwise from the
    /// ambient AWS credential chain (env vars, profile, IMDS).
    pub async fn new(config: &StorageConfig) -> StorageResult<Self> {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest()).load().await;
        let mut builder = aws_sdk_s3::config::Builder::from(&sdk_config);

        if let Some(region) = &config.region {
            builder = builder.region(aws_config::Region::new(region.clone()));
        }

        if let (Some(key_id), Some(secret)) = (&config.access_key_id, &config.secret_access_key) {
            let credentials = aws_sdk_s3::config::Credentials::new(
                key_id.clone(),
                secret.clone(),
                None,
                None,
                "reg-config",
            );
            builder = builder.credentials_provider(credentials);
        }

        if let Some(endpoint) = &config.endpoint {
            // Bare host:port endpoints (e.g. "minio:9000") get a scheme.
            let endpoint_lower = endpoint.to_ascii_lowercase();
            let endpoint_url = if endpoint_lower.starts_with("http://")
                || endpoint_lower.starts_with("https://")
            {
                endpoint.clone()
            } else {
                format!("http://{endpoint}")
            };
            builder = builder.endpoint_url(endpoint_url);
        }

        if config.force_path_style {
            builder = builder.force_path_style(true);
        }

        Ok(Self {
            client: Client::from_conf(builder.build()),
            bucket: config.bucket.clone(),
        })
    }

    /// Convert an AWS SDK error to StorageError, mapping 404s to NotFound.
    fn map_sdk_error<E>(err: aws_sdk_s3::error::SdkError<E>, key: &str) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        if let aws_sdk_s3::error::SdkError::ServiceError(ref service_err) = err {
            if service_err.raw().status().as_u16() == 404 {
                return StorageError::NotFound(key.to_string());
            }
        }
        StorageError::S3(Box::new(err))
    }
}

#[async_trait]
impl ObjectStore for S3Backend {
    #[instrument(skip(self), fields(backend = "s3"))]
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        let output = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?
            .into_bytes();

        Ok(bytes)
    }

    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(data.into())
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.client
            .delete_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        // CopySource is "bucket/key" with the key percent-encoded.
        let encoded_key = utf8_percent_encode(from, NON_ALPHANUMERIC).to_string();
        let copy_source = format!("{}/{}", self.bucket, encoded_key);

        self.client
            .copy_object()
            .bucket(&self.bucket)
            .key(to)
            .copy_source(&copy_source)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, from))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn list_page(&self, prefix: &str, token: Option<&str>) -> StorageResult<ListingPage> {
        let mut request = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix);

        if let Some(token) = token {
            request = request.continuation_token(token);
        }

        let output = request
            .send()
            .await
            .map_err(|e| StorageError::S3(Box::new(e)))?;

        let keys = output
            .contents()
            .iter()
            .filter_map(|obj| obj.key().map(|k| k.to_string()))
            .collect();

        let next_token = if output.is_truncated() == Some(true) {
            output.next_continuation_token().map(|s| s.to_string())
        } else {
            None
        };

        Ok(ListingPage { keys, next_token })
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let presigned = self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;

        Ok(presigned.uri().to_string())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn presign_head(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        let presigning = PresigningConfig::expires_in(expires_in)
            .map_err(|e| StorageError::Presign(e.to_string()))?;

        let presigned = self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;

        Ok(presigned.uri().to_string())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn create_multipart(&self, key: &str) -> StorageResult<String> {
        let output = self
            .client
            .create_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;

        output
            .upload_id()
            .map(|id| id.to_string())
            .ok_or_else(|| StorageError::Multipart("S3 did not return an upload id".to_string()))
    }

    #[instrument(skip(self, data), fields(backend = "s3", size = data.len()))]
    async fn upload_part(
        &self,
        key: &str,
        multipart_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> StorageResult<()> {
        self.client
            .upload_part()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(multipart_id)
            .part_number(part_number)
            .body(data.into())
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn list_parts(&self, key: &str, multipart_id: &str) -> StorageResult<Vec<UploadedPart>> {
        let output = self
            .client
            .list_parts()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(multipart_id)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;

        Ok(output
            .parts()
            .iter()
            .map(|part| UploadedPart {
                part_number: part.part_number().unwrap_or_default(),
                etag: part.e_tag().unwrap_or_default().to_string(),
            })
            .collect())
    }

    #[instrument(skip(self, parts), fields(backend = "s3", parts = parts.len()))]
    async fn complete_multipart(
        &self,
        key: &str,
        multipart_id: &str,
        parts: &[UploadedPart],
    ) -> StorageResult<()> {
        let completed_parts: Vec<CompletedPart> = parts
            .iter()
            .map(|part| {
                CompletedPart::builder()
                    .e_tag(&part.etag)
                    .part_number(part.part_number)
                    .build()
            })
            .collect();

        let completed = CompletedMultipartUpload::builder()
            .set_parts(Some(completed_parts))
            .build();

        self.client
            .complete_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(multipart_id)
            .multipart_upload(completed)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;
        Ok(())
    }

    #[instrument(skip(self), fields(backend = "s3"))]
    async fn abort_multipart(&self, key: &str, multipart_id: &str) -> StorageResult<()> {
        self.client
            .abort_multipart_upload()
            .bucket(&self.bucket)
            .key(key)
            .upload_id(multipart_id)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(e, key))?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "s3"
    }
}
