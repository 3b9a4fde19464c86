//! In-memory object store test double.
//!
//! Emulates the slice of S3 behavior the registry relies on: plain
//! object CRUD, paged listing with continuation tokens, multipart
//! uploads assembled on completion, and fake presigned URLs of the form
//! `memory://<key>?expires=<secs>` that tests dereference against the
//! store directly.

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use reg_storage::error::{StorageError, StorageResult};
use reg_storage::traits::{ListingPage, ObjectStore, UploadedPart};
use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;
use std::time::Duration;

#[derive(Default)]
struct Multipart {
    key: String,
    parts: BTreeMap<i32, Bytes>,
}

#[derive(Default)]
struct Inner {
    objects: BTreeMap<String, Bytes>,
    multiparts: HashMap<String, Multipart>,
    next_multipart: u64,
    aborted: Vec<String>,
}

pub struct MemoryStore {
    page_size: usize,
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::with_page_size(1000)
    }

    /// A small page size makes listing pagination observable in tests.
    pub fn with_page_size(page_size: usize) -> Self {
        Self {
            page_size,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Seed an object directly, bypassing the registry.
    pub fn insert(&self, key: &str, data: Bytes) {
        self.inner
            .lock()
            .unwrap()
            .objects
            .insert(key.to_string(), data);
    }

    /// Read an object directly.
    pub fn object(&self, key: &str) -> Option<Bytes> {
        self.inner.lock().unwrap().objects.get(key).cloned()
    }

    /// Remove an object directly.
    #[allow(dead_code)]
    pub fn remove(&self, key: &str) {
        self.inner.lock().unwrap().objects.remove(key);
    }

    /// All stored keys, sorted.
    #[allow(dead_code)]
    pub fn keys(&self) -> Vec<String> {
        self.inner.lock().unwrap().objects.keys().cloned().collect()
    }

    /// Number of multipart uploads still in flight.
    pub fn multipart_count(&self) -> usize {
        self.inner.lock().unwrap().multiparts.len()
    }

    /// Ids of aborted multipart uploads.
    #[allow(dead_code)]
    pub fn aborted_multiparts(&self) -> Vec<String> {
        self.inner.lock().unwrap().aborted.clone()
    }

    /// Resolve a fake presigned URL back to the underlying object.
    pub fn resolve_presigned(&self, url: &str) -> Option<Bytes> {
        let key = url.strip_prefix("memory://")?.split('?').next()?;
        self.object(key)
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get(&self, key: &str) -> StorageResult<Bytes> {
        self.object(key)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn put(&self, key: &str, data: Bytes) -> StorageResult<()> {
        self.insert(key, data);
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.inner.lock().unwrap().objects.remove(key);
        Ok(())
    }

    async fn copy(&self, from: &str, to: &str) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let data = inner
            .objects
            .get(from)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(from.to_string()))?;
        inner.objects.insert(to.to_string(), data);
        Ok(())
    }

    async fn list_page(&self, prefix: &str, token: Option<&str>) -> StorageResult<ListingPage> {
        let inner = self.inner.lock().unwrap();
        let matching: Vec<&String> = inner
            .objects
            .keys()
            .filter(|key| key.starts_with(prefix))
            .filter(|key| token.is_none_or(|t| key.as_str() > t))
            .collect();

        let keys: Vec<String> = matching
            .iter()
            .take(self.page_size)
            .map(|k| k.to_string())
            .collect();
        let next_token = (matching.len() > self.page_size)
            .then(|| keys.last().cloned())
            .flatten();

        Ok(ListingPage { keys, next_token })
    }

    async fn presign_get(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        Ok(format!("memory://{key}?expires={}", expires_in.as_secs()))
    }

    async fn presign_head(&self, key: &str, expires_in: Duration) -> StorageResult<String> {
        Ok(format!("memory://{key}?expires={}", expires_in.as_secs()))
    }

    async fn create_multipart(&self, key: &str) -> StorageResult<String> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_multipart += 1;
        let id = format!("mp-{}", inner.next_multipart);
        inner.multiparts.insert(
            id.clone(),
            Multipart {
                key: key.to_string(),
                parts: BTreeMap::new(),
            },
        );
        Ok(id)
    }

    async fn upload_part(
        &self,
        key: &str,
        multipart_id: &str,
        part_number: i32,
        data: Bytes,
    ) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let multipart = inner
            .multiparts
            .get_mut(multipart_id)
            .ok_or_else(|| StorageError::Multipart(format!("no such upload {multipart_id}")))?;
        if multipart.key != key {
            return Err(StorageError::InvalidKey(format!(
                "multipart {multipart_id} belongs to {}, not {key}",
                multipart.key
            )));
        }
        multipart.parts.insert(part_number, data);
        Ok(())
    }

    async fn list_parts(&self, _key: &str, multipart_id: &str) -> StorageResult<Vec<UploadedPart>> {
        let inner = self.inner.lock().unwrap();
        let multipart = inner
            .multiparts
            .get(multipart_id)
            .ok_or_else(|| StorageError::Multipart(format!("no such upload {multipart_id}")))?;
        Ok(multipart
            .parts
            .iter()
            .map(|(number, data)| UploadedPart {
                part_number: *number,
                etag: format!("\"etag-{number}-{}\"", data.len()),
            })
            .collect())
    }

    async fn complete_multipart(
        &self,
        key: &str,
        multipart_id: &str,
        parts: &[UploadedPart],
    ) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let multipart = inner
            .multiparts
            .remove(multipart_id)
            .ok_or_else(|| StorageError::Multipart(format!("no such upload {multipart_id}")))?;

        let mut assembled = BytesMut::new();
        for part in parts {
            let data = multipart.parts.get(&part.part_number).ok_or_else(|| {
                StorageError::Multipart(format!("unknown part {}", part.part_number))
            })?;
            let expected_etag = format!("\"etag-{}-{}\"", part.part_number, data.len());
            if part.etag != expected_etag {
                return Err(StorageError::Multipart(format!(
                    "etag mismatch for part {}",
                    part.part_number
                )));
            }
            assembled.extend_from_slice(data);
        }

        inner.objects.insert(key.to_string(), assembled.freeze());
        Ok(())
    }

    async fn abort_multipart(&self, _key: &str, multipart_id: &str) -> StorageResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner
            .multiparts
            .remove(multipart_id)
            .ok_or_else(|| StorageError::Multipart(format!("no such upload {multipart_id}")))?;
        inner.aborted.push(multipart_id.to_string());
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
