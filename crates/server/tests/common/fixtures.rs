//! Shared test fixtures.

use super::memory::MemoryStore;
use bytes::Bytes;
use reg_core::{Digest, paths};

/// Digest of the literal blob `"hello"`.
pub const HELLO_DIGEST: &str =
    "sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

/// A minimal OCI manifest body referencing one layer.
pub fn manifest_body(layer_digest: &str, layer_size: i64) -> Vec<u8> {
    format!(
        concat!(
            r#"{{"schemaVersion":2,"#,
            r#""mediaType":"application/vnd.oci.image.manifest.v1+json","#,
            r#""layers":[{{"digest":"{}","mediaType":"application/octet-stream","size":{}}}]}}"#
        ),
        layer_digest, layer_size
    )
    .into_bytes()
}

/// Seed a manifest straight into the bucket (blob plus `current/link`),
/// the way a pre-existing registry bucket would hold it.
pub fn seed_bucket_manifest(storage: &MemoryStore, repo: &str, tag: &str, body: &[u8]) -> Digest {
    let digest = Digest::from_bytes(body);
    storage.insert(&paths::blob_data_key(&digest), Bytes::from(body.to_vec()));
    storage.insert(
        &paths::tag_current_key(repo, tag),
        Bytes::from(digest.to_string()),
    );
    digest
}
