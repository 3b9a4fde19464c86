//! OCI image manifest model.
//!
//! Decode-only: the registry stores the raw manifest bytes verbatim and
//! only needs the media type and the ordered layer list. The raw bytes
//! stay the source of truth because the content digest depends on byte
//! identity.

use serde::{Deserialize, Serialize};

/// An OCI content descriptor: media type, digest, size.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Descriptor {
    pub media_type: String,
    pub digest: String,
    pub size: i64,
}

/// An OCI image manifest, reduced to the fields the index tracks.
///
/// Unknown fields are ignored on decode and never re-serialized; callers
/// must keep the original bytes for responses.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageManifest {
    #[serde(default)]
    pub schema_version: i32,
    #[serde(default)]
    pub media_type: String,
    #[serde(default)]
    pub config: Option<Descriptor>,
    #[serde(default)]
    pub layers: Vec<Descriptor>,
}

impl ImageManifest {
    /// Decode a manifest from its raw JSON bytes.
    pub fn decode(bytes: &[u8]) -> crate::Result<Self> {
        serde_json::from_slice(bytes).map_err(|e| crate::Error::InvalidManifest(e.to_string()))
    }
}
