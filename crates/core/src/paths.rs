//! Docker Registry v2 bucket key layout.
//!
//! Legacy tooling reads these keys directly, so the layout is bit-exact:
//!
//! - blob data: `docker/registry/v2/blobs/<algo>/<hex[0:2]>/<hex>/data`
//! - tag pointer: `.../repositories/<name>/_manifests/tags/<tag>/current/link`
//! - tag revision: `.../repositories/<name>/_manifests/tags/<tag>/index/<algo>/<hex>/link`
//! - revision: `.../repositories/<name>/_manifests/revisions/<algo>/<hex>/link`
//! - upload scratch: `uploads/<uploadId>.uploading`
//!
//! Link file bodies are the literal textual digest (`sha256:abc...`).

use crate::Digest;
use crate::UploadId;

/// Prefix under which all repository metadata lives.
pub const REPOSITORIES_PREFIX: &str = "docker/registry/v2/repositories/";

const CURRENT_LINK_SUFFIX: &str = "/current/link";
const TAGS_MARKER: &str = "/_manifests/tags/";

/// Key of a blob's data object.
pub fn blob_data_key(digest: &Digest) -> String {
    format!(
        "docker/registry/v2/blobs/{}/{}/{}/data",
        digest.algorithm(),
        &digest.hex()[..2],
        digest.hex()
    )
}

/// Key of the `current/link` pointer for a tag.
pub fn tag_current_key(repo: &str, tag: &str) -> String {
    format!("{REPOSITORIES_PREFIX}{repo}/_manifests/tags/{tag}{CURRENT_LINK_SUFFIX}")
}

/// Key of the per-revision-under-tag index pointer.
pub fn tag_index_key(repo: &str, tag: &str, digest: &Digest) -> String {
    format!(
        "{REPOSITORIES_PREFIX}{repo}/_manifests/tags/{tag}/index/{}/{}/link",
        digest.algorithm(),
        digest.hex()
    )
}

/// Key of the global revision pointer for a repository.
pub fn revision_key(repo: &str, digest: &Digest) -> String {
    format!(
        "{REPOSITORIES_PREFIX}{repo}/_manifests/revisions/{}/{}/link",
        digest.algorithm(),
        digest.hex()
    )
}

/// Listing prefix that covers every tag pointer of a repository.
pub fn tags_prefix(repo: &str) -> String {
    format!("{REPOSITORIES_PREFIX}{repo}{TAGS_MARKER}")
}

/// Scratch key backing an in-flight upload session.
pub fn upload_scratch_key(upload_id: &UploadId) -> String {
    format!("uploads/{upload_id}.uploading")
}

/// Extract the tag name from a key under [`tags_prefix`], if the key is
/// a `current/link` pointer.
pub fn tag_from_key(key: &str, repo: &str) -> Option<String> {
    let rest = key.strip_prefix(&tags_prefix(repo))?;
    let tag = rest.strip_suffix(CURRENT_LINK_SUFFIX)?;
    // Nested keys under the tag directory (e.g. index/...) carry slashes.
    (!tag.is_empty() && !tag.contains('/')).then(|| tag.to_string())
}

/// Split a `current/link` key under [`REPOSITORIES_PREFIX`] into
/// `(repository, tag)`, as the bootstrap crawler sees them.
pub fn repo_tag_from_key(key: &str) -> Option<(String, String)> {
    let rest = key.strip_prefix(REPOSITORIES_PREFIX)?;
    let rest = rest.strip_suffix(CURRENT_LINK_SUFFIX)?;
    let (repo, tag) = rest.split_once(TAGS_MARKER)?;
    (!repo.is_empty() && !tag.is_empty() && !tag.contains('/'))
        .then(|| (repo.to_string(), tag.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_digest() -> Digest {
        Digest::parse("sha256:2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824")
            .unwrap()
    }

    #[test]
    fn blob_key_shards_on_first_two_hex_chars() {
        assert_eq!(
            blob_data_key(&hello_digest()),
            "docker/registry/v2/blobs/sha256/2c/2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824/data"
        );
    }

    #[test]
    fn link_keys_match_v2_layout() {
        let d = hello_digest();
        assert_eq!(
            tag_current_key("lib/app", "v1"),
            "docker/registry/v2/repositories/lib/app/_manifests/tags/v1/current/link"
        );
        assert_eq!(
            tag_index_key("lib/app", "v1", &d),
            format!(
                "docker/registry/v2/repositories/lib/app/_manifests/tags/v1/index/sha256/{}/link",
                d.hex()
            )
        );
        assert_eq!(
            revision_key("lib/app", &d),
            format!(
                "docker/registry/v2/repositories/lib/app/_manifests/revisions/sha256/{}/link",
                d.hex()
            )
        );
    }

    #[test]
    fn tag_from_key_strips_prefix_and_suffix() {
        let key = "docker/registry/v2/repositories/lib/app/_manifests/tags/v1/current/link";
        assert_eq!(tag_from_key(key, "lib/app"), Some("v1".to_string()));
        // index pointers are not tags
        let index = "docker/registry/v2/repositories/lib/app/_manifests/tags/v1/index/sha256/ab/link";
        assert_eq!(tag_from_key(index, "lib/app"), None);
    }

    #[test]
    fn repo_tag_from_key_handles_slash_names() {
        let key = "docker/registry/v2/repositories/lib/nested/app/_manifests/tags/v2/current/link";
        assert_eq!(
            repo_tag_from_key(key),
            Some(("lib/nested/app".to_string(), "v2".to_string()))
        );
        assert_eq!(repo_tag_from_key("docker/registry/v2/blobs/sha256/ab/abcd/data"), None);
    }

    #[test]
    fn scratch_key_uses_upload_id() {
        let id = UploadId::new();
        assert_eq!(upload_scratch_key(&id), format!("uploads/{id}.uploading"));
    }
}
