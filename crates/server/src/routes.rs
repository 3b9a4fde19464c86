//! Route configuration and OCI path parsing.
//!
//! Repository names contain slashes (`lib/app`), which a segment-typed
//! router cannot express. Only the fixed endpoints are registered as
//! routes; everything else under `/v2/` goes through the fallback
//! dispatcher, which parses the path by scanning for the OCI marker
//! segments from the end.

use crate::handlers;
use crate::state::AppState;
use axum::Router;
use axum::routing::get;
use tower_http::trace::TraceLayer;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // end-1: API support probe
        .route("/v2/", get(handlers::api_probe))
        // extension: paginated repository listing
        .route("/v2/repositories", get(handlers::list_repositories))
        // everything with a repository name in it
        .fallback(handlers::dispatch)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A parsed OCI route under `/v2/`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OciRoute {
    /// `/{name}/blobs/{digest}`
    Blob { name: String, digest: String },
    /// `/{name}/manifests/{reference}`
    Manifest { name: String, reference: String },
    /// `/{name}/tags/list`
    TagList { name: String },
    /// `/{name}/blobs/uploads/`
    UploadStart { name: String },
    /// `/{name}/blobs/uploads/{reference}`
    Upload { name: String, reference: String },
    /// `/{name}/referrers/{digest}`
    Referrers { name: String, digest: String },
}

/// Parse a request path into an [`OciRoute`].
///
/// The repository name is everything before the marker segment, so the
/// markers are matched against the path tail: the last segments win,
/// and a repository literally named `blobs` or `manifests` is out of
/// scope (the OCI grammar reserves them).
pub fn parse_oci_path(path: &str) -> Option<OciRoute> {
    let rest = path.strip_prefix("/v2/")?;
    let segments: Vec<&str> = rest.split('/').collect();
    let n = segments.len();

    let name = |count: usize| -> Option<String> {
        let prefix = &segments[..n - count];
        (!prefix.is_empty() && prefix.iter().all(|s| !s.is_empty()))
            .then(|| prefix.join("/"))
    };

    // `/{name}/blobs/uploads/` (trailing slash optional)
    if n >= 3 && segments[n - 1].is_empty() && segments[n - 2] == "uploads" && segments[n - 3] == "blobs"
    {
        return Some(OciRoute::UploadStart { name: name(3)? });
    }
    if n >= 2 && segments[n - 1] == "uploads" && segments[n - 2] == "blobs" {
        return Some(OciRoute::UploadStart { name: name(2)? });
    }
    // `/{name}/blobs/uploads/{reference}`
    if n >= 3 && segments[n - 2] == "uploads" && segments[n - 3] == "blobs" {
        return Some(OciRoute::Upload {
            name: name(3)?,
            reference: segments[n - 1].to_string(),
        });
    }
    // `/{name}/tags/list`
    if n >= 2 && segments[n - 1] == "list" && segments[n - 2] == "tags" {
        return Some(OciRoute::TagList { name: name(2)? });
    }
    // `/{name}/manifests/{reference}`
    if n >= 2 && segments[n - 2] == "manifests" && !segments[n - 1].is_empty() {
        return Some(OciRoute::Manifest {
            name: name(2)?,
            reference: segments[n - 1].to_string(),
        });
    }
    // `/{name}/blobs/{digest}`
    if n >= 2 && segments[n - 2] == "blobs" && !segments[n - 1].is_empty() {
        return Some(OciRoute::Blob {
            name: name(2)?,
            digest: segments[n - 1].to_string(),
        });
    }
    // `/{name}/referrers/{digest}`
    if n >= 2 && segments[n - 2] == "referrers" && !segments[n - 1].is_empty() {
        return Some(OciRoute::Referrers {
            name: name(2)?,
            digest: segments[n - 1].to_string(),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_blob_with_nested_name() {
        assert_eq!(
            parse_oci_path("/v2/lib/app/blobs/sha256:abcd"),
            Some(OciRoute::Blob {
                name: "lib/app".to_string(),
                digest: "sha256:abcd".to_string(),
            })
        );
    }

    #[test]
    fn parses_manifest_reference() {
        assert_eq!(
            parse_oci_path("/v2/a/b/c/manifests/v1"),
            Some(OciRoute::Manifest {
                name: "a/b/c".to_string(),
                reference: "v1".to_string(),
            })
        );
    }

    #[test]
    fn parses_upload_start_with_and_without_trailing_slash() {
        let expected = Some(OciRoute::UploadStart {
            name: "lib/app".to_string(),
        });
        assert_eq!(parse_oci_path("/v2/lib/app/blobs/uploads/"), expected);
        assert_eq!(parse_oci_path("/v2/lib/app/blobs/uploads"), expected);
    }

    #[test]
    fn parses_upload_reference() {
        assert_eq!(
            parse_oci_path("/v2/lib/app/blobs/uploads/abc-123"),
            Some(OciRoute::Upload {
                name: "lib/app".to_string(),
                reference: "abc-123".to_string(),
            })
        );
    }

    #[test]
    fn parses_tag_list() {
        assert_eq!(
            parse_oci_path("/v2/lib/app/tags/list"),
            Some(OciRoute::TagList {
                name: "lib/app".to_string(),
            })
        );
    }

    #[test]
    fn parses_referrers() {
        assert_eq!(
            parse_oci_path("/v2/lib/app/referrers/sha256:abcd"),
            Some(OciRoute::Referrers {
                name: "lib/app".to_string(),
                digest: "sha256:abcd".to_string(),
            })
        );
    }

    #[test]
    fn rejects_paths_without_name() {
        assert!(parse_oci_path("/v2/blobs/sha256:abcd").is_none());
        assert!(parse_oci_path("/v2/manifests/v1").is_none());
        assert!(parse_oci_path("/v1/lib/app/blobs/sha256:abcd").is_none());
        assert!(parse_oci_path("/v2/lib//blobs/sha256:abcd").is_none());
    }
}
