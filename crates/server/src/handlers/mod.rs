//! HTTP request handlers.

pub mod blobs;
pub mod manifests;
pub mod repositories;
pub mod tags;
pub mod uploads;

pub use repositories::list_repositories;

use crate::routes::{OciRoute, parse_oci_path};
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use percent_encoding::percent_decode_str;

/// GET /v2/ — API support probe.
pub async fn api_probe() -> StatusCode {
    StatusCode::OK
}

/// Extract a query parameter, percent-decoded.
pub(crate) fn query_param(query: Option<&str>, name: &str) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == name)
        .map(|(_, value)| percent_decode_str(value).decode_utf8_lossy().into_owned())
}

/// Fallback dispatcher for every endpoint carrying a repository name.
///
/// Repository names contain slashes, so these paths cannot be expressed
/// as typed routes; they are parsed by marker segment instead.
pub async fn dispatch(State(state): State<AppState>, req: Request) -> Response {
    let path = req.uri().path().to_string();
    let Some(route) = parse_oci_path(&path) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let method = req.method().clone();
    let query = req.uri().query().map(|q| q.to_string());

    // `http::Method` constants are not patterns, so dispatch matches on
    // the method name.
    let result = match (route, method.as_str()) {
        (OciRoute::Blob { name, digest }, "GET" | "HEAD") => {
            blobs::redirect(&state, &name, &digest, &method).await
        }
        (OciRoute::Blob { .. }, "DELETE") => blobs::delete_stub().await,

        (OciRoute::Manifest { name, reference }, "GET") => {
            manifests::get(&state, &name, &reference, true).await
        }
        (OciRoute::Manifest { name, reference }, "HEAD") => {
            manifests::get(&state, &name, &reference, false).await
        }
        (OciRoute::Manifest { name, reference }, "PUT") => {
            manifests::put(&state, &name, &reference, req).await
        }
        (OciRoute::Manifest { .. }, "DELETE") => manifests::delete_stub().await,

        (OciRoute::UploadStart { name }, "POST") => {
            uploads::start(&state, &name, query.as_deref(), req).await
        }

        (OciRoute::Upload { name, reference }, "PATCH" | "PUT") => {
            match query_param(query.as_deref(), "digest") {
                Some(digest) => uploads::complete(&state, &name, &reference, &digest).await,
                None => uploads::chunk(&state, &name, &reference, req).await,
            }
        }
        (OciRoute::Upload { name, reference }, "GET") => {
            uploads::status(&state, &name, &reference).await
        }
        (OciRoute::Upload { reference, .. }, "DELETE") => {
            uploads::cancel(&state, &reference).await
        }

        (OciRoute::TagList { name }, "GET") => tags::list(&state, &name).await,

        (OciRoute::Referrers { .. }, "GET") => Ok(StatusCode::OK.into_response()),

        _ => Ok(StatusCode::METHOD_NOT_ALLOWED.into_response()),
    };

    match result {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(%path, error = %e, "request failed");
            e.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_param_decodes_percent_escapes() {
        let query = Some("digest=sha256%3Aabcd&n=5");
        assert_eq!(
            query_param(query, "digest"),
            Some("sha256:abcd".to_string())
        );
        assert_eq!(query_param(query, "n"), Some("5".to_string()));
        assert_eq!(query_param(query, "mount"), None);
        assert_eq!(query_param(None, "digest"), None);
    }
}
