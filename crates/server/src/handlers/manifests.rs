//! Manifest handlers.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use reg_core::Digest;

/// GET/HEAD `/v2/{name}/manifests/{reference}`.
///
/// The body is the exact bytes that were put; `Content-Length` is set
/// explicitly so HEAD responses carry it too.
pub async fn get(
    state: &AppState,
    name: &str,
    reference: &str,
    include_body: bool,
) -> ApiResult<Response> {
    let (manifest, raw) = state.registry.get_manifest(name, reference).await?;
    let digest = Digest::from_bytes(&raw);

    let content_type = if manifest.media_type.is_empty() {
        "application/octet-stream".to_string()
    } else {
        manifest.media_type
    };

    let builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(header::CONTENT_LENGTH, raw.len())
        .header("Docker-Content-Digest", digest.to_string());

    let body = if include_body {
        Body::from(raw)
    } else {
        Body::empty()
    };
    builder
        .body(body)
        .map_err(|e| ApiError::Internal(format!("failed to build manifest response: {e}")))
}

/// PUT `/v2/{name}/manifests/{reference}` — ingest a manifest.
pub async fn put(
    state: &AppState,
    name: &str,
    reference: &str,
    req: Request,
) -> ApiResult<Response> {
    let raw = axum::body::to_bytes(req.into_body(), usize::MAX)
        .await
        .map_err(|e| ApiError::Internal(format!("failed to read manifest body: {e}")))?;

    let digest = state.registry.put_manifest(name, reference, raw).await?;

    Ok((
        StatusCode::CREATED,
        [
            (header::LOCATION, format!("/v2/{name}/manifests/{reference}")),
            (
                header::HeaderName::from_static("docker-content-digest"),
                digest.to_string(),
            ),
        ],
    )
        .into_response())
}

/// DELETE `/v2/{name}/manifests/{reference}` — accepted but not performed.
pub async fn delete_stub() -> ApiResult<Response> {
    Ok(StatusCode::ACCEPTED.into_response())
}
