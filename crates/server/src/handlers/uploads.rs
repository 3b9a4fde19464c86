//! Upload endpoint handlers.

use crate::error::{ApiError, ApiResult};
use crate::handlers::query_param;
use crate::state::AppState;
use axum::extract::Request;
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use futures::TryStreamExt;
use reg_core::UploadId;

/// Parse a `Content-Range: bytes=<start>-<end-inclusive>` header into
/// `(start, end-exclusive)`.
///
/// A missing or unparseable range means the whole body at offset 0. An
/// inverted range is a client error.
fn parse_content_range(value: Option<&str>) -> ApiResult<(i64, i64)> {
    let Some(value) = value else {
        return Ok((0, i64::MAX));
    };
    let Some(range) = value.strip_prefix("bytes=") else {
        return Ok((0, i64::MAX));
    };
    let Some((start, end)) = range.split_once('-') else {
        return Ok((0, i64::MAX));
    };
    let (Ok(start), Ok(end)) = (start.trim().parse::<i64>(), end.trim().parse::<i64>()) else {
        return Ok((0, i64::MAX));
    };
    if start < 0 || end < start {
        return Err(ApiError::BadRange(format!("invalid content range {value:?}")));
    }
    // The header's end is inclusive; internally the bound is exclusive.
    Ok((start, end + 1))
}

fn parse_upload_reference(reference: &str) -> ApiResult<UploadId> {
    UploadId::parse(reference).map_err(|_| ApiError::SessionMissing(reference.to_string()))
}

fn body_stream(req: Request) -> crate::uploads::ChunkStream {
    Box::pin(
        req.into_body()
            .into_data_stream()
            .map_err(std::io::Error::other),
    )
}

fn has_body(req: &Request) -> bool {
    req.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| !v.is_empty() && v != "0")
}

/// POST `/v2/{name}/blobs/uploads/` — start an upload session.
///
/// With `?digest=` and a body, this is the single-shot upload: start,
/// ingest the body as the only chunk, complete, and point the client at
/// the blob's canonical URL. With `?mount=&from=`, cross-repo mount
/// (stub).
pub async fn start(
    state: &AppState,
    name: &str,
    query: Option<&str>,
    req: Request,
) -> ApiResult<Response> {
    if let Some(mount) = query_param(query, "mount") {
        if query_param(query, "from").is_some() {
            return Ok((
                StatusCode::CREATED,
                [(header::LOCATION, format!("/v2/{name}/blobs/{mount}"))],
            )
                .into_response());
        }
    }

    let upload_id = UploadId::new();
    state.registry.start_upload(name, upload_id).await?;

    if let Some(digest) = query_param(query, "digest") {
        if has_body(&req) {
            state
                .registry
                .upload_chunk(upload_id, 0, body_stream(req))
                .await?;
            let digest = state.registry.complete_upload(upload_id, &digest).await?;
            return Ok((
                StatusCode::CREATED,
                [(header::LOCATION, format!("/v2/{name}/blobs/{digest}"))],
            )
                .into_response());
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        [(
            header::LOCATION,
            format!("v2/{name}/blobs/uploads/{upload_id}"),
        )],
    )
        .into_response())
}

/// PATCH/PUT `/v2/{name}/blobs/uploads/{reference}` — ingest a chunk.
pub async fn chunk(
    state: &AppState,
    name: &str,
    reference: &str,
    req: Request,
) -> ApiResult<Response> {
    let upload_id = parse_upload_reference(reference)?;
    let range = req
        .headers()
        .get(header::CONTENT_RANGE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.to_string());
    let (start, end) = parse_content_range(range.as_deref())?;
    tracing::debug!(reference, ?range, start, end, "ingesting chunk");

    let accepted = state
        .registry
        .upload_chunk(upload_id, start, body_stream(req))
        .await?;

    let mut response = Response::builder()
        .status(StatusCode::ACCEPTED)
        .header(
            header::LOCATION,
            format!("/v2/{name}/blobs/uploads/{reference}"),
        );
    if start + accepted > 0 {
        response = response.header(header::RANGE, format!("bytes=0-{}", start + accepted - 1));
    }
    response
        .body(axum::body::Body::empty())
        .map_err(|e| ApiError::Internal(format!("failed to build chunk response: {e}")))
}

/// PUT/PATCH `/v2/{name}/blobs/uploads/{reference}?digest=…` — finalize.
pub async fn complete(
    state: &AppState,
    name: &str,
    reference: &str,
    digest: &str,
) -> ApiResult<Response> {
    let upload_id = parse_upload_reference(reference)?;
    let digest = state.registry.complete_upload(upload_id, digest).await?;

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/v2/{name}/blobs/{digest}"))],
    )
        .into_response())
}

/// GET `/v2/{name}/blobs/uploads/{reference}` — upload status.
pub async fn status(state: &AppState, name: &str, reference: &str) -> ApiResult<Response> {
    let upload_id = parse_upload_reference(reference)?;
    let session = state.registry.get_upload(upload_id).await?;

    let mut response = Response::builder()
        .status(StatusCode::NO_CONTENT)
        .header(
            header::LOCATION,
            format!("/v2/{name}/blobs/uploads/{reference}"),
        );
    if session.uploaded_size > 0 {
        response = response.header(
            header::RANGE,
            format!("bytes=0-{}", session.uploaded_size - 1),
        );
    }
    response
        .body(axum::body::Body::empty())
        .map_err(|e| ApiError::Internal(format!("failed to build status response: {e}")))
}

/// DELETE `/v2/{name}/blobs/uploads/{reference}` — cancel an upload.
pub async fn cancel(state: &AppState, reference: &str) -> ApiResult<Response> {
    let upload_id = parse_upload_reference(reference)?;
    state.registry.abort_upload(upload_id).await?;
    Ok(StatusCode::NO_CONTENT.into_response())
}
