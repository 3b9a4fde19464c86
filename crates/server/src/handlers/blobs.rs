//! Blob read handlers.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::http::{Method, StatusCode, header};
use axum::response::{IntoResponse, Response};

/// GET/HEAD `/v2/{name}/blobs/{digest}` — answer with a presigned
/// redirect. Blob bytes never stream through the registry.
pub async fn redirect(
    state: &AppState,
    name: &str,
    digest: &str,
    method: &Method,
) -> ApiResult<Response> {
    let url = state.registry.get_blob_redirect(name, digest, method).await?;
    Ok((StatusCode::FOUND, [(header::LOCATION, url)]).into_response())
}

/// DELETE `/v2/{name}/blobs/{digest}` — accepted but not performed.
pub async fn delete_stub() -> ApiResult<Response> {
    Ok(StatusCode::ACCEPTED.into_response())
}
