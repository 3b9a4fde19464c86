//! Tag listing handler.

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

/// Body of `GET /v2/{name}/tags/list`.
#[derive(Debug, Serialize)]
pub struct TagList {
    pub name: String,
    pub tags: Vec<String>,
}

/// GET `/v2/{name}/tags/list`.
pub async fn list(state: &AppState, name: &str) -> ApiResult<Response> {
    let tags = state.registry.list_tags(name).await?;
    Ok(Json(TagList {
        name: name.to_string(),
        tags,
    })
    .into_response())
}
