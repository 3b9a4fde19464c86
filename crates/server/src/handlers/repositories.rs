//! Repository listing handler (extension endpoint).

use crate::error::ApiResult;
use crate::state::AppState;
use axum::Json;
use axum::extract::{Query, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use serde::Deserialize;

const DEFAULT_PAGE_SIZE: u32 = 64;

/// Query parameters of `GET /v2/repositories`.
#[derive(Debug, Deserialize)]
pub struct ListParams {
    #[serde(rename = "continuationToken")]
    pub continuation_token: Option<String>,
    pub n: Option<u32>,
}

/// GET `/v2/repositories?n=&continuationToken=` — paginated repository
/// listing backed by the index. More pages are announced with a
/// `Link: <…>; rel="next"` header carrying the URL-encoded token.
pub async fn list_repositories(
    State(state): State<AppState>,
    Query(params): Query<ListParams>,
) -> ApiResult<Response> {
    let limit = params.n.unwrap_or(DEFAULT_PAGE_SIZE);
    let (repositories, next_token) = state
        .registry
        .list_repositories(params.continuation_token.as_deref(), limit)
        .await?;

    let mut response = Json(repositories).into_response();
    if let Some(token) = next_token {
        let encoded = utf8_percent_encode(&token, NON_ALPHANUMERIC);
        let link = format!("</v2/repositories?continuationToken={encoded}&n={limit}>; rel=\"next\"");
        if let Ok(value) = link.parse() {
            response.headers_mut().insert(header::LINK, value);
        }
    }
    Ok(response)
}
