use super::error_response;
use crate::upstream::UpstreamClient;
use axum::{
    body::Bytes,
    extract::Extension,
    http::{header::CONTENT_TYPE, Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, error, instrument};

const MOCK_PREFIX: &str = "/v1/mock";
const API_PREFIX: &str = "/v1/api";

/// Map a mock path onto the backend API path.
fn upstream_path(path: &str) -> String {
    path.strip_prefix(MOCK_PREFIX)
        .map_or_else(|| path.to_string(), |rest| format!("{API_PREFIX}{rest}"))
}

/// Raw query split on `&`, empty tokens dropped, otherwise passed verbatim.
fn query_tokens(query: Option<&str>) -> Vec<String> {
    query
        .map(|q| {
            q.split('&')
                .filter(|token| !token.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// axum handler forwarding a mock endpoint to the backend
#[instrument(skip_all, fields(http.method = %method, http.path = uri.path()))]
pub async fn forward(
    method: Method,
    uri: Uri,
    Extension(upstream): Extension<Arc<UpstreamClient>>,
    body: Bytes,
) -> Response {
    let path = upstream_path(uri.path());
    let tokens = query_tokens(uri.query());

    debug!(
        "Recv request => {}, params: {}, body: {}",
        uri,
        tokens.join("&"),
        String::from_utf8_lossy(&body)
    );

    let body = (!body.is_empty()).then_some(&body[..]);

    match upstream.call(method.as_str(), &path, tokens.as_slice(), body).await {
        Ok(response) => (
            StatusCode::OK,
            [(CONTENT_TYPE, "application/json")],
            response,
        )
            .into_response(),
        Err(e) => {
            error!("{} {} failed: {}", method, path, e);

            error_response(StatusCode::INTERNAL_SERVER_ERROR, &e.to_string())
        }
    }
}
