use super::error_response;
use crate::upstream::{CallbackVerifier, Error, CHECKSUM_HEADER};
use axum::{
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::{debug, instrument, warn};

// axum handler for backend callbacks
#[instrument(skip_all)]
pub async fn callback(
    headers: HeaderMap,
    Extension(verifier): Extension<Arc<CallbackVerifier>>,
    body: Bytes,
) -> Response {
    let supplied = headers
        .get(CHECKSUM_HEADER)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    match verifier.verify(&body, supplied) {
        Ok(()) => {}
        Err(e @ Error::UnknownService(_)) => {
            return error_response(StatusCode::NOT_FOUND, &e.to_string());
        }
        Err(e) if verifier.rejects_on_mismatch() => {
            return error_response(StatusCode::BAD_REQUEST, &e.to_string());
        }
        Err(_) => {
            warn!("acknowledging callback with bad checksum");
        }
    }

    debug!("Callback => {}", String::from_utf8_lossy(&body));

    "OK".into_response()
}
