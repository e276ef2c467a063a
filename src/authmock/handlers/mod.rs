pub mod callback;
pub use self::callback::callback;

pub mod forward;
pub use self::forward::forward;

pub mod health;
pub use self::health::health;

// common functions for the handlers
use crate::upstream::ErrorCodeResponse;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};

/// JSON error body in the same shape the backend uses.
pub fn error_response(status: StatusCode, error: &str) -> Response {
    (
        status,
        Json(ErrorCodeResponse::new(error, status.as_u16())),
    )
        .into_response()
}
