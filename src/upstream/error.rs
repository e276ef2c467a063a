use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error payload returned by the backend on non-200 responses, and by this
/// service when a mock endpoint fails. Every field is optional on the wire.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct ErrorCodeResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_code: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub server_timestamp: Option<i64>,
}

impl ErrorCodeResponse {
    #[must_use]
    pub fn new(error: impl Into<String>, error_code: u16) -> Self {
        Self {
            error: Some(error.into()),
            error_code: Some(i64::from(error_code)),
            message: None,
            server_timestamp: None,
        }
    }
}

impl fmt::Display for ErrorCodeResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.error.as_deref().unwrap_or_default())?;

        if let Some(message) = self.message.as_deref().filter(|m| !m.is_empty()) {
            write!(f, " (msg:{message})")?;
        }

        if let Some(timestamp) = self.server_timestamp.filter(|ts| *ts != 0) {
            write!(f, " (timestamp:{timestamp})")?;
        }

        write!(f, " (code:{})", self.error_code.unwrap_or_default())
    }
}

/// Nonce source failure.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("nonce length must be greater than zero")]
    ZeroLength,
    #[error("entropy source failed: {0}")]
    Entropy(#[from] rand::Error),
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid parameters: {0}")]
    InvalidArgument(&'static str),
    #[error("can't generate random byte string: {0}")]
    NonceGenerationFailed(String),
    #[error("invalid header value for {0}")]
    InvalidHeader(&'static str),
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("{status}, undecodable error response ({} bytes)", .body.len())]
    UnexpectedStatus { status: StatusCode, body: Vec<u8> },
    #[error("{status}, Error: {error}")]
    Remote {
        status: StatusCode,
        error: ErrorCodeResponse,
    },
    #[error("Bad checksum")]
    SignatureMismatch,
    #[error("no secret for service {0:?}")]
    UnknownService(Option<i64>),
}

impl Error {
    /// Classify a non-200 backend response.
    #[must_use]
    pub fn from_response(status: StatusCode, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorCodeResponse>(body) {
            Ok(error) => Self::Remote { status, error },
            Err(_) => Self::UnexpectedStatus {
                status,
                body: body.to_vec(),
            },
        }
    }
}
