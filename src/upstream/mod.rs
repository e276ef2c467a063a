//! Signed traffic with the upstream authentication backend.
//!
//! Outbound calls carry `X-API-CODE` and a hex `X-CHECKSUM` over the sorted
//! query tokens, body, timestamp and nonce. Callbacks from the backend carry a
//! base64 `X-CHECKSUM` over `body || secret`.

pub mod callback;
pub mod checksum;
pub mod error;
pub mod nonce;
pub mod request;

pub use self::callback::{CallbackVerifier, SecretLookup, StaticSecret};
pub use self::checksum::{callback_checksum, canonicalize, sign, verify_callback, Verdict};
pub use self::error::{Error, ErrorCodeResponse, GenerationError};
pub use self::nonce::{NonceSource, OsNonce, NONCE_LENGTH};
pub use self::request::{
    SignedRequest, UpstreamClient, UpstreamConfig, API_CODE_HEADER, CHECKSUM_HEADER,
};
