//! Mock of an upstream authentication/2FA service.
//!
//! Inbound `/v1/mock/*` calls are re-issued against the backend as signed
//! `/v1/api/*` requests, and backend callbacks are checked before they are
//! acknowledged.

pub mod authmock;
pub mod cli;
pub mod upstream;
