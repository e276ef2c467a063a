use super::{
    checksum::{verify_callback, Verdict},
    error::Error,
};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::{fmt, sync::Arc};
use tracing::{debug, error, instrument};

/// Resolves the shared secret for the backend service that sent a callback.
pub trait SecretLookup: Send + Sync {
    fn secret_for(&self, service_id: Option<i64>) -> Option<SecretString>;
}

impl<F> SecretLookup for F
where
    F: Fn(Option<i64>) -> Option<SecretString> + Send + Sync,
{
    fn secret_for(&self, service_id: Option<i64>) -> Option<SecretString> {
        self(service_id)
    }
}

/// One secret for every service.
pub struct StaticSecret(SecretString);

impl StaticSecret {
    #[must_use]
    pub const fn new(secret: SecretString) -> Self {
        Self(secret)
    }
}

impl SecretLookup for StaticSecret {
    fn secret_for(&self, _service_id: Option<i64>) -> Option<SecretString> {
        Some(SecretString::from(self.0.expose_secret().to_owned()))
    }
}

#[derive(Deserialize)]
struct ServiceRef {
    service_id: Option<i64>,
}

/// Peek at the top level `service_id` of a callback payload, nothing else.
fn service_id(payload: &[u8]) -> Option<i64> {
    serde_json::from_slice::<ServiceRef>(payload)
        .ok()
        .and_then(|r| r.service_id)
}

/// Checks the `X-CHECKSUM` of inbound callbacks before their payload is used.
#[derive(Clone)]
pub struct CallbackVerifier {
    secrets: Arc<dyn SecretLookup>,
    reject_on_mismatch: bool,
}

impl fmt::Debug for CallbackVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackVerifier")
            .field("reject_on_mismatch", &self.reject_on_mismatch)
            .finish_non_exhaustive()
    }
}

impl CallbackVerifier {
    #[must_use]
    pub fn new(secrets: Arc<dyn SecretLookup>) -> Self {
        Self {
            secrets,
            reject_on_mismatch: true,
        }
    }

    /// Acknowledge callbacks with a bad checksum instead of rejecting them.
    #[must_use]
    pub fn fail_open(mut self, fail_open: bool) -> Self {
        self.reject_on_mismatch = !fail_open;
        self
    }

    #[must_use]
    pub const fn rejects_on_mismatch(&self) -> bool {
        self.reject_on_mismatch
    }

    /// Compare `supplied` against the checksum of `payload`.
    ///
    /// # Errors
    /// `UnknownService` when no secret resolves, `SignatureMismatch` when the
    /// checksum differs.
    #[instrument(skip_all, fields(payload_len = payload.len()))]
    pub fn verify(&self, payload: &[u8], supplied: &str) -> Result<(), Error> {
        let service_id = service_id(payload);

        let Some(secret) = self.secrets.secret_for(service_id) else {
            error!("no callback secret for service {:?}", service_id);
            return Err(Error::UnknownService(service_id));
        };

        match verify_callback(payload, supplied, secret.expose_secret()) {
            Verdict::Accept => {
                debug!("callback checksum ok for service {:?}", service_id);
                Ok(())
            }
            Verdict::Reject => {
                error!("callback checksum mismatch");
                Err(Error::SignatureMismatch)
            }
        }
    }
}
