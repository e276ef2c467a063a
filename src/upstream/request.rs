use super::{
    checksum::{canonicalize, sign},
    error::Error,
    nonce::{NonceSource, OsNonce, NONCE_LENGTH},
};
use reqwest::{
    header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE},
    Client, Method, StatusCode,
};
use secrecy::{ExposeSecret, SecretString};
use std::{
    fmt,
    sync::Arc,
    time::{SystemTime, UNIX_EPOCH},
};
use tracing::{debug, error, instrument};
use url::Url;

pub const API_CODE_HEADER: HeaderName = HeaderName::from_static("x-api-code");
pub const CHECKSUM_HEADER: HeaderName = HeaderName::from_static("x-checksum");

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

/// Backend address and credentials, resolved once at startup.
pub struct UpstreamConfig {
    base_url: String,
    api_code: HeaderValue,
    api_secret: SecretString,
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("base_url", &self.base_url)
            .field("api_code", &self.api_code)
            .field("api_secret", &self.api_secret)
            .finish()
    }
}

impl UpstreamConfig {
    /// # Errors
    /// Returns an error if the base URL does not parse or the API code is not
    /// a valid header value.
    pub fn new(base_url: &str, api_code: &str, api_secret: SecretString) -> Result<Self, Error> {
        Url::parse(base_url).map_err(|_| Error::InvalidArgument("api server url"))?;

        let api_code =
            HeaderValue::from_str(api_code).map_err(|_| Error::InvalidHeader("X-API-CODE"))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_code,
            api_secret,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[must_use]
    pub const fn api_secret(&self) -> &SecretString {
        &self.api_secret
    }
}

/// A fully addressed request with its checksum, ready for dispatch.
#[derive(Debug, Clone)]
pub struct SignedRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
    pub timestamp: i64,
    pub nonce: String,
}

impl SignedRequest {
    #[must_use]
    pub fn checksum(&self) -> Option<&str> {
        self.headers
            .get(CHECKSUM_HEADER)
            .and_then(|value| value.to_str().ok())
    }
}

/// Signs requests for the backend and dispatches them.
#[derive(Clone)]
pub struct UpstreamClient {
    config: Arc<UpstreamConfig>,
    nonce: Arc<dyn NonceSource>,
    http: Client,
}

impl fmt::Debug for UpstreamClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl UpstreamClient {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: Arc<UpstreamConfig>) -> Result<Self, Error> {
        let http = Client::builder().user_agent(APP_USER_AGENT).build()?;

        Ok(Self {
            config,
            nonce: Arc::new(OsNonce),
            http,
        })
    }

    #[must_use]
    pub fn with_nonce_source(mut self, nonce: Arc<dyn NonceSource>) -> Self {
        self.nonce = nonce;
        self
    }

    /// Build a signed request stamped with the current time and a fresh nonce.
    ///
    /// # Errors
    /// `InvalidArgument` for an empty or malformed method or an empty path,
    /// `NonceGenerationFailed` when no nonce could be drawn.
    pub fn build_request<T: AsRef<str>>(
        &self,
        method: &str,
        path: &str,
        tokens: &[T],
        body: Option<&[u8]>,
    ) -> Result<SignedRequest, Error> {
        self.build_request_at(unix_now(), method, path, tokens, body)
    }

    pub(crate) fn build_request_at<T: AsRef<str>>(
        &self,
        timestamp: i64,
        method: &str,
        path: &str,
        tokens: &[T],
        body: Option<&[u8]>,
    ) -> Result<SignedRequest, Error> {
        if method.is_empty() || path.is_empty() {
            return Err(Error::InvalidArgument("method and path are required"));
        }

        let method =
            Method::from_bytes(method.as_bytes()).map_err(|_| Error::InvalidArgument("method"))?;

        let nonce = self
            .nonce
            .generate(NONCE_LENGTH)
            .map_err(|e| Error::NonceGenerationFailed(e.to_string()))?;
        if nonce.is_empty() {
            return Err(Error::NonceGenerationFailed("empty nonce".to_string()));
        }

        let mut url = format!(
            "{}{path}?t={timestamp}&r={nonce}",
            self.config.base_url()
        );
        if !tokens.is_empty() {
            let joined: Vec<&str> = tokens.iter().map(|t| t.as_ref()).collect();
            url.push('&');
            url.push_str(&joined.join("&"));
        }

        let checksum = sign(&canonicalize(
            tokens,
            body,
            self.config.api_secret().expose_secret(),
            timestamp,
            &nonce,
        ));

        let mut headers = HeaderMap::new();
        headers.insert(API_CODE_HEADER, self.config.api_code.clone());
        headers.insert(
            CHECKSUM_HEADER,
            HeaderValue::from_str(&checksum).map_err(|_| Error::InvalidHeader("X-CHECKSUM"))?,
        );
        if body.is_some() {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        debug!("Request URL: {}", url);
        debug!("X-CHECKSUM: {}", checksum);

        Ok(SignedRequest {
            method,
            url,
            headers,
            body: body.map(<[u8]>::to_vec),
            timestamp,
            nonce,
        })
    }

    /// Dispatch a signed request and return the raw response body.
    ///
    /// # Errors
    /// `Transport` on connection failures, `Remote` or `UnexpectedStatus` on
    /// any status other than 200.
    #[instrument(skip_all, fields(method = %request.method, url = %request.url))]
    pub async fn send(&self, request: SignedRequest) -> Result<Vec<u8>, Error> {
        let mut builder = self
            .http
            .request(request.method, &request.url)
            .headers(request.headers);

        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if status != StatusCode::OK {
            let err = Error::from_response(status, &body);
            error!("upstream request failed: {}", err);
            return Err(err);
        }

        Ok(body.to_vec())
    }

    /// Sign and dispatch in one step.
    ///
    /// # Errors
    /// See [`UpstreamClient::build_request`] and [`UpstreamClient::send`].
    pub async fn call<T: AsRef<str>>(
        &self,
        method: &str,
        path: &str,
        tokens: &[T],
        body: Option<&[u8]>,
    ) -> Result<Vec<u8>, Error> {
        let request = self.build_request(method, path, tokens, body)?;
        self.send(request).await
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| i64::try_from(d.as_secs()).unwrap_or(i64::MAX))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upstream::error::GenerationError;

    struct FixedNonce(&'static str);

    impl NonceSource for FixedNonce {
        fn generate(&self, _length: usize) -> Result<String, GenerationError> {
            Ok(self.0.to_string())
        }
    }

    struct BrokenNonce;

    impl NonceSource for BrokenNonce {
        fn generate(&self, _length: usize) -> Result<String, GenerationError> {
            OsNonce.generate(0)
        }
    }

    fn client(nonce: Arc<dyn NonceSource>) -> UpstreamClient {
        let config = UpstreamConfig::new(
            "http://backend.test:8889",
            "mock-code",
            SecretString::from("s3cr3t".to_string()),
        )
        .unwrap();
        UpstreamClient::new(Arc::new(config))
            .unwrap()
            .with_nonce_source(nonce)
    }

    #[test]
    fn builds_url_headers_and_checksum() {
        let client = client(Arc::new(FixedNonce("abcd1234")));
        let request = client
            .build_request_at(
                1_700_000_000,
                "GET",
                "/v1/api/users/me",
                &["service_id=3", "account=foo"],
                None,
            )
            .unwrap();

        assert_eq!(request.method, Method::GET);
        assert_eq!(
            request.url,
            "http://backend.test:8889/v1/api/users/me?t=1700000000&r=abcd1234&service_id=3&account=foo"
        );
        assert_eq!(
            request.headers.get(API_CODE_HEADER).and_then(|v| v.to_str().ok()),
            Some("mock-code")
        );
        assert_eq!(
            request.checksum(),
            Some("6de91b7a0565b9e0448187d97e4c3417b2c5dcf30cea5191385e8911b90013e2")
        );
        assert!(request.headers.get(CONTENT_TYPE).is_none());
        assert!(request.body.is_none());
    }

    #[test]
    fn body_sets_content_type_and_joins_checksum() {
        let client = client(Arc::new(FixedNonce("abcd1234")));
        let body = br#"{"account":"foo"}"#;
        let request = client
            .build_request_at(1_700_000_000, "POST", "/v1/api/users", &["service_id=3"], Some(body.as_slice()))
            .unwrap();

        assert_eq!(
            request.headers.get(CONTENT_TYPE).and_then(|v| v.to_str().ok()),
            Some("application/json")
        );
        assert_eq!(request.body.as_deref(), Some(&body[..]));
        assert_eq!(
            request.checksum(),
            Some("e45b595ffd85e976bb2156ef1375893eacb6ec6f65a5b75e514cb058a1eb6eb8")
        );
    }

    #[test]
    fn no_tokens_means_no_trailing_separator() {
        let client = client(Arc::new(FixedNonce("n0nce")));
        let request = client
            .build_request_at(42, "DELETE", "/v1/api/users/2fa/tok", &[] as &[&str], None)
            .unwrap();
        assert_eq!(
            request.url,
            "http://backend.test:8889/v1/api/users/2fa/tok?t=42&r=n0nce"
        );
    }

    #[test]
    fn checksum_recomputes_from_request_parts() {
        let client = client(Arc::new(OsNonce));
        let tokens = ["account=bar", "service_id=12"];
        let body = b"{\"devices\":[\"a\"]}";
        let request = client
            .build_request("DELETE", "/v1/api/devices", &tokens, Some(body.as_slice()))
            .unwrap();

        assert_eq!(request.nonce.len(), NONCE_LENGTH);
        let expected = sign(&canonicalize(
            &tokens,
            request.body.as_deref(),
            "s3cr3t",
            request.timestamp,
            &request.nonce,
        ));
        assert_eq!(request.checksum(), Some(expected.as_str()));
    }

    #[test]
    fn fresh_nonce_per_request() {
        let client = client(Arc::new(OsNonce));
        let a = client
            .build_request("GET", "/v1/api/devices", &["a=1"], None)
            .unwrap();
        let b = client
            .build_request("GET", "/v1/api/devices", &["a=1"], None)
            .unwrap();
        assert_ne!(a.nonce, b.nonce);
        assert_ne!(a.checksum(), b.checksum());
    }

    #[test]
    fn empty_method_or_path_is_invalid() {
        let client = client(Arc::new(OsNonce));
        assert!(matches!(
            client.build_request("", "/v1/api/users", &["a=1"], None),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            client.build_request("GET", "", &["a=1"], None),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            client.build_request("NOT A METHOD", "/x", &["a=1"], None),
            Err(Error::InvalidArgument(_))
        ));
    }

    #[test]
    fn empty_nonce_fails() {
        let client = client(Arc::new(FixedNonce("")));
        assert!(matches!(
            client.build_request("GET", "/v1/api/users/me", &["a=1"], None),
            Err(Error::NonceGenerationFailed(_))
        ));
    }

    #[test]
    fn nonce_source_error_fails() {
        let client = client(Arc::new(BrokenNonce));
        assert!(matches!(
            client.build_request("GET", "/v1/api/users/me", &["a=1"], None),
            Err(Error::NonceGenerationFailed(_))
        ));
    }

    #[test]
    fn config_rejects_bad_values() {
        let secret = || SecretString::from("s".to_string());
        assert!(matches!(
            UpstreamConfig::new("not a url", "code", secret()),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            UpstreamConfig::new("http://backend.test", "bad\ncode", secret()),
            Err(Error::InvalidHeader(_))
        ));
    }

    #[test]
    fn config_debug_redacts_secret() {
        let config = UpstreamConfig::new(
            "http://backend.test/",
            "code",
            SecretString::from("top-secret".to_string()),
        )
        .unwrap();
        assert_eq!(config.base_url(), "http://backend.test");
        assert!(!format!("{config:?}").contains("top-secret"));
    }
}
