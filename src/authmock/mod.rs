use crate::{
    authmock::handlers::{callback, forward, health},
    upstream::{CallbackVerifier, UpstreamClient},
};
use anyhow::Result;
use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderName, HeaderValue, Request},
    routing::{delete, get, post},
    Extension, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, info_span, Span};
use ulid::Ulid;

pub mod handlers;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

/// Build the mock router: forwarded `/v1/mock/*` endpoints, the backend
/// callback and `/health`.
pub fn router(upstream: Arc<UpstreamClient>, verifier: Arc<CallbackVerifier>) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/v1/mock/users", post(forward::forward))
        .route(
            "/v1/mock/devices",
            post(forward::forward)
                .get(forward::forward)
                .delete(forward::forward),
        )
        .route("/v1/mock/users/pin", post(forward::forward))
        .route("/v1/mock/devices/2fa", post(forward::forward))
        .route("/v1/mock/users/2fa", get(forward::forward))
        .route("/v1/mock/users/2fa/:token", delete(forward::forward))
        .route("/v1/mock/users/me", get(forward::forward))
        .route("/v1/mock/order/status", post(forward::forward))
        .route("/v1/mock/users/totpverify", get(forward::forward))
        .route("/v1/mock/users/emailotp", post(forward::forward))
        .route("/v1/mock/users/emailotp/verify", get(forward::forward))
        .route("/v1/mock/callback", post(callback::callback))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestHeaderLayer::if_not_present(
                    HeaderName::from_static("x-request-id"),
                    |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
                ))
                .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                    "x-request-id",
                )))
                .layer(TraceLayer::new_for_http().make_span_with(make_span))
                .layer(Extension(upstream))
                .layer(Extension(verifier)),
        )
}

/// Start the server
/// # Errors
/// Return error if failed to start the server
pub async fn new(
    port: u16,
    upstream: Arc<UpstreamClient>,
    verifier: Arc<CallbackVerifier>,
) -> Result<()> {
    let app = router(upstream, verifier);

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Gracefully shutdown"),
        Err(e) => {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn make_span(request: &Request<Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|val| val.to_str().ok())
        .unwrap_or("none");
    let matched_path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path(), MatchedPath::as_str);

    info_span!(
        "http.request",
        http.method = %request.method(),
        http.route = matched_path,
        request_id
    )
}
