//! Admission webhook server.
//!
//! Provides HTTP endpoints for the Pod mutating admission webhook:
//! - `POST /mutate` - runs the admission pipeline on an AdmissionReview
//! - any other path - liveness echo (`ping "<path>"`)
//!
//! Every request runs under a deadline (`--request-timeout-secs`). A request
//! that is still being read or handled when it expires is answered with 408.
//!
//! To enable TLS, mount the certificate secret at /etc/webhook/certs/ (or
//! point `--tls-cert` / `--tls-key` elsewhere). Without certificates the
//! server falls back to plain HTTP, which is only useful behind a
//! TLS-terminating proxy or for local testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    Json, Router,
    body::Bytes,
    extract::{ConnectInfo, Request, State},
    http::{StatusCode, Uri, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::post,
};
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::admission::AdmissionMutator;
use crate::config::WebhookConfig;
use crate::error::AdmissionError;
use crate::health::HealthState;

/// Shared state for webhook handlers
pub struct WebhookState {
    pub mutator: AdmissionMutator,
    pub health: Option<Arc<HealthState>>,
    pub request_timeout: Duration,
}

impl WebhookState {
    pub fn new(
        mutator: AdmissionMutator,
        health: Option<Arc<HealthState>>,
        request_timeout: Duration,
    ) -> Self {
        Self {
            mutator,
            health,
            request_timeout,
        }
    }
}

/// Metrics outcome for requests cut off by the deadline
const OUTCOME_TIMEOUT: &str = "timeout";

impl IntoResponse for AdmissionError {
    fn into_response(self) -> Response {
        let status = if self.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };

        (
            status,
            Json(serde_json::json!({
                "error": self.classification(),
                "message": self.to_string(),
            })),
        )
            .into_response()
    }
}

/// Create the webhook router
pub fn create_webhook_router(state: Arc<WebhookState>) -> Router {
    Router::new()
        .route("/mutate", post(mutate_pod))
        .fallback(root)
        .layer(middleware::from_fn_with_state(state.clone(), enforce_deadline))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}

/// Log every inbound request
async fn log_request(request: Request, next: Next) -> Response {
    let remote = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    info!(
        method = %request.method(),
        path = %request.uri().path(),
        remote = %remote,
        "Handling request"
    );

    next.run(request).await
}

/// Answer with 408 once the request outlives its deadline
async fn enforce_deadline(
    State(state): State<Arc<WebhookState>>,
    request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    match tokio::time::timeout(state.request_timeout, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            let timeout_secs = state.request_timeout.as_secs_f64();
            warn!(path = %path, timeout_secs, "Request deadline exceeded");
            if let Some(health) = &state.health {
                health.metrics.record_error(OUTCOME_TIMEOUT, timeout_secs);
            }

            (
                StatusCode::REQUEST_TIMEOUT,
                Json(serde_json::json!({
                    "error": OUTCOME_TIMEOUT,
                    "message": format!("request not completed within {timeout_secs}s"),
                })),
            )
                .into_response()
        }
    }
}

/// Liveness echo for any unrouted path
async fn root(uri: Uri) -> impl IntoResponse {
    debug!("Inside root handler");
    let decoded = urlencoding::decode_binary(uri.path().as_bytes());
    let path = String::from_utf8_lossy(&decoded);
    (StatusCode::OK, format!("ping {:?}", escape_html(&path)))
}

/// Pod mutating admission webhook handler
async fn mutate_pod(State(state): State<Arc<WebhookState>>, body: Bytes) -> Response {
    let started = Instant::now();
    debug!(body = %String::from_utf8_lossy(&body), "Received admission review");

    let result = state.mutator.mutate(&body);
    let elapsed = started.elapsed().as_secs_f64();

    match result {
        Ok(mutated) => {
            info!(
                uid = %mutated.uid,
                operation = ?mutated.operation,
                name = ?mutated.name,
                namespace = ?mutated.namespace,
                dry_run = mutated.dry_run,
                patch_operations = mutated.patch_operations,
                "Admission request allowed"
            );
            debug!(body = %String::from_utf8_lossy(&mutated.body), "Sending admission review");
            if let Some(health) = &state.health {
                health
                    .metrics
                    .record_admission(mutated.patch_operations, elapsed);
            }

            (
                StatusCode::OK,
                [(header::CONTENT_TYPE, "application/json")],
                mutated.body,
            )
                .into_response()
        }
        Err(e) => {
            if e.is_client_error() {
                warn!(error = %e, "Rejected malformed admission review");
            } else {
                error!(error = %e, "Admission pipeline failed");
            }
            if let Some(health) = &state.health {
                health.metrics.record_error(e.classification(), elapsed);
            }

            e.into_response()
        }
    }
}

/// Escape the HTML-significant characters of `input`
fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&#34;"),
            '\'' => escaped.push_str("&#39;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

/// Errors that can occur when running the webhook server
#[derive(Error, Debug)]
pub enum WebhookError {
    /// TLS configuration error
    #[error("TLS configuration error: {0}")]
    TlsConfig(String),

    /// Listener could not be bound
    #[error("Failed to bind webhook listener: {0}")]
    Bind(#[source] std::io::Error),

    /// Server error
    #[error("Webhook server error: {0}")]
    Server(#[source] std::io::Error),
}

/// Run the webhook server
///
/// Binds to `0.0.0.0:<config.port>` and serves the /mutate endpoint, with TLS
/// when both certificate files exist. The health state, if given, is marked
/// ready once the listener is set up.
pub async fn run_webhook_server(
    config: &WebhookConfig,
    health: Option<Arc<HealthState>>,
) -> Result<(), WebhookError> {
    use axum_server::tls_rustls::RustlsConfig;

    let state = Arc::new(WebhookState::new(
        config.mutator(),
        health.clone(),
        config.request_timeout(),
    ));
    let app = create_webhook_router(state).into_make_service_with_connect_info::<SocketAddr>();
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));

    if config.tls_available() {
        let tls = RustlsConfig::from_pem_file(&config.tls_cert, &config.tls_key)
            .await
            .map_err(|e| WebhookError::TlsConfig(e.to_string()))?;

        info!(port = config.port, "Webhook server listening with TLS");
        if let Some(health) = &health {
            health.set_ready(true).await;
        }

        axum_server::bind_rustls(addr, tls)
            .serve(app)
            .await
            .map_err(WebhookError::Server)?;
    } else {
        warn!(
            cert = %config.tls_cert,
            key = %config.tls_key,
            "TLS certificates not found, serving plain HTTP"
        );
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(WebhookError::Bind)?;

        info!(port = config.port, "Webhook server listening");
        if let Some(health) = &health {
            health.set_ready(true).await;
        }

        axum::serve(listener, app)
            .await
            .map_err(WebhookError::Server)?;
    }

    Ok(())
}
