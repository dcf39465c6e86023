use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;

use celeste_mirror::{AnnouncedUpdate, SyncEngine, SyncReport, Update, UpdateError};
use celeste_mirror_store::SyncHistory;

use crate::signature::{self, AuthError};

/// Header carrying the hex HMAC-SHA256 of the raw request body.
pub const SIGNATURE_HEADER: &str = "X-Celeste-Signature";

/// Behaviour switches for the update endpoint.
#[derive(Debug, Clone)]
pub struct WebhookConfig {
    pub secret: String,
    /// Skip authentication and acknowledge valid bodies without syncing.
    pub test_mode: bool,
    /// Answer 202 right away and run the pass in the background.
    pub respond_async: bool,
}

/// Shared state behind the router.
pub struct WebhookState {
    pub engine: Arc<SyncEngine>,
    pub history: Option<Arc<SyncHistory>>,
    pub config: WebhookConfig,
}

/// A request refused before any synchronization started.
#[derive(Debug, thiserror::Error)]
enum Rejection {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error(transparent)]
    InvalidUrl(UpdateError),
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::Auth(e) => e.status(),
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::InvalidUrl(_) => StatusCode::UNPROCESSABLE_ENTITY,
        };
        (status, self.to_string()).into_response()
    }
}

pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhook/update", post(handle_update))
        .with_state(Arc::new(state))
}

/// Bind `addr` and serve the webhook until the process exits.
pub async fn serve(addr: SocketAddr, state: WebhookState) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "webhook listening");
    axum::serve(listener, router(state)).await
}

async fn handle_update(
    State(state): State<Arc<WebhookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let announced = match accept(&state, &headers, &body) {
        Ok(announced) => announced,
        Err(rejection) => {
            // Never log the payload itself.
            tracing::warn!(reason = %rejection, "rejected update delivery");
            return rejection.into_response();
        }
    };

    if state.config.test_mode {
        tracing::info!(kind = %announced.kind, "test mode: acknowledged update without syncing");
        return (StatusCode::OK, "test mode: update accepted").into_response();
    }

    if state.config.respond_async {
        let kind = announced.kind;
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            run_pass(&state, &announced).await;
        });
        return (StatusCode::ACCEPTED, format!("{kind} synchronization started")).into_response();
    }

    let report = run_pass(&state, &announced).await;
    let status = StatusCode::from_u16(report.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, report.summary()).into_response()
}

/// Authenticate, decode and validate a delivery.
fn accept(
    state: &WebhookState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<AnnouncedUpdate, Rejection> {
    if !state.config.test_mode {
        let header = headers.get(SIGNATURE_HEADER).map(|v| v.as_bytes());
        signature::verify(state.config.secret.as_bytes(), body, header)?;
    }

    let text = std::str::from_utf8(body)
        .map_err(|_| Rejection::BadRequest("body is not valid UTF-8".into()))?;

    let update = Update::decode(text).map_err(|e| Rejection::BadRequest(e.to_string()))?;
    update.resolve().map_err(Rejection::InvalidUrl)
}

async fn run_pass(state: &WebhookState, announced: &AnnouncedUpdate) -> SyncReport {
    let report = state.engine.run_announced(announced).await;

    for feedback in &report.feedback {
        feedback.emit();
    }

    if let Some(history) = &state.history
        && let Err(e) = history.record(&report)
    {
        tracing::error!(error = %e, "failed to record synchronization pass");
    }

    report
}
