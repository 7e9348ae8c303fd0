// ABOUTME: HTTP surface of the trigger gateway.
// ABOUTME: Verifies push notifications, hands revisions to the dispatcher, reports status.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use super::dispatcher::{DispatchStatus, Dispatcher, DispatcherStatus};
use super::event::PushEvent;
use super::signature::verify_signature;

const SIGNATURE_HEADERS: [&str; 2] = ["x-hub-signature-256", "x-gitea-signature"];
const EVENT_HEADERS: [&str; 3] = ["x-github-event", "x-gitea-event", "x-gogs-event"];

#[derive(Clone)]
pub struct GatewayState {
    dispatcher: Dispatcher,
    secret: Arc<[u8]>,
    branch: Arc<str>,
}

impl GatewayState {
    pub fn new(dispatcher: Dispatcher, secret: impl AsRef<[u8]>, branch: &str) -> Self {
        Self {
            dispatcher,
            secret: Arc::from(secret.as_ref()),
            branch: Arc::from(branch),
        }
    }
}

/// Router with the push endpoint at `hook_path` plus `/health` and `/status`.
pub fn gateway_router(state: GatewayState, hook_path: &str) -> Router {
    Router::new()
        .route(hook_path, post(receive_push))
        .route("/health", get(health))
        .route("/status", get(status))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn header<'a>(headers: &'a HeaderMap, names: &[&str]) -> Option<&'a str> {
    names
        .iter()
        .find_map(|name| headers.get(*name))
        .and_then(|value| value.to_str().ok())
}

async fn receive_push(
    State(state): State<GatewayState>,
    headers: HeaderMap,
    body: Bytes,
) -> (StatusCode, String) {
    let Some(signature) = header(&headers, &SIGNATURE_HEADERS) else {
        tracing::warn!("push without signature rejected");
        return (StatusCode::UNAUTHORIZED, "missing signature".to_string());
    };
    if !verify_signature(&state.secret, &body, signature) {
        tracing::warn!("push with bad signature rejected");
        return (StatusCode::UNAUTHORIZED, "bad signature".to_string());
    }

    if header(&headers, &EVENT_HEADERS) == Some("ping") {
        return (StatusCode::OK, "pong".to_string());
    }

    let revision = match PushEvent::parse(&body, &state.branch) {
        Ok(PushEvent::Deploy { revision, .. }) => revision,
        Ok(PushEvent::Ignored { reason }) => {
            tracing::info!(%reason, "push ignored");
            return (StatusCode::OK, "ignored".to_string());
        }
        Err(e) => {
            tracing::warn!(error = %e, "push rejected");
            return (StatusCode::BAD_REQUEST, e.to_string());
        }
    };

    match state.dispatcher.dispatch(revision) {
        DispatchStatus::Started(_) => (StatusCode::ACCEPTED, "accepted".to_string()),
        DispatchStatus::Queued => (StatusCode::ACCEPTED, "queued".to_string()),
    }
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(state): State<GatewayState>) -> Json<DispatcherStatus> {
    Json(state.dispatcher.status())
}

/// Serve until ctrl-c, then wait for the run in flight to finish.
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: GatewayState,
    hook_path: &str,
) -> std::io::Result<()> {
    let dispatcher = state.dispatcher.clone();
    let app = gateway_router(state, hook_path);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown requested");
        })
        .await?;

    tracing::info!("waiting for in-flight run");
    dispatcher.wait_idle().await;
    Ok(())
}
