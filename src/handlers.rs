//! HTTP surface: the webhook endpoint plus a couple of plumbing routes.

use axum::{
    Json, Router,
    body::Bytes,
    extract::Path,
    extract::State as AxumState,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    routing,
};
use serde_json::json;
use tracing::{error, info};

use crate::SharedState;
use crate::pipeline::PipelineTask;
use crate::signature::verify_signature;
use crate::webhook::PushPayload;

/// Builds the application router.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/", routing::get(root))
        .route("/status", routing::get(status))
        .route("/hooks/jekyll/{branch}", routing::post(handle_hook))
        // The original server answered 404 for wrong-method requests too.
        .method_not_allowed_fallback(not_found)
        .with_state(state)
}

async fn not_found() -> StatusCode {
    StatusCode::NOT_FOUND
}

pub async fn root() -> &'static str {
    "jekyll-hook"
}

/// Returns the current server status
pub async fn status(AxumState(state): AxumState<SharedState>) -> impl IntoResponse {
    Json(json!({
        "server": {
            "name": "jekyll-hook",
            "version": env!("CARGO_PKG_VERSION"),
            "started_at": state.started_at,
            "uptime_seconds": state.start_time.elapsed().as_secs(),
        },
        "queue": {
            "pending": state.scheduler.pending(),
        }
    }))
}

/// Handles `POST /hooks/jekyll/{branch}`.
///
/// The signature check runs on the raw body bytes before anything interprets
/// them as JSON. The response is decided here and sent immediately; pipeline
/// work happens later on the queue, and its outcome is never reflected back
/// to this request.
pub async fn handle_hook(
    AxumState(state): AxumState<SharedState>,
    Path(branch): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> StatusCode {
    let signature = headers
        .get("X-Hub-Signature")
        .and_then(|v| v.to_str().ok());
    if verify_signature(state.config.secret.as_deref(), &body, signature).is_err() {
        return StatusCode::FORBIDDEN;
    }

    let gh_event = headers.get("X-GitHub-Event").and_then(|v| v.to_str().ok());
    match gh_event {
        Some("ping") => {
            info!("Received ping.");
            StatusCode::OK
        }
        Some("push") => {
            let payload: PushPayload = match serde_json::from_slice(&body) {
                Ok(payload) => payload,
                Err(e) => {
                    info!("Could not parse JSON body: {}", e);
                    return StatusCode::BAD_REQUEST;
                }
            };

            let task = PipelineTask::new(payload, branch);
            let task_id = task.id;
            let route_branch = task.route_branch.clone();
            if !state.scheduler.enqueue(task) {
                error!("Failed to enqueue push event");
                return StatusCode::INTERNAL_SERVER_ERROR;
            }
            info!("Queued task {} for branch '{}'", task_id, route_branch);
            StatusCode::ACCEPTED
        }
        other => {
            info!("Received unsupported event: {:?}", other);
            StatusCode::BAD_REQUEST
        }
    }
}
