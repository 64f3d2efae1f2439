//! Router and request handlers for the HTTP trigger.

use std::sync::Arc;

use axum::Router;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use serde::Deserialize;
use tracing::{error, info};

use qnasync_core::Pipeline;

/// Usage text returned when the request body carries no usable id/title.
pub const USAGE: &str = "This HTTP triggered function executed successfully. \
Pass a content id and title in the request body.";

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// The migration pipeline, shared across requests.
    pub pipeline: Arc<Pipeline>,
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/content", post(migrate_content))
        .route("/healthz", get(healthz))
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct ContentRequest {
    id: Option<String>,
    title: Option<String>,
}

/// Migrate a single page and submit it to the knowledge base.
///
/// A body without both `id` and `title` — including a non-JSON body — is not
/// an error: the handler answers 200 with the usage message. Pipeline
/// failures surface as 500 with the error text.
async fn migrate_content(State(state): State<AppState>, body: String) -> (StatusCode, String) {
    let request: ContentRequest = serde_json::from_str(&body).unwrap_or_default();

    let (id, title) = match (request.id, request.title) {
        (Some(id), Some(title)) if !id.is_empty() && !title.is_empty() => (id, title),
        _ => return (StatusCode::OK, USAGE.to_string()),
    };

    info!(%id, %title, "received migration request");

    match state.pipeline.run_single(&id, &title).await {
        Ok(status) => (
            StatusCode::ACCEPTED,
            format!("{id} is sent to the knowledge base with status code {status}."),
        ),
        Err(e) => {
            error!(%id, error = %e, "migration failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("migration failed: {e}"),
            )
        }
    }
}

/// Liveness probe.
async fn healthz() -> StatusCode {
    StatusCode::OK
}
