//! Read-only HTTP endpoint for a thread's classifications.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::campaign::Classification;
use crate::store::{LibSqlBackend, classifications};

/// Shared state for classification routes.
#[derive(Clone)]
pub struct ApiState {
    pub backend: Arc<LibSqlBackend>,
}

#[derive(Debug, Serialize)]
struct ClassificationsBody {
    classifications: Vec<Classification>,
}

/// GET /classifications/{thread_id}
///
/// Every classification on the thread, oldest first. Storage errors come back
/// as a 500 with the error text as the body.
async fn list_classifications(
    State(state): State<ApiState>,
    Path(thread_id): Path<String>,
) -> Response {
    match classifications::list_for_thread(state.backend.conn(), &thread_id).await {
        Ok(classifications) => Json(ClassificationsBody { classifications }).into_response(),
        Err(e) => {
            error!(thread_id = %thread_id, error = %e, "Failed to list classifications");
            (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()).into_response()
        }
    }
}

/// Build the classification REST routes.
pub fn classification_routes(state: ApiState) -> Router {
    Router::new()
        .route("/classifications/{thread_id}", get(list_classifications))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
