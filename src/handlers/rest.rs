/// REST API handlers for inspecting the terminal session
use axum::{
    extract::{Json, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use tracing::debug;

use crate::{
    api::dto::{ErrorResponse, SessionSnapshot},
    app_state::AppState,
};

/// Health check
pub async fn health_check() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Snapshot of the terminal session
pub async fn get_session(State(state): State<AppState>) -> impl IntoResponse {
    match state.supervisor.active_session().await {
        Some(session) => {
            let display_attached = state.supervisor.bridge().has_display();
            let snapshot = SessionSnapshot::from_session(&session, display_attached);
            debug!("Session snapshot requested: {:?}", snapshot);
            (StatusCode::OK, Json(snapshot)).into_response()
        }
        None => (
            StatusCode::NOT_FOUND,
            Json(ErrorResponse::new("No terminal session has been started")),
        )
            .into_response(),
    }
}
