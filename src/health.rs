use crate::backend::BackendCall;
use crate::routes::handler::AppState;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

/// Health check endpoint - returns OK if server is running
pub async fn health_check() -> Response {
    (StatusCode::OK, Json(json!({"status": "ok"}))).into_response()
}

/// Readiness check endpoint - OK only while the backend answers its status call
pub async fn readiness_check(State(state): State<AppState>) -> Response {
    match state.dispatcher.backend().call(BackendCall::GetStatus).await {
        Ok(response) if response.status == 200 => {
            (StatusCode::OK, Json(json!({"status": "ready"}))).into_response()
        }
        Ok(response) => {
            warn!("Backend not ready: status {}", response.status);
            unavailable()
        }
        Err(e) => {
            warn!("Backend not ready: {}", e);
            unavailable()
        }
    }
}

fn unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({"status": "unavailable"})),
    )
        .into_response()
}
