pub mod handler;

use axum::{
    extract::DefaultBodyLimit,
    routing::{any, get},
    Router,
};
use handler::AppState;
use tracing::debug;

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    debug!(
        "Registering /api/ dispatcher with {} rules",
        state.dispatcher.table().len()
    );

    // Method filtering happens in the dispatcher so unknown methods get 501
    Router::new()
        .route("/health", get(crate::health::health_check))
        .route("/ready", get(crate::health::readiness_check))
        .route("/metrics", get(crate::middleware::metrics::metrics_handler))
        .route(
            "/api/*api_path",
            // Bodies are capped by the server's RequestBodyLimitLayer only
            any(handler::api_router).layer(DefaultBodyLimit::disable()),
        )
        .with_state(state)
}
