use crate::config::Config;
use crate::relay::ResponseEnvelope;
use crate::routing::Dispatcher;
use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::Method,
};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Debug, Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: Arc<Dispatcher>,
}

/// Entry point for everything under `/api/`
pub async fn api_router(
    State(state): State<AppState>,
    method: Method,
    Path(api_path): Path<String>,
    Query(query_params): Query<HashMap<String, String>>,
    body: Bytes,
) -> ResponseEnvelope {
    info!(
        "Handling API request: {} {} with {} query params, {} body bytes",
        method,
        api_path,
        query_params.len(),
        body.len()
    );

    state
        .dispatcher
        .dispatch(&method, &api_path, query_params, body)
        .await
}
