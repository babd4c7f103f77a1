use axum::{
    extract::Request,
    http::{header::CONTENT_LENGTH, HeaderMap},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

use crate::config::LoggingConfig;

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}

/// Middleware to log requests and responses
pub async fn logging_middleware(
    config: Arc<LoggingConfig>,
    request: Request,
    next: Next,
) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().clone();
    let request_id = request
        .extensions()
        .get::<String>()
        .cloned()
        .unwrap_or_else(|| "unknown".to_string());

    info!(
        request_id = %request_id,
        method = %method,
        uri = %uri,
        "Incoming request"
    );

    if config.log_headers {
        debug!(request_id = %request_id, headers = ?request.headers(), "Request headers");
    }

    // Bodies are forwarded untouched, so only their declared size is logged
    if config.log_request_body {
        debug!(
            request_id = %request_id,
            body_len = ?content_length(request.headers()),
            "Request body"
        );
    }

    let response = next.run(request).await;

    if config.log_response_body {
        debug!(
            request_id = %request_id,
            body_len = ?content_length(response.headers()),
            "Response body"
        );
    }

    info!(
        request_id = %request_id,
        status = response.status().as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Response sent"
    );

    response
}

/// Create logging middleware with config
pub fn create_logging_middleware(
    config: LoggingConfig,
) -> impl Fn(Request, Next) -> std::pin::Pin<Box<dyn std::future::Future<Output = Response> + Send>>
       + Clone {
    let config = Arc::new(config);
    move |request: Request, next: Next| {
        let config = config.clone();
        Box::pin(async move { logging_middleware(config, request, next).await })
    }
}
