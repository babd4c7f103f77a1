use anyhow::Result;
use axum::http::Method;
use corpus_gateway::clients::backend_from_config;
use corpus_gateway::config::Config;
use corpus_gateway::middleware;
use corpus_gateway::routes::{build_router, handler::AppState};
use corpus_gateway::routing::{Dispatcher, RouteTable};
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "corpus_gateway=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting corpus gateway");

    middleware::init_metrics()?;
    info!("Initialized Prometheus metrics exporter");

    // Load configuration
    let config_path = std::env::var("CONFIG_PATH").unwrap_or_else(|_| "config.yaml".to_string());
    info!("Loading configuration from: {}", config_path);

    let config = Config::from_yaml_with_env(&config_path)?;
    info!("Forwarding API requests to: {}", config.backend.base_url);

    let backend = backend_from_config(&config)?;
    let table = RouteTable::api()?;
    info!("Compiled {} API rules", table.len());

    let state = AppState {
        config: Arc::new(config.clone()),
        dispatcher: Arc::new(Dispatcher::new(table, backend)),
    };

    let mut app = build_router(state);

    // Apply CORS if configured
    if let Some(ref cors_config) = config.server.cors {
        info!("Enabling CORS");
        let mut cors = CorsLayer::new();

        if cors_config.allowed_origins.iter().any(|o| o == "*") {
            cors = cors.allow_origin(Any);
        } else {
            for origin in &cors_config.allowed_origins {
                if let Ok(origin_header) = origin.parse::<axum::http::HeaderValue>() {
                    cors = cors.allow_origin(origin_header);
                }
            }
        }

        let methods: Vec<Method> = cors_config
            .allowed_methods
            .iter()
            .filter_map(|m| m.parse().ok())
            .collect();
        cors = cors.allow_methods(methods);

        if !cors_config.allowed_headers.is_empty() {
            let headers: Vec<_> = cors_config
                .allowed_headers
                .iter()
                .filter_map(|h| h.parse().ok())
                .collect();
            cors = cors.allow_headers(headers);
        } else {
            cors = cors.allow_headers(Any);
        }

        if cors_config.allow_credentials {
            cors = cors.allow_credentials(true);
        }

        cors = cors.max_age(Duration::from_secs(cors_config.max_age));

        app = app.layer(cors);
    }

    info!(
        "Setting max request body size: {} bytes",
        config.server.max_body_size
    );
    app = app.layer(RequestBodyLimitLayer::new(config.server.max_body_size));

    info!("Setting request timeout: {} seconds", config.server.timeout);
    app = app.layer(TimeoutLayer::new(Duration::from_secs(
        config.server.timeout,
    )));

    app = app.layer(axum::middleware::from_fn(
        middleware::create_logging_middleware(config.server.logging.clone()),
    ));

    app = app.layer(CompressionLayer::new());

    app = app
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn(middleware::metrics_middleware))
        .layer(TraceLayer::new_for_http());

    let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port = std::env::var("PORT").unwrap_or_else(|_| "3000".to_string());
    let bind_addr = format!("{}:{}", host, port);

    info!("Starting server on {}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped gracefully");
    Ok(())
}

/// Handle shutdown signals for graceful termination
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, shutting down gracefully");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, shutting down gracefully");
        },
    }

    tracing::info!("Draining connections...");
    tokio::time::sleep(Duration::from_secs(1)).await;
}
