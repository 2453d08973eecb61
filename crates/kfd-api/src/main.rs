//! Axum API server binary.

use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kfd_api::{create_router, metrics, ApiConfig, AppState};
use kfd_ml_client::DetectionClient;
use kfd_pipeline::{PipelineConfig, PipelineController};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Install rustls crypto provider (required for rustls 0.23+)
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    init_tracing();

    info!("Starting kfd-api");

    let config = ApiConfig::from_env();
    let pipeline_config = PipelineConfig::from_env();
    info!(
        "API config: host={}, port={}, max_parallel={}",
        config.host, config.port, pipeline_config.max_parallel
    );

    let detector = match DetectionClient::from_env() {
        Ok(client) => client,
        Err(e) => {
            error!("Failed to create detection client: {}", e);
            std::process::exit(1);
        }
    };
    if detector.config().api_key.is_empty() {
        warn!("DETECTION_API_KEY is not set; inference requests will be rejected upstream");
    }

    let pipeline = PipelineController::new(pipeline_config, Arc::new(detector));
    if let Err(e) = pipeline.extractor().runner().check() {
        warn!("{}; video uploads will fail until it is installed", e);
    }

    let metrics_handle = if config.metrics_enabled {
        info!("Prometheus metrics enabled at /metrics");
        Some(metrics::init_metrics())
    } else {
        None
    };

    let state = AppState::new(config.clone(), pipeline);
    let app = create_router(state, metrics_handle);

    // Bind and serve
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .expect("Invalid bind address");

    info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind listener");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    info!("Server shutdown complete");
}

/// Colored output for dev, JSON with `LOG_FORMAT=json`.
fn init_tracing() {
    let use_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    let env_filter = env_filter();

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(
                fmt::layer()
                    .with_ansi(true)
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_file(false)
                    .with_line_number(false),
            )
            .with(env_filter)
            .init();
    }
}

/// `RUST_LOG` wins; otherwise a bare `LOG_LEVEL` sets the global level.
fn env_filter() -> EnvFilter {
    if std::env::var("RUST_LOG").is_err() {
        if let Some(level) = std::env::var("LOG_LEVEL").ok().and_then(|l| level_directive(&l)) {
            if let Ok(filter) = EnvFilter::try_new(level) {
                return filter;
            }
        }
    }

    EnvFilter::from_default_env().add_directive("kfd=info".parse().expect("valid directive"))
}

/// Map a logging level name (including `WARNING`/`CRITICAL`) to a filter level.
fn level_directive(level: &str) -> Option<&'static str> {
    match level.trim().to_lowercase().as_str() {
        "trace" => Some("trace"),
        "debug" => Some("debug"),
        "info" => Some("info"),
        "warn" | "warning" => Some("warn"),
        "error" | "critical" | "fatal" => Some("error"),
        "off" => Some("off"),
        _ => None,
    }
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C handler");
    info!("Received shutdown signal");
}
