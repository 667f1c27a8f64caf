//! rollcall-ai - Attendance Ingest service
//!
//! Serves the single-page ingest UI, the working-session REST API and the
//! SSE event stream.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use rollcall_common::config::{load_or_default, ConfigFileResolver};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rollcall_ai::config::{resolve_gemini_api_key, ServiceConfig, API_KEY_ENV_VAR};
use rollcall_ai::extractors::{GeminiClient, RecordExtractor, UnconfiguredExtractor};
use rollcall_ai::AppState;

/// Command-line arguments for rollcall-ai
#[derive(Parser, Debug)]
#[command(name = "rollcall-ai")]
#[command(about = "Attendance sheet ingest service")]
#[command(version)]
struct Args {
    /// Address to bind
    #[arg(long, env = "ROLLCALL_HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "ROLLCALL_PORT")]
    port: Option<u16>,

    /// TOML config file (overrides the standard search locations)
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config is read before logging starts; its outcome is reported below
    let config_path = ConfigFileResolver::new("rollcall-ai").resolve(args.config.as_deref());
    let (toml, config_source) = load_or_default(config_path.as_deref());

    let api_key_env = std::env::var(API_KEY_ENV_VAR).ok();
    let preliminary = ServiceConfig::resolve(args.host.clone(), args.port, &toml, None);

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| preliminary.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting rollcall-ai (Attendance Ingest)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    config_source.log();

    let api_key = resolve_gemini_api_key(api_key_env, &toml);
    let config = ServiceConfig {
        gemini_api_key: api_key,
        ..preliminary
    };

    let extractor: Arc<dyn RecordExtractor> = match &config.gemini_api_key {
        Some(key) => Arc::new(
            GeminiClient::new(key.clone(), config.gemini_model.clone())
                .context("Failed to build extraction client")?,
        ),
        None => Arc::new(UnconfiguredExtractor),
    };
    info!(extractor = extractor.name(), model = %config.gemini_model, "Extractor ready");

    let bind_address = config.bind_address();
    let state = AppState::new(config, extractor);
    let app = rollcall_ai::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind to {}", bind_address))?;
    info!("Listening on http://{}", bind_address);
    info!("Health check: http://{}/health", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
