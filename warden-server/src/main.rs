//! Warden Server - Headless Daemon
//!
//! A pure Rust HTTP server that:
//! - Holds the canonical Device State Store (SQLite)
//! - Serves the agent-facing API (registration, polls, reports) on /api/agent/*
//! - Serves the owner-facing API (link, actions, geofence, wipe) on /api/*
//! - Runs background schedulers (offline sweep, browse-board cleanup)
//!
//! The web dashboard itself is an external collaborator; this daemon only
//! exposes the request/response surface it consumes.

use anyhow::Result;
use axum::{http::StatusCode, response::IntoResponse, routing::get, Router};
use clap::Parser;
use std::net::SocketAddr;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod api;
mod scheduler;
mod state;

#[cfg(test)]
mod test_helpers;

use state::AppState;
use warden_core::DeviceStore;

const DEFAULT_PORT: u16 = 8070;

#[derive(Parser, Debug)]
#[command(author, version, about = "Warden device-tracking server", long_about = None)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "WARDEN_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Data directory (defaults to $WARDEN_DATA_DIR or ~/.warden)
    #[arg(long)]
    data_dir: Option<std::path::PathBuf>,

    /// Hours without a report before an active device is marked missing
    #[arg(long, default_value_t = 24)]
    offline_threshold_hours: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let cli = Cli::parse();

    info!("🚀 Warden Server starting on port {}...", cli.port);

    let data_dir = match cli.data_dir {
        Some(dir) => {
            std::fs::create_dir_all(&dir)?;
            dir
        }
        None => warden_core::utils::paths::get_data_dir()
            .map_err(|e| anyhow::anyhow!("Failed to resolve data directory: {}", e))?,
    };

    let db_path = data_dir.join("warden.db");
    let store = DeviceStore::open(&db_path)
        .map_err(|e| anyhow::anyhow!("Failed to open device store: {}", e))?;
    info!("📦 Device store at {}", db_path.display());

    let state = AppState::new(store);
    info!("✅ Application state initialized ({} devices)", state.device_count());

    scheduler::start_offline_sweep(state.clone(), cli.offline_threshold_hours * 3600);
    scheduler::start_browse_cleanup(state.clone());

    let app = build_router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], cli.port));
    let listener = tokio::net::TcpListener::bind(addr).await?;

    info!("🌐 Server listening on http://{}", addr);
    info!("🔌 API available at http://localhost:{}/api/", cli.port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn build_router(state: AppState) -> Router {
    Router::new()
        .nest("/api", api::router())
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({"status": "ok"})))
}
