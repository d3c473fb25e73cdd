mod agent;
mod config;
mod cv;
mod errors;
mod jobs;
mod models;
mod profiles;
mod routes;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::agent::AgentClient;
use crate::config::Config;
use crate::cv::CvBlobStore;
use crate::jobs::JobCatalog;
use crate::profiles::JsonFileProfileStore;
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting job board API v{}", env!("CARGO_PKG_VERSION"));

    let catalog = JobCatalog::load(&config.jobs_path).await?;

    let profiles = JsonFileProfileStore::new(&config.profiles_path);
    info!("Profile store at {}", config.profiles_path.display());

    let cvs = CvBlobStore::new(&config.cv_upload_dir);
    info!("CV uploads stored in {}", cvs.dir().display());

    let agent = AgentClient::new(
        config.agent_api_url.clone(),
        Duration::from_secs(config.agent_timeout_secs),
    )
    .context("Failed to build agent HTTP client")?;
    info!("Agent proxy forwarding to {}", agent.url());

    let state = AppState {
        catalog: Arc::new(catalog),
        profiles: Arc::new(profiles),
        cvs,
        agent,
    };

    // Browser clients call the agent proxy cross-origin.
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
