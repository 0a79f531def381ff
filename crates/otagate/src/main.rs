//! otagate daemon
//!
//! HTTP front for OTA device management on top of the director, device
//! registry and TUF repository.

use std::sync::Arc;

use color_eyre::Result;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod api;
mod auth;
mod config;
mod router;
mod state;

use config::{Config, DaemonConfig, LogFormat};
use state::AppState;

fn init_tracing(daemon: &DaemonConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&daemon.log_level));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match daemon.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let path = Config::locate();
    let mut config = match &path {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    config.apply_env();

    init_tracing(&config.daemon);
    match &path {
        Some(path) => info!(config = %path.display(), "loaded configuration"),
        None => warn!("no config file found, using defaults"),
    }
    if config.auth.tokens.is_empty() {
        warn!("no API tokens configured, accepting every caller");
    }

    let listener = TcpListener::bind(&config.daemon.bind).await?;
    info!(
        bind = %config.daemon.bind,
        namespace = %config.backends.namespace,
        director = %config.backends.director_url,
        registry = %config.backends.registry_url,
        repository = %config.backends.repository_url,
        "otagate daemon listening"
    );

    let app = router::create_router(Arc::new(AppState::new(config)));
    axum::serve(listener, app).await?;
    Ok(())
}
