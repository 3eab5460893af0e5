use anyhow::Result;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use darkwatch::handlers::create_app;
use darkwatch::models::config::AppConfig;
use darkwatch::services::api_client::ApiClient;
use darkwatch::services::session::{FileSessionStore, SessionStore};
use darkwatch::utils::logging::init_logging;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first; logging settings live in it
    let loaded = AppConfig::load();
    let logging = loaded
        .as_ref()
        .map(|config| config.logging.clone())
        .unwrap_or_default();
    let _log_guard = init_logging(&logging)?;
    let config = loaded?;

    info!("Starting Dark Watch dashboard v{}", env!("CARGO_PKG_VERSION"));

    // Session persisted across restarts
    let session = Arc::new(FileSessionStore::open(&config.session.path));
    info!(path = %session.path().display(), "Session store opened");

    let shutdown = CancellationToken::new();
    let api = Arc::new(
        ApiClient::new(&config.backend, session.clone())?.with_cancellation(shutdown.clone()),
    );
    info!(backend = api.api_base(), "Backend configured");

    // Only trust a cached token once the backend has accepted it
    if session.is_authenticated() {
        if api.validate_session().await {
            info!("Cached session is valid");
        } else {
            warn!("Cached session was rejected; login required");
        }
    }

    let app = create_app(Arc::clone(&api), config.clone());

    let addr = config.server.addr()?;
    info!("Dashboard listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Dashboard stopped");
    Ok(())
}

async fn shutdown_signal(cancel: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown requested, cancelling in-flight backend requests");
    cancel.cancel();
}
