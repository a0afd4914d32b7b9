use anyhow::Context;
use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, warn};

use app_authentication::{AuthService, InMemoryUserStore};
use app_config::{AppConfig, Server};
use app_error::AppError;
use micro_auth::{routes, telemetry};

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let config = AppConfig::from_env()?;
    let _sentry_guard = telemetry::init_telemetry(&config)?;
    let config = config.validated()?;

    info!("Starting application at {}", chrono::Utc::now());

    let users = Arc::new(InMemoryUserStore::new());
    let auth_service = Arc::new(AuthService::from_config(&config, users)?);

    let app = routes::create_routes(&config, auth_service);

    let address = Server::from(&config).bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind to address: {}", address))?;

    info!("Auth service listening on http://{}", address);

    // Connect info lets the request logger fall back to the peer address
    let app = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            // Without a signal handler, run until killed
            warn!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
