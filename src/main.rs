use std::sync::Arc;

use tracing::info;
use userkeep::config::AppConfig;
use userkeep::core::credentials::BcryptHasher;
use userkeep::infrastructure::database::Client;
use userkeep::infrastructure::logging;
use userkeep::{AppState, app};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    let _log_guard = logging::init(&config.logging)?;

    // Connect to the document store before accepting traffic
    let client = Client::new(&config.database)?;
    info!(
        endpoint = %client.endpoint(),
        database = %config.database.name,
        authenticated = client.credential().is_some(),
        "connecting to document store"
    );
    let database = client.connect().await?;

    let hasher = Arc::new(BcryptHasher::new(config.credentials.bcrypt_cost));
    let state = AppState::new(database, hasher, config.server.request_timeout);
    let router = app(state);

    let addr = config.server.socket_addr()?;
    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    client.disconnect().await?;
    info!("document store disconnected");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
