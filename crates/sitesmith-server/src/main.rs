mod configuration;
mod error;
mod routes;
mod state;

use anyhow::Result;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::configuration::Settings;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing for logging
    tracing_subscriber::fmt::init();

    // A missing credential is fatal here, before the server starts
    let settings = Settings::new()?;
    let addr = settings.server.socket_addr();
    let state = AppState::new(settings)?;
    info!(store_root = %state.store.root().display(), "project store ready");

    // Create router with CORS support
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = routes::configure(state).layer(cors);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
