use axum::{extract::State, response::Json, routing::get, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct HealthResponse {
    status: &'static str,
    uptime_seconds: u64,
    platform: &'static str,
    version: &'static str,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_seconds: state.started.elapsed().as_secs(),
        platform: std::env::consts::OS,
        version: env!("CARGO_PKG_VERSION"),
    })
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}
