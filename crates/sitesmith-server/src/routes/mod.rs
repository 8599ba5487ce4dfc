// Export route modules
pub mod build;
pub mod health;
pub mod preview;
pub mod websites;

use axum::Router;

use crate::state::AppState;

// Function to configure all routes
pub fn configure(state: AppState) -> Router {
    Router::new()
        .merge(build::routes(state.clone()))
        .merge(websites::routes(state.clone()))
        .merge(health::routes(state.clone()))
        .merge(preview::routes(state))
}
