use axum::{
    extract::State,
    response::{Html, IntoResponse},
    routing::get,
    Router,
};
use sitesmith::store::preview_url;
use tower_http::services::ServeDir;
use tracing::error;

use crate::state::AppState;

// Root path: an HTML listing of the generated projects
async fn index(State(state): State<AppState>) -> impl IntoResponse {
    let websites = match state.store.list_websites() {
        Ok(websites) => websites,
        Err(e) => {
            error!("failed to list websites: {e}");
            Vec::new()
        }
    };

    let items: String = websites
        .iter()
        .map(|info| {
            format!(
                "<li><a href=\"{}\">{}</a> <small>{}</small></li>\n",
                preview_url(&state.public_url, &info.project_id),
                info.project_id,
                info.created.format("%Y-%m-%d %H:%M UTC"),
            )
        })
        .collect();

    let list = if items.is_empty() {
        "<p>No websites generated yet.</p>".to_string()
    } else {
        format!("<ul>\n{}</ul>", items)
    };

    Html(format!(
        "<!DOCTYPE html>\n<html>\n<head><title>Generated websites</title></head>\n\
         <body>\n<h1>Generated websites</h1>\n{}\n</body>\n</html>",
        list
    ))
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    let sites = ServeDir::new(state.store.root().to_path_buf());
    Router::new()
        .route("/", get(index))
        .nest_service("/sites", sites)
        .with_state(state)
}
