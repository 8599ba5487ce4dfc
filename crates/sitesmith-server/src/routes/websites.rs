use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use sitesmith::store::preview_url;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WebsiteEntry {
    project_id: String,
    preview_url: String,
    created: DateTime<Utc>,
    modified: DateTime<Utc>,
}

async fn list_websites(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.list_websites() {
        Ok(websites) => {
            let websites: Vec<WebsiteEntry> = websites
                .into_iter()
                .map(|info| WebsiteEntry {
                    preview_url: preview_url(&state.public_url, &info.project_id),
                    project_id: info.project_id,
                    created: info.created,
                    modified: info.modified,
                })
                .collect();
            (
                StatusCode::OK,
                Json(json!({ "success": true, "websites": websites })),
            )
                .into_response()
        }
        Err(e) => {
            error!("failed to list websites: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response()
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/websites", get(list_websites))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use serde_json::Value;
    use sitesmith::providers::configs::{OpenAiProviderConfig, ProviderConfig};
    use sitesmith::store::ProjectStore;
    use std::fs;
    use std::time::Instant;
    use tower::ServiceExt;

    fn test_state(root: &std::path::Path) -> AppState {
        AppState {
            provider_config: ProviderConfig::OpenAi(OpenAiProviderConfig {
                host: "http://localhost:9".to_string(),
                api_key: "test-key".to_string(),
                model: "gpt-4o".to_string(),
                temperature: None,
                max_tokens: None,
            }),
            store: ProjectStore::new(root).unwrap(),
            public_url: "http://localhost:3000".to_string(),
            started: Instant::now(),
        }
    }

    #[tokio::test]
    async fn test_list_websites_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let app = routes(test_state(temp_dir.path()));

        let request = Request::builder()
            .uri("/api/websites")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], true);
        assert_eq!(body["websites"].as_array().unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_list_websites_with_previews() {
        let temp_dir = tempfile::tempdir().unwrap();
        let state = test_state(temp_dir.path());

        let project = state.store.create_project().unwrap();
        fs::write(project.dir.join("index.html"), "<html></html>").unwrap();

        let app = routes(state);
        let request = Request::builder()
            .uri("/api/websites")
            .body(Body::empty())
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        let websites = body["websites"].as_array().unwrap();
        assert_eq!(websites.len(), 1);
        assert_eq!(websites[0]["projectId"], project.id);
        assert_eq!(
            websites[0]["previewUrl"],
            format!("http://localhost:3000/sites/{}/", project.id)
        );
        assert!(websites[0]["created"].is_string());
        assert!(websites[0]["modified"].is_string());
    }
}
