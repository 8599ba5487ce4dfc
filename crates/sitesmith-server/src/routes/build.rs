use std::time::Instant;

use axum::{
    extract::State, http::StatusCode, response::IntoResponse, routing::post, Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sitesmith::agent::BuildAgent;
use sitesmith::errors::BuildError;
use sitesmith::providers::factory;
use tracing::error;

use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BuildRequest {
    user_prompt: String,
}

async fn build_website(
    State(state): State<AppState>,
    Json(request): Json<BuildRequest>,
) -> impl IntoResponse {
    let started = Instant::now();

    let provider = match factory::get_provider(state.provider_config.clone()) {
        Ok(provider) => provider,
        Err(e) => {
            error!("failed to construct provider: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "success": false, "error": e.to_string() })),
            )
                .into_response();
        }
    };

    // Each request gets its own agent, so concurrent builds share nothing
    // beyond the store's filesystem namespace.
    let agent = BuildAgent::new(provider, state.store.clone(), state.public_url.clone());

    match agent.build(&request.user_prompt).await {
        Ok(response) => (StatusCode::OK, Json(response)).into_response(),
        Err(e @ BuildError::InvalidPrompt(_)) => (
            StatusCode::BAD_REQUEST,
            Json(json!({ "success": false, "error": e.to_string() })),
        )
            .into_response(),
        Err(e) => {
            error!("build failed: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "success": false,
                    "error": e.to_string(),
                    "stats": {
                        "executionTime": started.elapsed().as_millis() as u64,
                        "timestamp": chrono::Utc::now(),
                    }
                })),
            )
                .into_response()
        }
    }
}

// Configure routes for this module
pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/api/build", post(build_website))
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
    async fn test_empty_prompt_is_a_bad_request() {
        let temp_dir = tempfile::tempdir().unwrap();
        let app = routes(test_state(temp_dir.path()));

        let request = Request::builder()
            .uri("/api/build")
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"userPrompt": "   "}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["error"].as_str().unwrap().contains("Invalid prompt"));
    }

    #[tokio::test]
    async fn test_unreachable_provider_is_a_server_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let app = routes(test_state(temp_dir.path()));

        let request = Request::builder()
            .uri("/api/build")
            .method("POST")
            .header("content-type", "application/json")
            .body(Body::from(r#"{"userPrompt": "Build a one-page portfolio"}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["success"], false);
        assert!(body["stats"]["executionTime"].is_number());
    }
}
