use serde::{Deserialize, Serialize};
use thiserror::Error;

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Deserialize, Serialize)]
pub enum ToolError {
    #[error("Tool not found: {0}")]
    NotFound(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Rejected for security reasons: {0}")]
    Rejected(String),

    #[error("Tool execution failed: {0}")]
    ExecutionError(String),
}

pub type ToolResult<T> = Result<T, ToolError>;

/// Failures that abort an entire build request, as opposed to [`ToolError`]s
/// which are recorded per action and never abort the batch.
#[derive(Error, Debug)]
pub enum BuildError {
    #[error("Invalid prompt: {0}")]
    InvalidPrompt(String),

    #[error("Project store error: {0}")]
    Store(#[from] std::io::Error),

    #[error("Provider request failed: {0}")]
    Provider(anyhow::Error),
}
