use async_trait::async_trait;
use serde_json::Value;

use crate::errors::ToolResult;
use crate::models::tool::{Tool, ToolCall};

/// Core trait that defines a system the build agent can operate
#[async_trait]
pub trait System: Send + Sync {
    /// Get the name of the system
    fn name(&self) -> &str;

    /// Get the system description
    fn description(&self) -> &str;

    /// Get system instructions
    fn instructions(&self) -> &str;

    /// Get available tools
    fn tools(&self) -> &[Tool];

    /// Call a tool with the given parameters
    async fn call(&self, tool_call: ToolCall) -> ToolResult<Value>;
}
