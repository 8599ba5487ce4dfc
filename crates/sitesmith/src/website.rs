use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use crate::errors::{ToolError, ToolResult};
use crate::models::tool::{Tool, ToolCall};
use crate::policy;
use crate::systems::System;

/// Ceiling for the content of a single write_file call.
pub const MAX_FILE_BYTES: usize = 1024 * 1024;
/// Captured command output beyond this is truncated.
pub const MAX_OUTPUT_BYTES: usize = 64 * 1024;
/// A command still running after this long fails, without failing the build.
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

/// Executes validated actions against one project directory. Constructed per
/// build request; the project directory is the only state it carries, so
/// concurrent builds never share context.
pub struct WebsiteSystem {
    tools: Vec<Tool>,
    project_dir: PathBuf,
}

impl WebsiteSystem {
    pub fn new(project_dir: PathBuf) -> Self {
        let execute_command_tool = Tool::new(
            "execute_command",
            "Run a shell command inside the project directory. Only simple file and \
            text utilities are permitted; network and system administration commands \
            are rejected.",
            json!({
                "type": "object",
                "required": ["command"],
                "properties": {
                    "command": {
                        "type": "string",
                        "description": "The shell command to run."
                    }
                }
            }),
        );

        let write_file_tool = Tool::new(
            "write_file",
            "Write a file inside the project directory, overwriting any existing \
            content. Missing parent directories are created.",
            json!({
                "type": "object",
                "required": ["path", "content"],
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path relative to the project root, e.g. 'index.html' or 'css/style.css'."
                    },
                    "content": {
                        "type": "string",
                        "description": "The full content of the file."
                    }
                }
            }),
        );

        let read_file_tool = Tool::new(
            "read_file",
            "Read the content of a file inside the project directory.",
            json!({
                "type": "object",
                "required": ["path"],
                "properties": {
                    "path": {
                        "type": "string",
                        "description": "Path relative to the project root."
                    }
                }
            }),
        );

        let list_directory_tool = Tool::new(
            "list_directory",
            "List the entries of a directory inside the project. Defaults to the \
            project root.",
            json!({
                "type": "object",
                "required": [],
                "properties": {
                    "path": {
                        "type": "string",
                        "default": ".",
                        "description": "Path relative to the project root. Defaults to the project root."
                    }
                }
            }),
        );

        Self {
            tools: vec![
                execute_command_tool,
                write_file_tool,
                read_file_tool,
                list_directory_tool,
            ],
            project_dir,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    // Every path-bearing action resolves through here, after validation
    fn resolve_path(&self, path_str: &str) -> ToolResult<PathBuf> {
        let relative = policy::validate_path(path_str)?;
        Ok(self.project_dir.join(relative))
    }

    async fn execute_command(&self, params: Value) -> ToolResult<Value> {
        let command = params
            .get("command")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("Missing 'command' parameter".into()))?;

        policy::validate_command(command)?;
        debug!(command, "executing command");

        // Redirect stderr to stdout to interleave outputs
        let cmd_with_redirect = format!("{} 2>&1", command);
        let output = Command::new("bash")
            .arg("-c")
            .arg(&cmd_with_redirect)
            .current_dir(&self.project_dir)
            .kill_on_drop(true)
            .output();

        let output = match timeout(COMMAND_TIMEOUT, output).await {
            Ok(result) => result.map_err(|e| {
                ToolError::ExecutionError(format!("Failed to run command: {}", e))
            })?,
            Err(_) => {
                return Err(ToolError::ExecutionError(format!(
                    "Command timed out after {} seconds",
                    COMMAND_TIMEOUT.as_secs()
                )))
            }
        };

        let raw = String::from_utf8_lossy(&output.stdout);
        let truncated = raw.len() > MAX_OUTPUT_BYTES;
        let output_str = truncate_utf8(&raw, MAX_OUTPUT_BYTES).trim().to_string();

        if !output.status.success() {
            return Err(ToolError::ExecutionError(output_str));
        }

        Ok(json!({
            "command": command,
            "output": output_str,
            "truncated": truncated,
        }))
    }

    async fn write_file(&self, params: Value) -> ToolResult<Value> {
        let path_str = params
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("Missing 'path' parameter".into()))?;
        let content = params
            .get("content")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("Missing 'content' parameter".into()))?;

        if content.len() > MAX_FILE_BYTES {
            return Err(ToolError::InvalidParameters(format!(
                "Content is {} bytes, above the {} byte limit",
                content.len(),
                MAX_FILE_BYTES
            )));
        }

        let path = self.resolve_path(path_str)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| {
                    ToolError::ExecutionError(format!("Failed to create directories: {}", e))
                })?;
            }
        }

        fs::write(&path, content)
            .map_err(|e| ToolError::ExecutionError(format!("Failed to write file: {}", e)))?;
        debug!(path = path_str, bytes = content.len(), "wrote file");

        Ok(json!({
            "path": path_str,
            "bytesWritten": content.len(),
        }))
    }

    async fn read_file(&self, params: Value) -> ToolResult<Value> {
        let path_str = params
            .get("path")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidParameters("Missing 'path' parameter".into()))?;

        let path = self.resolve_path(path_str)?;
        if !path.is_file() {
            return Err(ToolError::InvalidParameters(format!(
                "File '{}' does not exist",
                path_str
            )));
        }

        let content = fs::read_to_string(&path)
            .map_err(|e| ToolError::ExecutionError(format!("Failed to read file: {}", e)))?;

        Ok(json!({
            "path": path_str,
            "content": content,
            "bytes": content.len(),
        }))
    }

    async fn list_directory(&self, params: Value) -> ToolResult<Value> {
        let path_str = params
            .get("path")
            .and_then(|v| v.as_str())
            .unwrap_or(".");

        let path = self.resolve_path(path_str)?;
        if !path.is_dir() {
            return Err(ToolError::InvalidParameters(format!(
                "Directory '{}' does not exist",
                path_str
            )));
        }

        let mut entries = Vec::new();
        let read_dir = fs::read_dir(&path)
            .map_err(|e| ToolError::ExecutionError(format!("Failed to read directory: {}", e)))?;
        for entry in read_dir {
            let entry = entry.map_err(|e| {
                ToolError::ExecutionError(format!("Failed to read directory entry: {}", e))
            })?;
            let file_type = entry.file_type().map_err(|e| {
                ToolError::ExecutionError(format!("Failed to read entry type: {}", e))
            })?;
            let name = entry.file_name().to_string_lossy().into_owned();
            let relative = if path_str == "." {
                name.clone()
            } else {
                format!("{}/{}", path_str.trim_end_matches('/'), name)
            };
            entries.push(json!({
                "name": name,
                "type": if file_type.is_dir() { "directory" } else { "file" },
                "path": relative,
            }));
        }
        entries.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

        Ok(json!({
            "path": path_str,
            "entries": entries,
        }))
    }
}

// Byte-bounded truncation that never splits a UTF-8 sequence
fn truncate_utf8(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

#[async_trait]
impl System for WebsiteSystem {
    fn name(&self) -> &str {
        "website"
    }

    fn description(&self) -> &str {
        "A system that builds static websites with shell and file operations"
    }

    fn instructions(&self) -> &str {
        "Use the provided tools to create the files of a static website. All paths \
        are relative to the project root. The entry point of the site must be a \
        file named index.html at the project root."
    }

    fn tools(&self) -> &[Tool] {
        &self.tools
    }

    async fn call(&self, tool_call: ToolCall) -> ToolResult<Value> {
        match tool_call.name.as_str() {
            "execute_command" => self.execute_command(tool_call.arguments).await,
            "write_file" => self.write_file(tool_call.arguments).await,
            "read_file" => self.read_file(tool_call.arguments).await,
            "list_directory" => self.list_directory(tool_call.arguments).await,
            _ => Err(ToolError::NotFound(tool_call.name)),
        }
    }
}
