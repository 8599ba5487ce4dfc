use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};

use lazy_static::lazy_static;

use crate::errors::{ToolError, ToolResult};

/// Per-command execution policy. Commands not in the table are denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandPolicy {
    Allow,
    Deny,
}

// Commands capable of privilege escalation, network access, process/service
// control, destructive disk operations, or scheduling. Denied regardless of
// arguments.
const DENIED_COMMANDS: &[&str] = &[
    "sudo", "su", "doas", "curl", "wget", "nc", "ncat", "ssh", "scp", "rsync", "ftp", "telnet",
    "kill", "killall", "pkill", "systemctl", "service", "reboot", "shutdown", "init", "mkfs",
    "fdisk", "dd", "mount", "umount", "crontab", "at",
];

// Benign file and text utilities.
const ALLOWED_COMMANDS: &[&str] = &[
    "mkdir", "touch", "echo", "ls", "cat", "cp", "mv", "rm", "find", "grep", "sed", "head",
    "tail", "wc", "sort", "uniq", "pwd", "true",
];

lazy_static! {
    static ref COMMAND_POLICY: HashMap<&'static str, CommandPolicy> = {
        let mut table = HashMap::new();
        for name in DENIED_COMMANDS {
            table.insert(*name, CommandPolicy::Deny);
        }
        for name in ALLOWED_COMMANDS {
            table.insert(*name, CommandPolicy::Allow);
        }
        table
    };
}

/// Look up the policy for a program name, if it has one
pub fn command_policy(program: &str) -> Option<CommandPolicy> {
    COMMAND_POLICY.get(program).copied()
}

/// Decide whether a raw command string may be executed. The decision is made
/// on the leading token only; unknown programs are denied.
pub fn validate_command(raw: &str) -> ToolResult<()> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidParameters(
            "Command must not be empty".into(),
        ));
    }

    let program = trimmed.split_whitespace().next().unwrap_or_default();
    match command_policy(program) {
        Some(CommandPolicy::Deny) => Err(ToolError::Rejected(format!(
            "The command '{}' is not permitted",
            program
        ))),
        Some(CommandPolicy::Allow) => Ok(()),
        // echo is always safe to run, whatever follows it
        None if trimmed.starts_with("echo") => Ok(()),
        None => Err(ToolError::Rejected(format!(
            "The command '{}' is not on the allowed list",
            program
        ))),
    }
}

/// Normalize a project-relative path, rejecting absolute paths and any
/// parent-directory traversal. Every path-bearing action goes through this
/// before touching the filesystem.
pub fn validate_path(raw: &str) -> ToolResult<PathBuf> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(ToolError::InvalidParameters("Path must not be empty".into()));
    }

    let path = Path::new(trimmed);
    if path.is_absolute() || trimmed.starts_with('/') || trimmed.starts_with('\\') {
        return Err(ToolError::Rejected(format!(
            "Absolute paths are not permitted: '{}'",
            trimmed
        )));
    }

    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalized.push(part),
            Component::CurDir => {}
            Component::ParentDir => {
                return Err(ToolError::Rejected(format!(
                    "Path traversal is not permitted: '{}'",
                    trimmed
                )));
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(ToolError::Rejected(format!(
                    "Absolute paths are not permitted: '{}'",
                    trimmed
                )));
            }
        }
    }

    Ok(normalized)
}
