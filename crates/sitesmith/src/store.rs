use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use chrono::{DateTime, Utc};
use nanoid::nanoid;
use serde::Serialize;

const ID_ALPHABET: [char; 36] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h',
    'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z',
];

/// One generated website's isolated directory and its identifier
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub dir: PathBuf,
}

/// A project that currently has an index.html, as listed for preview
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WebsiteInfo {
    pub project_id: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// Directory tree on persistent storage, one subdirectory per generated
/// project. Projects are created on each build request and never deleted
/// automatically.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Generate an opaque project id: millisecond timestamp plus a random
    /// suffix, unique for practical purposes.
    pub fn generate_project_id() -> String {
        format!(
            "site-{}-{}",
            Utc::now().timestamp_millis(),
            nanoid!(6, &ID_ALPHABET)
        )
    }

    /// Create a fresh project directory and return its handle
    pub fn create_project(&self) -> io::Result<Project> {
        let id = Self::generate_project_id();
        let dir = self.root.join(&id);
        fs::create_dir_all(&dir)?;
        Ok(Project { id, dir })
    }

    pub fn project_dir(&self, project_id: &str) -> PathBuf {
        self.root.join(project_id)
    }

    /// Whether the project has an index.html at its root
    pub fn has_index(&self, project_id: &str) -> bool {
        self.project_dir(project_id).join("index.html").is_file()
    }

    /// Projects that contain an index.html, newest first
    pub fn list_websites(&self) -> io::Result<Vec<WebsiteInfo>> {
        let mut websites = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let project_id = entry.file_name().to_string_lossy().into_owned();
            if !self.has_index(&project_id) {
                continue;
            }
            let metadata = entry.metadata()?;
            let modified = to_datetime(metadata.modified()?);
            // creation time is unavailable on some filesystems
            let created = metadata.created().map(to_datetime).unwrap_or(modified);
            websites.push(WebsiteInfo {
                project_id,
                created,
                modified,
            });
        }
        websites.sort_by(|a, b| b.created.cmp(&a.created));
        Ok(websites)
    }
}

/// Preview URL for a project, served under the static site tree
pub fn preview_url(public_base: &str, project_id: &str) -> String {
    format!("{}/sites/{}/", public_base.trim_end_matches('/'), project_id)
}

fn to_datetime(time: SystemTime) -> DateTime<Utc> {
    DateTime::<Utc>::from(time)
}
