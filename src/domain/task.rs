//! Completed units of work selected for analysis.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::id::now_ms;

/// A completed task. Analyzers read it; nothing in the core mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Unique task identifier
    pub id: String,
    /// Project the task belongs to; a change of project resets the cycle budget
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub description: String,
    /// Root directory the task's files are relative to
    pub root: PathBuf,
    /// Files touched by the task (empty = whole root)
    #[serde(default)]
    pub files: Vec<PathBuf>,
    /// When the task completed (Unix ms)
    #[serde(default = "now_ms")]
    pub completed_at_ms: u64,
}

impl Task {
    /// Create a task over a root directory.
    pub fn new(id: impl Into<String>, root: impl AsRef<Path>) -> Self {
        Self {
            id: id.into(),
            project: String::new(),
            description: String::new(),
            root: root.as_ref().to_path_buf(),
            files: Vec::new(),
            completed_at_ms: now_ms(),
        }
    }

    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    /// Resolve a task file against the root.
    pub fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.root.join(file)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_builder() {
        let task = Task::new("t-1", "/repo")
            .with_project("moderator")
            .with_description("add login")
            .with_files(vec![PathBuf::from("src/lib.rs")]);
        assert_eq!(task.id, "t-1");
        assert_eq!(task.project, "moderator");
        assert_eq!(task.files.len(), 1);
    }

    #[test]
    fn test_resolve_relative_and_absolute() {
        let task = Task::new("t-1", "/repo");
        assert_eq!(task.resolve(Path::new("src/lib.rs")), PathBuf::from("/repo/src/lib.rs"));
        assert_eq!(task.resolve(Path::new("/abs/x.rs")), PathBuf::from("/abs/x.rs"));
    }

    #[test]
    fn test_deserialize_minimal_record() {
        let json = r#"{"id":"t-9","root":"/tmp/work"}"#;
        let task: Task = serde_json::from_str(json).unwrap();
        assert_eq!(task.id, "t-9");
        assert!(task.project.is_empty());
        assert!(task.files.is_empty());
        assert!(task.completed_at_ms > 0);
    }
}
