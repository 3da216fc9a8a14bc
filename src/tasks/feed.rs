use std::fs::{self, File};
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use super::source::{RecentTasks, TaskSource};
use crate::domain::Task;
use crate::error::{EverThinkerError, Result};

const TASKS_FILE: &str = "tasks.jsonl";

/// Tails `tasks.jsonl`, where external tools append one completed task per line.
#[derive(Debug)]
pub struct TaskFeed {
    path: PathBuf,
    /// Byte offset just past the last complete line consumed
    offset: Mutex<u64>,
    history: RecentTasks,
}

impl TaskFeed {
    /// Open the feed under a data directory. Existing lines are loaded into
    /// history but not reported by `poll_new`.
    pub fn open(data_dir: impl AsRef<Path>, history_len: usize) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;

        let feed = Self {
            path: data_dir.join(TASKS_FILE),
            offset: Mutex::new(0),
            history: RecentTasks::new(history_len),
        };
        let backlog = feed.poll_new()?;
        log::debug!("Opened task feed at {} ({} prior tasks)", feed.path.display(), backlog.len());
        Ok(feed)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn history(&self) -> &RecentTasks {
        &self.history
    }

    /// Tasks appended since the last poll, oldest first. A trailing partial
    /// line is left for the next poll.
    pub fn poll_new(&self) -> Result<Vec<Task>> {
        let mut offset = self
            .offset
            .lock()
            .map_err(|e| EverThinkerError::Storage(format!("task feed lock poisoned: {}", e)))?;

        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let mut file = File::open(&self.path)?;
        let len = file.metadata()?.len();
        if len < *offset {
            log::warn!("Task feed {} was truncated; reading from the start", self.path.display());
            *offset = 0;
        }
        if len == *offset {
            return Ok(Vec::new());
        }

        file.seek(SeekFrom::Start(*offset))?;
        let mut buf = Vec::new();
        file.read_to_end(&mut buf)?;

        let Some(end) = buf.iter().rposition(|b| *b == b'\n') else {
            return Ok(Vec::new());
        };
        let complete = &buf[..=end];

        let mut tasks = Vec::new();
        for raw in complete.split(|b| *b == b'\n') {
            let line = match std::str::from_utf8(raw) {
                Ok(line) => line,
                Err(e) => {
                    log::warn!("Skipping non-UTF-8 task line in {}: {}", self.path.display(), e);
                    continue;
                }
            };
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Task>(line) {
                Ok(task) => {
                    self.history.push(task.clone());
                    tasks.push(task);
                }
                Err(e) => log::warn!("Skipping corrupt task line in {}: {}", self.path.display(), e),
            }
        }

        *offset += complete.len() as u64;
        Ok(tasks)
    }
}

#[async_trait]
impl TaskSource for TaskFeed {
    async fn most_recent_completed_task(&self) -> Result<Option<Task>> {
        self.history.most_recent_completed_task().await
    }
}
