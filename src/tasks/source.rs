use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::Task;
use crate::error::{EverThinkerError, Result};

/// Where the orchestrator finds the task to analyze when no completion was
/// signalled since the last cycle.
#[async_trait]
pub trait TaskSource: Send + Sync {
    async fn most_recent_completed_task(&self) -> Result<Option<Task>>;
}

/// Bounded history of completed tasks, newest last.
#[derive(Debug)]
pub struct RecentTasks {
    capacity: usize,
    tasks: Mutex<VecDeque<Task>>,
}

impl RecentTasks {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            tasks: Mutex::new(VecDeque::with_capacity(capacity)),
        }
    }

    /// Record a completed task, evicting the oldest past capacity.
    pub fn push(&self, task: Task) {
        match self.tasks.lock() {
            Ok(mut tasks) => {
                tasks.push_back(task);
                while tasks.len() > self.capacity {
                    tasks.pop_front();
                }
            }
            Err(e) => log::error!("Task history lock poisoned: {}", e),
        }
    }

    pub fn latest(&self) -> Option<Task> {
        self.tasks.lock().ok().and_then(|t| t.back().cloned())
    }

    /// Newest first.
    pub fn snapshot(&self) -> Vec<Task> {
        self.tasks
            .lock()
            .map(|t| t.iter().rev().cloned().collect())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tasks.lock().map(|t| t.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl TaskSource for RecentTasks {
    async fn most_recent_completed_task(&self) -> Result<Option<Task>> {
        let tasks = self
            .tasks
            .lock()
            .map_err(|e| EverThinkerError::Storage(format!("task history lock poisoned: {}", e)))?;
        Ok(tasks.back().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_empty_history() {
        let recent = RecentTasks::new(4);
        assert!(recent.is_empty());
        assert!(recent.most_recent_completed_task().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_latest_wins() {
        let recent = RecentTasks::new(4);
        recent.push(Task::new("t-1", "/a"));
        recent.push(Task::new("t-2", "/b"));
        let task = recent.most_recent_completed_task().await.unwrap().unwrap();
        assert_eq!(task.id, "t-2");
    }

    #[test]
    fn test_capacity_evicts_oldest() {
        let recent = RecentTasks::new(2);
        for i in 0..5 {
            recent.push(Task::new(format!("t-{}", i), "/repo"));
        }
        let ids: Vec<_> = recent.snapshot().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["t-4", "t-3"]);
    }

    #[test]
    fn test_zero_capacity_keeps_one() {
        let recent = RecentTasks::new(0);
        recent.push(Task::new("t-1", "/repo"));
        recent.push(Task::new("t-2", "/repo"));
        assert_eq!(recent.len(), 1);
        assert_eq!(recent.latest().unwrap().id, "t-2");
    }
}
