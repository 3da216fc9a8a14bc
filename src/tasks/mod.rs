//! Completed-task sources for task selection.
//!
//! - **TaskSource**: the seam the orchestrator falls back to
//! - **RecentTasks**: bounded in-memory history
//! - **TaskFeed**: tails the JSONL file external tools append to

mod feed;
mod source;

pub use feed::TaskFeed;
pub use source::{RecentTasks, TaskSource};
