//! Analyzer interface

use async_trait::async_trait;

use crate::domain::{Improvement, Task};
use crate::error::Result;

/// One independent inspection over a completed task.
///
/// The orchestrator treats every analyzer uniformly through this trait and
/// never inspects the concrete type.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Stable identity used in logs and as `analyzer_origin`
    fn name(&self) -> &str;

    /// Inspect the task and return zero or more candidate improvements.
    ///
    /// Levels must come from the closed `Impact`/`Effort` sets and every
    /// improvement needs a non-empty category.
    async fn analyze(&self, task: &Task) -> Result<Vec<Improvement>>;
}
