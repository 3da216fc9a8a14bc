use async_trait::async_trait;

use super::{SourceFile, load_sources};
use crate::analysis::Analyzer;
use crate::domain::{Effort, Impact, Improvement, Task};
use crate::error::Result;

/// Flags allocation and blocking patterns on hot paths.
pub struct PerformanceAnalyzer {
    max_files: usize,
}

impl PerformanceAnalyzer {
    pub const NAME: &'static str = "performance";

    pub fn new(max_files: usize) -> Self {
        Self { max_files }
    }

    pub fn inspect(file: &SourceFile) -> Vec<Improvement> {
        let mut found = Vec::new();
        let is_async = file.content.contains("async fn");
        let mut loop_depth: usize = 0;

        for (line_no, line) in file.production_lines() {
            let trimmed = line.trim_start();

            if trimmed.starts_with("for ") || trimmed.starts_with("while ") || trimmed.starts_with("loop ") {
                loop_depth += 1;
            } else if trimmed == "}" && loop_depth > 0 && line.len() - trimmed.len() <= 8 {
                loop_depth -= 1;
            }

            if loop_depth > 0 && trimmed.contains(".clone()") {
                found.push(
                    Improvement::new(
                        Self::NAME,
                        "performance.clone_in_loop",
                        Impact::Medium,
                        Effort::Small,
                        "clone() inside a loop; borrow or hoist the clone out of the loop",
                    )
                    .at(file.location(line_no)),
                );
            }

            if is_async && trimmed.contains("std::thread::sleep") {
                found.push(
                    Improvement::new(
                        Self::NAME,
                        "performance.blocking_sleep",
                        Impact::High,
                        Effort::Trivial,
                        "std::thread::sleep blocks the async runtime; use tokio::time::sleep",
                    )
                    .at(file.location(line_no)),
                );
            }

            if trimmed.contains(".collect::<Vec<") && trimmed.contains(".iter()") {
                found.push(
                    Improvement::new(
                        Self::NAME,
                        "performance.collect_then_iter",
                        Impact::Low,
                        Effort::Trivial,
                        "collect into a Vec only to iterate again; chain the iterator instead",
                    )
                    .at(file.location(line_no)),
                );
            }
        }

        found
    }
}

#[async_trait]
impl Analyzer for PerformanceAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn analyze(&self, task: &Task) -> Result<Vec<Improvement>> {
        let sources = load_sources(task, self.max_files).await?;
        Ok(sources.iter().flat_map(Self::inspect).collect())
    }
}
