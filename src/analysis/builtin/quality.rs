use async_trait::async_trait;

use super::{SourceFile, load_sources};
use crate::analysis::Analyzer;
use crate::domain::{Effort, Impact, Improvement, Task};
use crate::error::Result;

/// Functions longer than this many lines are flagged.
const LONG_FUNCTION_LINES: usize = 80;

/// Flags panic points, oversized functions and leftover markers.
pub struct CodeQualityAnalyzer {
    max_files: usize,
}

impl CodeQualityAnalyzer {
    pub const NAME: &'static str = "code_quality";

    pub fn new(max_files: usize) -> Self {
        Self { max_files }
    }

    pub fn inspect(file: &SourceFile) -> Vec<Improvement> {
        let mut found = Vec::new();
        let mut fn_start: Option<(usize, String)> = None;

        for (line_no, line) in file.production_lines() {
            let trimmed = line.trim_start();

            if trimmed.contains(".unwrap()") || trimmed.contains(".expect(") {
                found.push(
                    Improvement::new(
                        Self::NAME,
                        "code_quality.unwrap",
                        Impact::High,
                        Effort::Small,
                        "potential panic point; propagate the error with ? instead",
                    )
                    .at(file.location(line_no)),
                );
            }

            if trimmed.contains("TODO") || trimmed.contains("FIXME") {
                found.push(
                    Improvement::new(
                        Self::NAME,
                        "code_quality.todo",
                        Impact::Low,
                        Effort::Medium,
                        "unresolved TODO/FIXME marker",
                    )
                    .at(file.location(line_no)),
                );
            }

            let is_fn = trimmed.starts_with("fn ") || trimmed.starts_with("pub fn ") || trimmed.starts_with("async fn ")
                || trimmed.starts_with("pub async fn ");
            if is_fn {
                if let Some(long) = Self::close_function(file, fn_start.take(), line_no) {
                    found.push(long);
                }
                let name = trimmed
                    .split("fn ")
                    .nth(1)
                    .and_then(|rest| rest.split(['(', '<']).next())
                    .unwrap_or("?")
                    .to_string();
                fn_start = Some((line_no, name));
            }
        }

        let end = file.test_region_start().unwrap_or_else(|| file.line_count()) + 1;
        if let Some(long) = Self::close_function(file, fn_start, end) {
            found.push(long);
        }

        found
    }

    fn close_function(file: &SourceFile, start: Option<(usize, String)>, next_line: usize) -> Option<Improvement> {
        let (start, name) = start?;
        let length = next_line.saturating_sub(start);
        if length <= LONG_FUNCTION_LINES {
            return None;
        }
        Some(
            Improvement::new(
                Self::NAME,
                "code_quality.long_function",
                Impact::Medium,
                Effort::Medium,
                format!("function `{}` spans {} lines; split it into smaller units", name, length),
            )
            .at(file.location(start)),
        )
    }
}

#[async_trait]
impl Analyzer for CodeQualityAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn analyze(&self, task: &Task) -> Result<Vec<Improvement>> {
        let sources = load_sources(task, self.max_files).await?;
        Ok(sources.iter().flat_map(Self::inspect).collect())
    }
}
