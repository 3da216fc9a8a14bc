use async_trait::async_trait;

use super::{SourceFile, load_sources};
use crate::analysis::Analyzer;
use crate::domain::{Effort, Impact, Improvement, Task};
use crate::error::Result;

/// Flags user-facing failure paths that leave the user without context.
pub struct UxAnalyzer {
    max_files: usize,
}

impl UxAnalyzer {
    pub const NAME: &'static str = "ux";

    pub fn new(max_files: usize) -> Self {
        Self { max_files }
    }

    pub fn inspect(file: &SourceFile) -> Vec<Improvement> {
        let mut found = Vec::new();
        let user_facing = file.display.ends_with("main.rs") || file.display.contains("cli");

        for (line_no, line) in file.production_lines() {
            let trimmed = line.trim_start();

            if user_facing && trimmed.starts_with("panic!(") {
                found.push(
                    Improvement::new(
                        Self::NAME,
                        "ux.panic",
                        Impact::High,
                        Effort::Small,
                        "panic! on a user-facing path; report the error and exit cleanly",
                    )
                    .at(file.location(line_no)),
                );
            }

            if trimmed.starts_with("eprintln!(") && Self::is_bare_message(trimmed) {
                found.push(
                    Improvement::new(
                        Self::NAME,
                        "ux.bare_error_message",
                        Impact::Medium,
                        Effort::Trivial,
                        "error message without context; include what failed and how to fix it",
                    )
                    .at(file.location(line_no)),
                );
            }
        }

        found
    }

    /// A message is bare when it is a short literal with no interpolation.
    fn is_bare_message(line: &str) -> bool {
        let Some(start) = line.find('"') else {
            return false;
        };
        let Some(len) = line[start + 1..].find('"') else {
            return false;
        };
        let message = &line[start + 1..start + 1 + len];
        !message.contains('{') && message.split_whitespace().count() <= 2
    }
}

#[async_trait]
impl Analyzer for UxAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn analyze(&self, task: &Task) -> Result<Vec<Improvement>> {
        let sources = load_sources(task, self.max_files).await?;
        Ok(sources.iter().flat_map(Self::inspect).collect())
    }
}
