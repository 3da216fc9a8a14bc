use async_trait::async_trait;

use super::{SourceFile, load_sources};
use crate::analysis::Analyzer;
use crate::domain::{Effort, Impact, Improvement, Task};
use crate::error::Result;

/// Flags source files without tests and tests that never run.
pub struct TestingAnalyzer {
    max_files: usize,
}

impl TestingAnalyzer {
    pub const NAME: &'static str = "testing";

    pub fn new(max_files: usize) -> Self {
        Self { max_files }
    }

    pub fn inspect(file: &SourceFile) -> Vec<Improvement> {
        let mut found = Vec::new();
        let has_logic = file.content.contains("fn ");
        let is_entry = file.display.ends_with("main.rs") || file.display.ends_with("mod.rs");
        let lives_in_tests_dir = file.display.starts_with("tests/") || file.display.contains("/tests/");
        let has_tests = file.content.contains("#[test]") || file.content.contains("#[tokio::test");

        if has_logic && !is_entry && !lives_in_tests_dir && !has_tests {
            found.push(
                Improvement::new(
                    Self::NAME,
                    "testing.missing_tests",
                    Impact::High,
                    Effort::Medium,
                    format!("{} has no unit tests", file.display),
                )
                .at(file.display.clone()),
            );
        }

        for (index, line) in file.content.lines().enumerate() {
            if line.trim_start().starts_with("#[ignore") {
                found.push(
                    Improvement::new(
                        Self::NAME,
                        "testing.ignored_test",
                        Impact::Medium,
                        Effort::Small,
                        "ignored test; fix it or delete it",
                    )
                    .at(file.location(index + 1)),
                );
            }
        }

        found
    }
}

#[async_trait]
impl Analyzer for TestingAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn analyze(&self, task: &Task) -> Result<Vec<Improvement>> {
        let sources = load_sources(task, self.max_files).await?;
        Ok(sources.iter().flat_map(Self::inspect).collect())
    }
}
