use async_trait::async_trait;

use super::{SourceFile, load_sources};
use crate::analysis::Analyzer;
use crate::domain::{Effort, Impact, Improvement, Task};
use crate::error::Result;

/// Files above this many lines get a split suggestion.
const LARGE_FILE_LINES: usize = 800;
/// Modules declaring more submodules than this get a regroup suggestion.
const WIDE_MODULE_CHILDREN: usize = 12;

/// Flags oversized files and overly wide module trees.
pub struct ArchitectureAnalyzer {
    max_files: usize,
}

impl ArchitectureAnalyzer {
    pub const NAME: &'static str = "architecture";

    pub fn new(max_files: usize) -> Self {
        Self { max_files }
    }

    pub fn inspect(file: &SourceFile) -> Vec<Improvement> {
        let mut found = Vec::new();

        let lines = file.line_count();
        if lines > LARGE_FILE_LINES {
            found.push(
                Improvement::new(
                    Self::NAME,
                    "architecture.large_file",
                    Impact::Medium,
                    Effort::Large,
                    format!("{} has {} lines; split it into focused modules", file.display, lines),
                )
                .at(file.display.clone()),
            );
        }

        let children = file
            .content
            .lines()
            .map(str::trim_start)
            .filter(|l| l.starts_with("pub mod ") || l.starts_with("mod "))
            .filter(|l| l.ends_with(';'))
            .count();
        if children > WIDE_MODULE_CHILDREN {
            found.push(
                Improvement::new(
                    Self::NAME,
                    "architecture.wide_module",
                    Impact::Low,
                    Effort::Large,
                    format!("{} declares {} submodules; group related ones", file.display, children),
                )
                .at(file.display.clone()),
            );
        }

        found
    }
}

#[async_trait]
impl Analyzer for ArchitectureAnalyzer {
    fn name(&self) -> &str {
        Self::NAME
    }

    async fn analyze(&self, task: &Task) -> Result<Vec<Improvement>> {
        let sources = load_sources(task, self.max_files).await?;
        Ok(sources.iter().flat_map(Self::inspect).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_large_file() {
        let file = SourceFile::new("big.rs", "fn x() {}\n".repeat(LARGE_FILE_LINES + 1));
        let found = ArchitectureAnalyzer::inspect(&file);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, "architecture.large_file");
        assert_eq!(found[0].effort, Effort::Large);
    }

    #[test]
    fn test_wide_module() {
        let content: String = (0..15).map(|i| format!("pub mod m{};\n", i)).collect();
        let found = ArchitectureAnalyzer::inspect(&SourceFile::new("lib.rs", content));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, "architecture.wide_module");
    }

    #[test]
    fn test_inline_modules_not_counted() {
        let content: String = (0..15).map(|i| format!("mod m{} {{}}\n", i)).collect();
        assert!(ArchitectureAnalyzer::inspect(&SourceFile::new("lib.rs", content)).is_empty());
    }
}
