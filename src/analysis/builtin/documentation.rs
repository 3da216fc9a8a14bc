use async_trait::async_trait;

use super::{SourceFile, load_sources};
use crate::analysis::Analyzer;
use crate::domain::{Effort, Impact, Improvement, Task};
use crate::error::Result;

const PUBLIC_ITEMS: [&str; 6] = ["pub fn ", "pub async fn ", "pub struct ", "pub enum ", "pub trait ", "pub type "];

/// Flags missing module docs and undocumented public items.
pub struct DocumentationAnalyzer {
    max_files: usize,
}

impl DocumentationAnalyzer {
    pub const NAME: &'static str = "documentation";

    pub fn new(max_files: usize) -> Self {
        Self { max_files }
    }

    pub fn inspect(file: &SourceFile) -> Vec<Improvement> {
        let mut found = Vec::new();

        let first_code = file.content.lines().map(str::trim).find(|l| !l.is_empty());
        if matches!(first_code, Some(l) if !l.starts_with("//!")) && file.line_count() > 20 {
            found.push(
                Improvement::new(
                    Self::NAME,
                    "documentation.missing_module_doc",
                    Impact::Low,
                    Effort::Trivial,
                    format!("{} has no //! module documentation", file.display),
                )
                .at(file.location(1)),
            );
        }

        let mut previous = "";
        for (line_no, line) in file.production_lines() {
            let trimmed = line.trim_start();
            let is_public = PUBLIC_ITEMS.iter().any(|p| trimmed.starts_with(p));
            let documented = previous.starts_with("///") || previous.starts_with("#[");
            if is_public && !documented {
                let item = trimmed.trim_end_matches('{').trim();
                found.push(
                    Improvement::new(
                        Self::NAME,
                        "documentation.undocumented_pub",
                        Impact::Low,
                        Effort::Trivial,
                        format!("public item without doc comment: `{}`", item),
                    )
                    .at(file.location(line_no)),
                );
            }
            if !trimmed.is_empty() {
                previous = trimmed;
            }
        }

        found
    }
}

#[async_trait]
impl Analyzer for DocumentationAnalyzer {
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
    fn test_undocumented_pub_fn() {
        let file = SourceFile::new("a.rs", "//! Module.\n\npub fn run() {}\n");
        let found = DocumentationAnalyzer::inspect(&file);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].category, "documentation.undocumented_pub");
        assert!(found[0].description.contains("pub fn run()"));
    }

    #[test]
    fn test_documented_items_fine() {
        let file = SourceFile::new("a.rs", "//! Module.\n\n/// Runs.\npub fn run() {}\n\n#[derive(Debug)]\npub struct S;\n");
        assert!(DocumentationAnalyzer::inspect(&file).is_empty());
    }

    #[test]
    fn test_missing_module_doc_on_larger_file() {
        let mut content = String::from("use std::fmt;\n");
        for i in 0..25 {
            content.push_str(&format!("fn f{}() {{}}\n", i));
        }
        let file = SourceFile::new("big.rs", content);
        let found = DocumentationAnalyzer::inspect(&file);
        assert!(found.iter().any(|i| i.category == "documentation.missing_module_doc"));
    }

    #[test]
    fn test_small_file_needs_no_module_doc() {
        let file = SourceFile::new("small.rs", "fn f() {}\n");
        assert!(DocumentationAnalyzer::inspect(&file).is_empty());
    }
}
