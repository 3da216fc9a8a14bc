//! Built-in heuristic analyzers.
//!
//! Each analyzer scans the text of the task's Rust sources and emits
//! improvements categorised as `<analyzer>.<rule>`, so acceptance history is
//! tracked per kind of change.

mod architecture;
mod documentation;
mod performance;
mod quality;
mod testing;
mod ux;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use architecture::ArchitectureAnalyzer;
pub use documentation::DocumentationAnalyzer;
pub use performance::PerformanceAnalyzer;
pub use quality::CodeQualityAnalyzer;
pub use testing::TestingAnalyzer;
pub use ux::UxAnalyzer;

use crate::analysis::Analyzer;
use crate::config::AnalysisConfig;
use crate::domain::Task;
use crate::error::{EverThinkerError, Result};

/// Names of the built-in analyzers, in registration order.
pub const BUILTIN_ANALYZERS: [&str; 6] = [
    PerformanceAnalyzer::NAME,
    CodeQualityAnalyzer::NAME,
    TestingAnalyzer::NAME,
    DocumentationAnalyzer::NAME,
    UxAnalyzer::NAME,
    ArchitectureAnalyzer::NAME,
];

/// Build the enabled built-in analyzers in a fixed order.
///
/// Unknown names are logged and skipped.
pub fn builtin_analyzers(config: &AnalysisConfig) -> Vec<Arc<dyn Analyzer>> {
    for name in &config.enabled {
        if !BUILTIN_ANALYZERS.contains(&name.as_str()) {
            log::warn!("Unknown analyzer '{}' in config, skipping", name);
        }
    }

    let enabled = |name: &str| config.enabled.iter().any(|n| n == name);
    let max_files = config.max_files_per_task;
    let mut analyzers: Vec<Arc<dyn Analyzer>> = Vec::new();

    if enabled(PerformanceAnalyzer::NAME) {
        analyzers.push(Arc::new(PerformanceAnalyzer::new(max_files)));
    }
    if enabled(CodeQualityAnalyzer::NAME) {
        analyzers.push(Arc::new(CodeQualityAnalyzer::new(max_files)));
    }
    if enabled(TestingAnalyzer::NAME) {
        analyzers.push(Arc::new(TestingAnalyzer::new(max_files)));
    }
    if enabled(DocumentationAnalyzer::NAME) {
        analyzers.push(Arc::new(DocumentationAnalyzer::new(max_files)));
    }
    if enabled(UxAnalyzer::NAME) {
        analyzers.push(Arc::new(UxAnalyzer::new(max_files)));
    }
    if enabled(ArchitectureAnalyzer::NAME) {
        analyzers.push(Arc::new(ArchitectureAnalyzer::new(max_files)));
    }

    analyzers
}

/// A source file loaded for inspection.
#[derive(Debug, Clone)]
pub struct SourceFile {
    /// Path relative to the task root when possible
    pub display: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(display: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            display: display.into(),
            content: content.into(),
        }
    }

    /// Location string for a 1-based line number.
    pub fn location(&self, line: usize) -> String {
        format!("{}:{}", self.display, line)
    }

    /// Index of the first line of the `#[cfg(test)]` region, if any.
    pub fn test_region_start(&self) -> Option<usize> {
        self.content.lines().position(|l| l.trim_start().starts_with("#[cfg(test)]"))
    }

    /// Lines outside the test region, with 1-based line numbers.
    pub fn production_lines(&self) -> impl Iterator<Item = (usize, &str)> {
        let end = self.test_region_start().unwrap_or(usize::MAX);
        self.content.lines().enumerate().take(end).map(|(i, l)| (i + 1, l))
    }

    pub fn line_count(&self) -> usize {
        self.content.lines().count()
    }
}

/// Collect the paths a task asks to be analyzed.
///
/// With no explicit files, every `*.rs` under the root is considered.
fn candidate_paths(task: &Task, max_files: usize) -> Result<Vec<PathBuf>> {
    let mut paths: Vec<PathBuf> = if task.files.is_empty() {
        let root = glob::Pattern::escape(&task.root.to_string_lossy());
        let pattern = Path::new(&root).join("**").join("*.rs");
        let pattern = pattern.to_string_lossy();
        glob::glob(&pattern)
            .map_err(|e| EverThinkerError::AnalyzerFailed {
                analyzer: "source-loader".to_string(),
                reason: format!("bad glob pattern {}: {}", pattern, e),
            })?
            .filter_map(|entry| entry.ok())
            .filter(|p| {
                let rel = p.strip_prefix(&task.root).unwrap_or(p);
                !rel.components().any(|c| c.as_os_str() == "target")
            })
            .collect()
    } else {
        task.files
            .iter()
            .map(|f| task.resolve(f))
            .filter(|p| p.extension().is_some_and(|ext| ext == "rs"))
            .collect()
    };

    paths.sort();
    paths.truncate(max_files);
    Ok(paths)
}

fn display_path(root: &Path, path: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).to_string_lossy().to_string()
}

/// Load the task's sources concurrently. Unreadable files are skipped.
pub async fn load_sources(task: &Task, max_files: usize) -> Result<Vec<SourceFile>> {
    let paths = candidate_paths(task, max_files)?;

    let reads = paths.iter().map(|path| async move {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Some(SourceFile::new(display_path(&task.root, path), content)),
            Err(e) => {
                log::debug!("Skipping unreadable source {}: {}", path.display(), e);
                None
            }
        }
    });

    Ok(futures::future::join_all(reads).await.into_iter().flatten().collect())
}
