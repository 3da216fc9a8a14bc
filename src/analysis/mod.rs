//! Analysis: the analyzer seam and the concurrent fan-out over it.
//!
//! This module provides:
//! - **Analyzer**: one capability every inspection implements
//! - **FanOutExecutor**: runs all analyzers in parallel against one task,
//!   isolating per-analyzer failures
//! - **builtin**: six heuristic analyzers (performance, code quality, testing,
//!   documentation, UX, architecture)

pub mod builtin;
mod fanout;
mod traits;

pub use builtin::{BUILTIN_ANALYZERS, builtin_analyzers};
pub use fanout::{FanOutExecutor, FanOutReport};
pub use traits::Analyzer;
