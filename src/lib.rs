//! Ever-thinker - idle-time improvement cycles for completed work
//!
//! When no task has completed for a while, the cycle controller picks the most
//! recently completed task, fans it out to a set of analyzers, scores the
//! findings against historical acceptance rates and proposes the best one for
//! review. The answer feeds back into the acceptance history.

pub mod analysis;
pub mod config;
pub mod daemon;
pub mod domain;
pub mod error;
pub mod feedback;
pub mod id;
pub mod learning;
pub mod orchestrator;
pub mod scoring;
pub mod tasks;

pub use config::Config;
pub use error::{EverThinkerError, Result};
