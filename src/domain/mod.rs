//! Domain types for Ever-Thinker
//!
//! This module contains the core domain types:
//! - Improvement: a candidate change with impact/effort classification
//! - Task: the completed unit of work a cycle analyzes
//! - FeedbackOutcome: accept/reject/no-response answers to a proposal
//! - CyclePhase / CycleResult: the controller's state and what it reports

pub mod cycle;
pub mod improvement;
pub mod outcome;
pub mod task;

pub use cycle::{CyclePhase, CycleResult, ProposalReport, SkipReason};
pub use improvement::{Effort, Impact, Improvement};
pub use outcome::{FeedbackOutcome, FeedbackResolution};
pub use task::Task;
