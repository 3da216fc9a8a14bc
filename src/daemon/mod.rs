//! Host loop - the long-running process around the cycle controller
//!
//! The host is what turns the controller's single entry point into a service:
//! - Follows the task feed and reports completions
//! - Applies the project-change budget reset
//! - Attempts a cycle every tick

pub mod tick;

pub use tick::*;
