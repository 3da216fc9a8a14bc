//! Orchestration of improvement cycles.

mod controller;

pub use controller::{ControllerConfig, CycleController};
