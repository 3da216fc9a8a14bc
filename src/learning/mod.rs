//! Learning system seam.
//!
//! The orchestrator only needs two things from learning: an acceptance rate
//! per category when scoring, and a place to record how each proposal was
//! answered. Both go through [`AcceptanceRateOracle`].
//!
//! - **OutcomeStore**: append-only JSONL persistence under the data dir
//! - **MemoryOracle**: in-memory tallies for dry runs and tests

mod memory;
mod store;
mod traits;

pub use memory::MemoryOracle;
pub use store::{OutcomeRecord, OutcomeStore};
pub use traits::{AcceptanceRateOracle, CategoryStats};
