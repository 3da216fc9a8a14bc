//! ID generation utilities for Ever-Thinker
//!
//! Provides functions for generating identifiers for cycles, proposals and
//! outcome records.

use rand::Rng;

/// Get current timestamp in milliseconds since Unix epoch
pub fn now_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Generate a cycle ID
///
/// Format: `cyc-{timestamp_ms}-{random_hex}`
pub fn generate_cycle_id() -> String {
    let random: u16 = rand::rng().random();
    format!("cyc-{}-{:04x}", now_ms(), random)
}

/// Generate a proposal ID used to correlate feedback
///
/// Format: `prop-{timestamp_ms}-{random_hex}`
/// Example: `prop-1738300800123-a1b2c3d4`
pub fn generate_proposal_id() -> String {
    let random: u32 = rand::rng().random();
    format!("prop-{}-{:08x}", now_ms(), random)
}

/// Generate an outcome record ID
///
/// Format: `out-{timestamp_ms}-{random_hex}`
pub fn generate_outcome_id() -> String {
    let random: u32 = rand::rng().random();
    format!("out-{}-{:08x}", now_ms(), random)
}
