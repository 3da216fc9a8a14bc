//! Priority scoring for improvements.
//!
//! The formula is fixed: `impact + effort + acceptance_rate * 5`. Scoring never
//! fails; an unavailable oracle degrades to a zero acceptance rate.

mod priority;

pub use priority::{
    ACCEPTANCE_WEIGHT, EFFORT_LARGE, EFFORT_MEDIUM, EFFORT_SMALL, EFFORT_TRIVIAL, FALLBACK_ACCEPTANCE_RATE,
    IMPACT_CRITICAL, IMPACT_HIGH, IMPACT_LOW, IMPACT_MEDIUM, acceptance_rate, effort_weight, impact_weight, rank, score,
    score_with_oracle,
};
