//! Priority calculation for improvements.
//!
//! Improvements are scored by:
//! - Impact weight (critical=10, high=7, medium=4, low=1)
//! - Effort weight (trivial=5, small=3, medium=1, large=-2)
//! - Acceptance boost (historical acceptance rate * 5)
//!
//! The score domain is [-1, 20].

use crate::domain::{Effort, Impact, Improvement};
use crate::learning::AcceptanceRateOracle;

/// Impact weights. Higher = more valuable.
pub const IMPACT_CRITICAL: f64 = 10.0;
pub const IMPACT_HIGH: f64 = 7.0;
pub const IMPACT_MEDIUM: f64 = 4.0;
pub const IMPACT_LOW: f64 = 1.0;

/// Effort weights. Cheaper work scores higher.
pub const EFFORT_TRIVIAL: f64 = 5.0;
pub const EFFORT_SMALL: f64 = 3.0;
pub const EFFORT_MEDIUM: f64 = 1.0;
pub const EFFORT_LARGE: f64 = -2.0;

/// Multiplier applied to the acceptance rate.
pub const ACCEPTANCE_WEIGHT: f64 = 5.0;

/// Acceptance rate assumed when the oracle has nothing to say.
pub const FALLBACK_ACCEPTANCE_RATE: f64 = 0.0;

pub fn impact_weight(impact: Impact) -> f64 {
    match impact {
        Impact::Critical => IMPACT_CRITICAL,
        Impact::High => IMPACT_HIGH,
        Impact::Medium => IMPACT_MEDIUM,
        Impact::Low => IMPACT_LOW,
    }
}

pub fn effort_weight(effort: Effort) -> f64 {
    match effort {
        Effort::Trivial => EFFORT_TRIVIAL,
        Effort::Small => EFFORT_SMALL,
        Effort::Medium => EFFORT_MEDIUM,
        Effort::Large => EFFORT_LARGE,
    }
}

/// Score an improvement given an acceptance rate in [0, 1].
pub fn score(improvement: &Improvement, acceptance_rate: f64) -> f64 {
    impact_weight(improvement.impact) + effort_weight(improvement.effort) + acceptance_rate * ACCEPTANCE_WEIGHT
}

/// Resolve the acceptance rate for a category, never failing.
///
/// Unavailable oracles, missing history and out-of-range values all fall back
/// to [`FALLBACK_ACCEPTANCE_RATE`].
pub async fn acceptance_rate(oracle: &dyn AcceptanceRateOracle, category: &str) -> f64 {
    match oracle.get_rate(category).await {
        Ok(Some(rate)) if (0.0..=1.0).contains(&rate) => rate,
        Ok(Some(rate)) => {
            log::warn!("Oracle returned out-of-range rate {} for category={}, using fallback", rate, category);
            FALLBACK_ACCEPTANCE_RATE
        }
        Ok(None) => {
            log::debug!("No acceptance history for category={}", category);
            FALLBACK_ACCEPTANCE_RATE
        }
        Err(e) => {
            log::warn!("Acceptance rate unavailable for category={}: {}", category, e);
            FALLBACK_ACCEPTANCE_RATE
        }
    }
}

/// Score an improvement using the oracle and attach the score.
pub async fn score_with_oracle(improvement: Improvement, oracle: &dyn AcceptanceRateOracle) -> Improvement {
    let rate = acceptance_rate(oracle, &improvement.category).await;
    let value = score(&improvement, rate);
    improvement.scored(value)
}

/// Sort scored improvements by descending score.
///
/// The sort is stable, so equal scores keep the order they arrived in.
/// Unscored improvements sink to the bottom.
pub fn rank(mut improvements: Vec<Improvement>) -> Vec<Improvement> {
    improvements.sort_by(|a, b| {
        let a = a.score.unwrap_or(f64::NEG_INFINITY);
        let b = b.score.unwrap_or(f64::NEG_INFINITY);
        b.total_cmp(&a)
    });
    improvements
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::learning::MemoryOracle;

    fn improvement(impact: Impact, effort: Effort) -> Improvement {
        Improvement::new("test", "test.rule", impact, effort, "desc")
    }

    #[test]
    fn test_weights() {
        assert_eq!(impact_weight(Impact::Critical), 10.0);
        assert_eq!(impact_weight(Impact::High), 7.0);
        assert_eq!(impact_weight(Impact::Medium), 4.0);
        assert_eq!(impact_weight(Impact::Low), 1.0);
        assert_eq!(effort_weight(Effort::Trivial), 5.0);
        assert_eq!(effort_weight(Effort::Small), 3.0);
        assert_eq!(effort_weight(Effort::Medium), 1.0);
        assert_eq!(effort_weight(Effort::Large), -2.0);
    }

    #[test]
    fn test_score_closed_form_table() {
        let impacts = [(Impact::Critical, 10.0), (Impact::High, 7.0), (Impact::Medium, 4.0), (Impact::Low, 1.0)];
        let efforts = [(Effort::Trivial, 5.0), (Effort::Small, 3.0), (Effort::Medium, 1.0), (Effort::Large, -2.0)];
        let rates = [0.0, 0.5, 1.0];

        let mut checked = 0;
        for (impact, iw) in impacts {
            for (effort, ew) in efforts {
                for rate in rates {
                    let expected = iw + ew + rate * 5.0;
                    assert_eq!(score(&improvement(impact, effort), rate), expected, "{impact}/{effort}/{rate}");
                    checked += 1;
                }
            }
        }
        assert_eq!(checked, 48);
    }

    #[test]
    fn test_score_domain_bounds() {
        assert_eq!(score(&improvement(Impact::Low, Effort::Large), 0.0), -1.0);
        assert_eq!(score(&improvement(Impact::Critical, Effort::Trivial), 1.0), 20.0);
    }

    #[tokio::test]
    async fn test_oracle_unavailable_matches_zero_rate() {
        let oracle = MemoryOracle::new().with_rate("test.rule", 0.9);
        oracle.set_unavailable(true);

        let imp = improvement(Impact::High, Effort::Small);
        let expected = score(&imp, 0.0);
        let scored = score_with_oracle(imp, &oracle).await;
        assert_eq!(scored.score, Some(expected));
    }

    #[tokio::test]
    async fn test_score_uses_oracle_rate() {
        let oracle = MemoryOracle::new().with_rate("test.rule", 0.5);
        let scored = score_with_oracle(improvement(Impact::Medium, Effort::Medium), &oracle).await;
        assert_eq!(scored.score, Some(4.0 + 1.0 + 2.5));
    }

    #[tokio::test]
    async fn test_out_of_range_rate_falls_back() {
        let oracle = MemoryOracle::new().with_rate("test.rule", 3.0);
        assert_eq!(acceptance_rate(&oracle, "test.rule").await, 0.0);

        let oracle = MemoryOracle::new().with_rate("test.rule", f64::NAN);
        assert_eq!(acceptance_rate(&oracle, "test.rule").await, 0.0);
    }

    #[tokio::test]
    async fn test_missing_history_falls_back() {
        let oracle = MemoryOracle::new();
        assert_eq!(acceptance_rate(&oracle, "never.seen").await, 0.0);
    }

    #[test]
    fn test_rank_descending() {
        let ranked = rank(vec![
            improvement(Impact::Low, Effort::Large).scored(-1.0),
            improvement(Impact::Critical, Effort::Trivial).scored(15.0),
            improvement(Impact::Medium, Effort::Small).scored(7.0),
        ]);
        let scores: Vec<f64> = ranked.iter().filter_map(|i| i.score).collect();
        assert_eq!(scores, vec![15.0, 7.0, -1.0]);
    }

    #[test]
    fn test_rank_ties_keep_input_order() {
        let first = Improvement::new("a", "a.rule", Impact::High, Effort::Small, "first").scored(10.0);
        let second = Improvement::new("b", "b.rule", Impact::High, Effort::Small, "second").scored(10.0);
        let third = Improvement::new("c", "c.rule", Impact::Medium, Effort::Trivial, "third").scored(9.0);

        let ranked = rank(vec![third, first, second]);
        let order: Vec<&str> = ranked.iter().map(|i| i.description.as_str()).collect();
        assert_eq!(order, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_rank_unscored_last() {
        let ranked = rank(vec![
            improvement(Impact::Low, Effort::Large),
            improvement(Impact::Low, Effort::Large).scored(-1.0),
        ]);
        assert_eq!(ranked[0].score, Some(-1.0));
        assert_eq!(ranked[1].score, None);
    }
}
