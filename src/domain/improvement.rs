//! Improvement records produced by analyzers.
//!
//! An improvement carries two closed classifications (impact and effort) that
//! drive scoring, plus provenance metadata that scoring never looks at.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{EverThinkerError, Result};

/// Severity/value classification set by the originating analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Impact {
    Critical,
    High,
    Medium,
    Low,
}

impl Impact {
    pub const ALL: [Impact; 4] = [Impact::Critical, Impact::High, Impact::Medium, Impact::Low];

    pub fn as_str(&self) -> &'static str {
        match self {
            Impact::Critical => "critical",
            Impact::High => "high",
            Impact::Medium => "medium",
            Impact::Low => "low",
        }
    }
}

impl fmt::Display for Impact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Impact {
    type Err = EverThinkerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "critical" => Ok(Impact::Critical),
            "high" => Ok(Impact::High),
            "medium" => Ok(Impact::Medium),
            "low" => Ok(Impact::Low),
            other => Err(EverThinkerError::ContractViolation {
                analyzer: "unknown".to_string(),
                reason: format!("unrecognized impact level '{}'", other),
            }),
        }
    }
}

/// Estimated implementation cost set by the originating analyzer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effort {
    Trivial,
    Small,
    Medium,
    Large,
}

impl Effort {
    pub const ALL: [Effort; 4] = [Effort::Trivial, Effort::Small, Effort::Medium, Effort::Large];

    pub fn as_str(&self) -> &'static str {
        match self {
            Effort::Trivial => "trivial",
            Effort::Small => "small",
            Effort::Medium => "medium",
            Effort::Large => "large",
        }
    }
}

impl fmt::Display for Effort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Effort {
    type Err = EverThinkerError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trivial" => Ok(Effort::Trivial),
            "small" => Ok(Effort::Small),
            "medium" => Ok(Effort::Medium),
            "large" => Ok(Effort::Large),
            other => Err(EverThinkerError::ContractViolation {
                analyzer: "unknown".to_string(),
                reason: format!("unrecognized effort level '{}'", other),
            }),
        }
    }
}

/// A candidate change proposal.
///
/// Immutable after creation except for `score`, which the scorer attaches
/// once per cycle. Improvements never outlive the cycle that produced them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Improvement {
    /// Grouping key for acceptance-rate lookup, e.g. `code_quality.unwrap`
    pub category: String,
    pub impact: Impact,
    pub effort: Effort,
    pub description: String,
    /// File (and optionally line) the improvement refers to
    pub target_location: Option<String>,
    /// Name of the analyzer that produced this improvement
    pub analyzer_origin: String,
    /// Absent until scored
    pub score: Option<f64>,
}

impl Improvement {
    /// Create an unscored improvement.
    pub fn new(
        analyzer_origin: impl Into<String>,
        category: impl Into<String>,
        impact: Impact,
        effort: Effort,
        description: impl Into<String>,
    ) -> Self {
        Self {
            category: category.into(),
            impact,
            effort,
            description: description.into(),
            target_location: None,
            analyzer_origin: analyzer_origin.into(),
            score: None,
        }
    }

    /// Set the target location.
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.target_location = Some(location.into());
        self
    }

    /// Attach a computed score.
    pub fn scored(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }

    /// Check the fields every analyzer must fill in.
    pub fn check_contract(&self) -> Result<()> {
        if self.analyzer_origin.trim().is_empty() {
            return Err(EverThinkerError::ContractViolation {
                analyzer: "unknown".to_string(),
                reason: format!("improvement '{}' has no analyzer origin", self.description),
            });
        }
        if self.category.trim().is_empty() {
            return Err(EverThinkerError::ContractViolation {
                analyzer: self.analyzer_origin.clone(),
                reason: format!("improvement '{}' has an empty category", self.description),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_parse_all_levels() {
        for impact in Impact::ALL {
            assert_eq!(impact.as_str().parse::<Impact>().unwrap(), impact);
        }
    }

    #[test]
    fn test_effort_parse_all_levels() {
        for effort in Effort::ALL {
            assert_eq!(effort.as_str().parse::<Effort>().unwrap(), effort);
        }
    }

    #[test]
    fn test_unknown_level_is_contract_violation() {
        let err = "urgent".parse::<Impact>().unwrap_err();
        assert!(matches!(err, EverThinkerError::ContractViolation { .. }));
        assert!(err.to_string().contains("urgent"));

        let err = "huge".parse::<Effort>().unwrap_err();
        assert!(matches!(err, EverThinkerError::ContractViolation { .. }));
    }

    #[test]
    fn test_serde_rejects_unknown_level() {
        let json = r#"{"category":"x","impact":"urgent","effort":"small","description":"d",
            "target_location":null,"analyzer_origin":"a","score":null}"#;
        assert!(serde_json::from_str::<Improvement>(json).is_err());
    }

    #[test]
    fn test_new_is_unscored() {
        let imp = Improvement::new("testing", "testing.missing", Impact::High, Effort::Small, "add tests");
        assert!(imp.score.is_none());
        assert!(imp.target_location.is_none());
        assert_eq!(imp.analyzer_origin, "testing");
    }

    #[test]
    fn test_at_and_scored() {
        let imp = Improvement::new("ux", "ux.panic", Impact::Low, Effort::Trivial, "d")
            .at("src/main.rs:10")
            .scored(6.0);
        assert_eq!(imp.target_location.as_deref(), Some("src/main.rs:10"));
        assert_eq!(imp.score, Some(6.0));
    }

    #[test]
    fn test_check_contract() {
        let ok = Improvement::new("ux", "ux.panic", Impact::Low, Effort::Trivial, "d");
        assert!(ok.check_contract().is_ok());

        let no_category = Improvement::new("ux", "  ", Impact::Low, Effort::Trivial, "d");
        match no_category.check_contract() {
            Err(EverThinkerError::ContractViolation { analyzer, .. }) => assert_eq!(analyzer, "ux"),
            other => panic!("expected contract violation, got {:?}", other),
        }

        let no_origin = Improvement::new("", "ux.panic", Impact::Low, Effort::Trivial, "d");
        assert!(no_origin.check_contract().is_err());
    }
}
