//! Cycle phases and the result reported to the host.

use std::fmt;

use super::improvement::Improvement;
use super::outcome::FeedbackResolution;

/// Phase of the cycle controller's state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    TaskSelection,
    Analyzing,
    Scoring,
    ProposalPending,
    AwaitingFeedback,
    Updating,
    /// Budget exhausted; only a reset leaves this phase
    Halted,
}

impl CyclePhase {
    /// A cycle is in flight in every phase except `Idle` and `Halted`.
    pub fn is_active(&self) -> bool {
        !matches!(self, CyclePhase::Idle | CyclePhase::Halted)
    }

    /// Reset is only valid while no cycle is in flight.
    pub fn can_reset(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::TaskSelection => "task_selection",
            CyclePhase::Analyzing => "analyzing",
            CyclePhase::Scoring => "scoring",
            CyclePhase::ProposalPending => "proposal_pending",
            CyclePhase::AwaitingFeedback => "awaiting_feedback",
            CyclePhase::Updating => "updating",
            CyclePhase::Halted => "halted",
        };
        write!(f, "{}", name)
    }
}

/// Why a cycle attempt ended without a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Task completion observed within the quiet window
    NotIdle,
    /// No completed task to analyze
    NoTask,
    /// Fan-out produced nothing (all empty or all failed)
    NoImprovements,
    /// Another cycle is already running on this controller
    CycleInFlight,
    /// The feedback channel refused the proposal
    SubmissionFailed,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SkipReason::NotIdle => "not idle",
            SkipReason::NoTask => "no task",
            SkipReason::NoImprovements => "no improvements",
            SkipReason::CycleInFlight => "cycle in flight",
            SkipReason::SubmissionFailed => "submission failed",
        };
        write!(f, "{}", reason)
    }
}

/// A proposal that was submitted during a cycle.
#[derive(Debug, Clone)]
pub struct ProposalReport {
    pub proposal_id: String,
    pub improvement: Improvement,
    pub resolution: FeedbackResolution,
}

/// What one call to `run_cycle_if_idle` did.
#[derive(Debug, Clone)]
pub enum CycleResult {
    Proposed(ProposalReport),
    Skipped(SkipReason),
    /// Budget reached; no cycle was started
    Halted,
}

impl CycleResult {
    pub fn is_proposed(&self) -> bool {
        matches!(self, CycleResult::Proposed(_))
    }

    pub fn is_halted(&self) -> bool {
        matches!(self, CycleResult::Halted)
    }

    pub fn skip_reason(&self) -> Option<SkipReason> {
        match self {
            CycleResult::Skipped(reason) => Some(*reason),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_activity() {
        assert!(!CyclePhase::Idle.is_active());
        assert!(!CyclePhase::Halted.is_active());
        assert!(CyclePhase::Analyzing.is_active());
        assert!(CyclePhase::AwaitingFeedback.is_active());
        assert!(CyclePhase::Halted.can_reset());
        assert!(!CyclePhase::Scoring.can_reset());
    }

    #[test]
    fn test_phase_display() {
        assert_eq!(CyclePhase::AwaitingFeedback.to_string(), "awaiting_feedback");
    }

    #[test]
    fn test_skip_reasons_are_distinct_from_halted() {
        let skipped = CycleResult::Skipped(SkipReason::NotIdle);
        assert_eq!(skipped.skip_reason(), Some(SkipReason::NotIdle));
        assert!(!skipped.is_halted());
        assert!(CycleResult::Halted.is_halted());
        assert_eq!(CycleResult::Halted.skip_reason(), None);
    }
}
