//! Acceptance-rate oracle interface.

use async_trait::async_trait;

use crate::domain::FeedbackOutcome;
use crate::error::Result;

/// Historical acceptance signal keyed by improvement category.
///
/// Every call is a single atomic operation against the backing store; no
/// transaction spans two calls.
#[async_trait]
pub trait AcceptanceRateOracle: Send + Sync {
    /// Acceptance probability in [0, 1] for a category.
    ///
    /// `Ok(None)` means the category has no accept/reject history yet.
    /// Failures surface as `EverThinkerError::OracleUnavailable`.
    async fn get_rate(&self, category: &str) -> Result<Option<f64>>;

    /// Record how a proposal in this category was answered.
    async fn record_outcome(&self, category: &str, outcome: FeedbackOutcome) -> Result<()>;

    /// Record an outcome together with the proposal it answers. Stores that
    /// keep per-proposal records override this; the rest only tally.
    async fn record_proposal_outcome(&self, category: &str, proposal_id: &str, outcome: FeedbackOutcome) -> Result<()> {
        log::debug!("Recording {} for category={} proposal={}", outcome, category, proposal_id);
        self.record_outcome(category, outcome).await
    }
}

/// Accepted / rejected / no-response counts for one category.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CategoryStats {
    pub accepted: u64,
    pub rejected: u64,
    pub no_response: u64,
}

impl CategoryStats {
    pub fn record(&mut self, outcome: FeedbackOutcome) {
        match outcome {
            FeedbackOutcome::Accepted => self.accepted += 1,
            FeedbackOutcome::Rejected => self.rejected += 1,
            FeedbackOutcome::NoResponse => self.no_response += 1,
        }
    }

    /// Accepted over answered. Unanswered proposals carry no signal.
    pub fn acceptance_rate(&self) -> Option<f64> {
        let answered = self.accepted + self.rejected;
        if answered == 0 {
            None
        } else {
            Some(self.accepted as f64 / answered as f64)
        }
    }

    pub fn total(&self) -> u64 {
        self.accepted + self.rejected + self.no_response
    }
}
