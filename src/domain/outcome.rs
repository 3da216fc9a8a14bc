//! Feedback outcome types.
//!
//! This module defines how a submitted proposal was answered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Outcome recorded against an improvement category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackOutcome {
    /// Reviewer accepted the proposal
    Accepted,
    /// Reviewer rejected the proposal
    Rejected,
    /// No answer arrived before the feedback timeout
    NoResponse,
}

impl FeedbackOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackOutcome::Accepted => "accepted",
            FeedbackOutcome::Rejected => "rejected",
            FeedbackOutcome::NoResponse => "no_response",
        }
    }
}

impl fmt::Display for FeedbackOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How the await-feedback step of a cycle ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackResolution {
    /// A correlated accept/reject answer arrived
    Received(FeedbackOutcome),
    /// The timeout elapsed; recorded as `NoResponse`
    TimedOut,
    /// Shutdown interrupted the wait; nothing was recorded
    Cancelled,
}

impl FeedbackResolution {
    /// The outcome to record in the learning store, if any.
    pub fn recorded_outcome(&self) -> Option<FeedbackOutcome> {
        match self {
            FeedbackResolution::Received(outcome) => Some(*outcome),
            FeedbackResolution::TimedOut => Some(FeedbackOutcome::NoResponse),
            FeedbackResolution::Cancelled => None,
        }
    }
}
