//! Correlated request/response feedback for proposals.
//!
//! A proposal is published once and answered later. Each submission registers
//! a oneshot keyed by the proposal id; the answer completes it. Waiting is a
//! plain future, so it occupies no thread, and dropping it drops the
//! registration.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, oneshot};

use crate::domain::{FeedbackOutcome, Improvement};
use crate::error::{EverThinkerError, Result};
use crate::id::generate_proposal_id;

/// Capacity of the queue between the registry and the reviewer.
const PROPOSAL_QUEUE: usize = 100;

/// A proposal as the reviewer side sees it.
#[derive(Debug, Clone)]
pub struct Proposal {
    pub id: String,
    pub improvement: Improvement,
    pub submitted_at: DateTime<Utc>,
}

/// How `await_feedback` returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedbackResponse {
    /// Accepted or rejected by the reviewer
    Answered(FeedbackOutcome),
    TimedOut,
}

/// Channel through which proposals are submitted and answered.
#[async_trait]
pub trait FeedbackChannel: Send + Sync {
    /// Publish a proposal and return its correlation id.
    async fn submit_proposal(&self, improvement: &Improvement) -> Result<String>;

    /// Wait for the answer to a submitted proposal, up to `timeout`.
    async fn await_feedback(&self, proposal_id: &str, timeout: Duration) -> Result<FeedbackResponse>;

    /// Forget a proposal whose wait was abandoned. Late answers are dropped.
    fn withdraw(&self, _proposal_id: &str) {}
}

/// Registered but unanswered proposal.
struct PendingProposal {
    sender: Option<oneshot::Sender<FeedbackOutcome>>,
    receiver: Option<oneshot::Receiver<FeedbackOutcome>>,
}

/// In-process feedback channel.
pub struct FeedbackRegistry {
    pending: Mutex<HashMap<String, PendingProposal>>,
    proposals: mpsc::Sender<Proposal>,
}

impl FeedbackRegistry {
    /// Create a registry and the receiver the reviewer reads proposals from.
    pub fn new() -> (Self, mpsc::Receiver<Proposal>) {
        let (proposals, rx) = mpsc::channel(PROPOSAL_QUEUE);
        (
            Self {
                pending: Mutex::new(HashMap::new()),
                proposals,
            },
            rx,
        )
    }

    /// Answer a proposal. Returns false when the id is unknown, expired or
    /// no longer awaited.
    pub fn resolve(&self, proposal_id: &str, accepted: bool) -> bool {
        let outcome = if accepted {
            FeedbackOutcome::Accepted
        } else {
            FeedbackOutcome::Rejected
        };

        let sender = match self.pending.lock() {
            Ok(mut pending) => pending.get_mut(proposal_id).and_then(|p| p.sender.take()),
            Err(e) => {
                log::error!("Feedback registry lock poisoned: {}", e);
                None
            }
        };

        match sender {
            Some(sender) => {
                if sender.send(outcome).is_err() {
                    log::warn!("Feedback for proposal={} arrived after the wait ended", proposal_id);
                    self.withdraw(proposal_id);
                    return false;
                }
                log::info!("Proposal {} answered: {}", proposal_id, outcome);
                true
            }
            None => {
                log::warn!("Feedback for unknown or expired proposal={}", proposal_id);
                false
            }
        }
    }

    /// Number of proposals still registered.
    pub fn pending_count(&self) -> usize {
        self.pending.lock().map(|p| p.len()).unwrap_or(0)
    }

    fn lock_err(e: impl std::fmt::Display) -> EverThinkerError {
        EverThinkerError::Feedback(format!("registry lock poisoned: {}", e))
    }
}

#[async_trait]
impl FeedbackChannel for FeedbackRegistry {
    async fn submit_proposal(&self, improvement: &Improvement) -> Result<String> {
        let id = generate_proposal_id();
        let (sender, receiver) = oneshot::channel();

        {
            let mut pending = self.pending.lock().map_err(Self::lock_err)?;
            pending.insert(
                id.clone(),
                PendingProposal {
                    sender: Some(sender),
                    receiver: Some(receiver),
                },
            );
        }

        let proposal = Proposal {
            id: id.clone(),
            improvement: improvement.clone(),
            submitted_at: Utc::now(),
        };
        if self.proposals.send(proposal).await.is_err() {
            self.withdraw(&id);
            return Err(EverThinkerError::Feedback("no reviewer is listening for proposals".into()));
        }

        log::info!("Submitted proposal {} ({})", id, improvement.category);
        Ok(id)
    }

    async fn await_feedback(&self, proposal_id: &str, timeout: Duration) -> Result<FeedbackResponse> {
        let receiver = {
            let mut pending = self.pending.lock().map_err(Self::lock_err)?;
            pending.get_mut(proposal_id).and_then(|p| p.receiver.take())
        };
        let Some(receiver) = receiver else {
            return Err(EverThinkerError::Feedback(format!(
                "proposal {} is not awaiting feedback",
                proposal_id
            )));
        };

        let response = match tokio::time::timeout(timeout, receiver).await {
            Ok(Ok(outcome)) => Ok(FeedbackResponse::Answered(outcome)),
            Ok(Err(_)) => Err(EverThinkerError::Feedback(format!(
                "feedback sender for proposal {} was dropped",
                proposal_id
            ))),
            Err(_) => {
                log::warn!("No feedback for proposal={} within {:?}", proposal_id, timeout);
                Ok(FeedbackResponse::TimedOut)
            }
        };

        self.withdraw(proposal_id);
        response
    }

    fn withdraw(&self, proposal_id: &str) {
        if let Ok(mut pending) = self.pending.lock() {
            pending.remove(proposal_id);
        }
    }
}
