//! The cycle controller: idle detection, budget, analysis, proposal and learning.
//!
//! All mutable state (phase, cycle count, last activity) sits behind one
//! mutex that is never held across an await. A cycle claims the controller by
//! moving the phase out of `Idle` inside that critical section; the budget
//! check happens in the same section, so two concurrent attempts can never
//! both pass it.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::analysis::FanOutExecutor;
use crate::config::CycleConfig;
use crate::domain::{CyclePhase, CycleResult, FeedbackResolution, Improvement, ProposalReport, SkipReason, Task};
use crate::error::{EverThinkerError, Result};
use crate::feedback::{FeedbackChannel, FeedbackResponse};
use crate::id::generate_cycle_id;
use crate::learning::AcceptanceRateOracle;
use crate::scoring::{rank, score_with_oracle};
use crate::tasks::TaskSource;

/// Settings the controller reads.
#[derive(Debug, Clone)]
pub struct ControllerConfig {
    pub max_cycles: u32,
    pub idle_quiet_window: Duration,
    pub feedback_timeout: Duration,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self::from(&CycleConfig::default())
    }
}

impl From<&CycleConfig> for ControllerConfig {
    fn from(config: &CycleConfig) -> Self {
        Self {
            max_cycles: config.max_cycles,
            idle_quiet_window: config.idle_quiet_window(),
            feedback_timeout: config.feedback_timeout(),
        }
    }
}

#[derive(Debug)]
struct CycleState {
    phase: CyclePhase,
    cycle_count: u32,
    /// Last observed task completion; `None` means nothing seen yet
    last_activity: Option<Instant>,
    /// Task from the latest completion signal, consumed by the next cycle
    latest_task: Option<Task>,
    /// Task the most recent cycle analyzed
    last_analyzed: Option<String>,
}

/// Outcome of the claim step at the start of an attempt.
enum Claim {
    Start(Option<Task>),
    Finish(CycleResult),
}

/// Returns the controller to `Idle` when a claimed cycle ends, however it ends.
struct ActiveCycle<'a> {
    controller: &'a CycleController,
    cycle_id: String,
}

impl ActiveCycle<'_> {
    fn enter(&self, phase: CyclePhase) {
        if let Ok(mut state) = self.controller.state.lock() {
            log::debug!("Cycle {}: {} -> {}", self.cycle_id, state.phase, phase);
            state.phase = phase;
        }
    }
}

impl Drop for ActiveCycle<'_> {
    fn drop(&mut self) {
        match self.controller.state.lock() {
            Ok(mut state) => {
                if state.phase.is_active() {
                    state.phase = CyclePhase::Idle;
                }
            }
            Err(e) => log::error!("Cycle state lock poisoned while ending {}: {}", self.cycle_id, e),
        }
    }
}

pub struct CycleController {
    config: ControllerConfig,
    executor: FanOutExecutor,
    oracle: Arc<dyn AcceptanceRateOracle>,
    feedback: Arc<dyn FeedbackChannel>,
    tasks: Arc<dyn TaskSource>,
    shutdown: CancellationToken,
    state: Mutex<CycleState>,
}

impl CycleController {
    pub fn new(
        config: ControllerConfig,
        executor: FanOutExecutor,
        oracle: Arc<dyn AcceptanceRateOracle>,
        feedback: Arc<dyn FeedbackChannel>,
        tasks: Arc<dyn TaskSource>,
    ) -> Self {
        Self {
            config,
            executor,
            oracle,
            feedback,
            tasks,
            shutdown: CancellationToken::new(),
            state: Mutex::new(CycleState {
                phase: CyclePhase::Idle,
                cycle_count: 0,
                last_activity: None,
                latest_task: None,
                last_analyzed: None,
            }),
        }
    }

    /// Share a host shutdown token instead of the controller's own.
    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    fn lock_state(&self) -> Result<MutexGuard<'_, CycleState>> {
        self.state
            .lock()
            .map_err(|e| EverThinkerError::InvalidState(format!("cycle state lock poisoned: {}", e)))
    }

    /// Record a task-completion signal. Restarts the quiet window and makes
    /// `task` the next cycle's candidate.
    pub fn observe_completion(&self, task: Task) {
        match self.state.lock() {
            Ok(mut state) => {
                log::debug!("Observed completion of task {}", task.id);
                state.last_activity = Some(Instant::now());
                state.latest_task = Some(task);
            }
            Err(e) => log::error!("Cycle state lock poisoned: {}", e),
        }
    }

    pub fn cycle_count(&self) -> u32 {
        self.state.lock().map(|s| s.cycle_count).unwrap_or(0)
    }

    pub fn phase(&self) -> CyclePhase {
        self.state.lock().map(|s| s.phase).unwrap_or(CyclePhase::Halted)
    }

    /// True when no completion was observed within the quiet window.
    pub fn is_idle(&self) -> bool {
        self.state
            .lock()
            .map(|s| Self::idle_since(&s, self.config.idle_quiet_window))
            .unwrap_or(false)
    }

    fn idle_since(state: &CycleState, window: Duration) -> bool {
        match state.last_activity {
            None => true,
            Some(at) => at.elapsed() >= window,
        }
    }

    /// Zero the budget. Valid only from `Idle` or `Halted`; a halted
    /// controller returns to `Idle`.
    pub fn reset_cycle_count(&self) -> Result<()> {
        let mut state = self.lock_state()?;
        if !state.phase.can_reset() {
            return Err(EverThinkerError::InvalidState(format!(
                "cannot reset cycle count while {}",
                state.phase
            )));
        }
        if state.cycle_count > 0 || state.phase == CyclePhase::Halted {
            log::info!("Cycle count reset from {}", state.cycle_count);
        }
        state.cycle_count = 0;
        state.phase = CyclePhase::Idle;
        Ok(())
    }

    /// Cancel any feedback wait in progress.
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    fn claim(&self) -> Result<Claim> {
        let mut state = self.lock_state()?;

        if state.phase.is_active() {
            return Ok(Claim::Finish(CycleResult::Skipped(SkipReason::CycleInFlight)));
        }
        if !Self::idle_since(&state, self.config.idle_quiet_window) {
            return Ok(Claim::Finish(CycleResult::Skipped(SkipReason::NotIdle)));
        }
        if state.cycle_count >= self.config.max_cycles {
            if state.phase != CyclePhase::Halted {
                log::info!(
                    "Cycle budget reached ({}/{}); halting",
                    state.cycle_count,
                    self.config.max_cycles
                );
            }
            state.phase = CyclePhase::Halted;
            return Ok(Claim::Finish(CycleResult::Halted));
        }

        state.phase = CyclePhase::TaskSelection;
        Ok(Claim::Start(state.latest_task.take()))
    }

    /// Count a submitted proposal.
    fn commit_submission(&self) -> Result<u32> {
        let mut state = self.lock_state()?;
        state.cycle_count += 1;
        Ok(state.cycle_count)
    }

    /// Run one cycle if the system is idle, the budget allows it and no
    /// other cycle is in flight. Only contract violations are returned as
    /// errors; every other condition is reported in the result.
    pub async fn run_cycle_if_idle(&self) -> Result<CycleResult> {
        let signalled = match self.claim()? {
            Claim::Finish(result) => return Ok(result),
            Claim::Start(task) => task,
        };

        let cycle = ActiveCycle {
            controller: self,
            cycle_id: generate_cycle_id(),
        };
        log::info!("Cycle {} started", cycle.cycle_id);

        let Some(task) = self.select_task(signalled).await else {
            log::info!("Cycle {}: no completed task to analyze", cycle.cycle_id);
            return Ok(CycleResult::Skipped(SkipReason::NoTask));
        };

        cycle.enter(CyclePhase::Analyzing);
        let improvements = self.executor.run_all(Arc::new(task)).await?;

        cycle.enter(CyclePhase::Scoring);
        let ranked = self.score_all(improvements).await;
        let Some(top) = ranked.into_iter().next() else {
            log::info!("Cycle {}: analyzers found nothing to propose", cycle.cycle_id);
            return Ok(CycleResult::Skipped(SkipReason::NoImprovements));
        };

        cycle.enter(CyclePhase::ProposalPending);
        let proposal_id = match self.feedback.submit_proposal(&top).await {
            Ok(id) => id,
            Err(e) => {
                log::warn!("Cycle {}: failed to submit {}: {}", cycle.cycle_id, top.category, e);
                return Ok(CycleResult::Skipped(SkipReason::SubmissionFailed));
            }
        };
        let count = self.commit_submission()?;
        log::info!(
            "Cycle {}: proposed {} as {} ({}/{})",
            cycle.cycle_id,
            top.category,
            proposal_id,
            count,
            self.config.max_cycles
        );

        cycle.enter(CyclePhase::AwaitingFeedback);
        let resolution = self.wait_for_feedback(&proposal_id).await;

        cycle.enter(CyclePhase::Updating);
        self.learn(&top, &proposal_id, resolution).await;

        log::info!("Cycle {} finished: {:?}", cycle.cycle_id, resolution);
        Ok(CycleResult::Proposed(ProposalReport {
            proposal_id,
            improvement: top,
            resolution,
        }))
    }

    /// The signalled task, else the newest task from the source unless this
    /// controller already analyzed it.
    async fn select_task(&self, signalled: Option<Task>) -> Option<Task> {
        let from_signal = signalled.is_some();
        let task = match signalled {
            Some(task) => task,
            None => match self.tasks.most_recent_completed_task().await {
                Ok(task) => task?,
                Err(e) => {
                    log::warn!("Task source unavailable: {}", e);
                    return None;
                }
            },
        };

        let mut state = self.state.lock().ok()?;
        if !from_signal && state.last_analyzed.as_deref() == Some(task.id.as_str()) {
            log::debug!("Task {} was already analyzed", task.id);
            return None;
        }
        state.last_analyzed = Some(task.id.clone());
        Some(task)
    }

    /// Score in input order, then rank; ties keep first-produced order.
    async fn score_all(&self, improvements: Vec<Improvement>) -> Vec<Improvement> {
        let mut scored = Vec::with_capacity(improvements.len());
        for improvement in improvements {
            scored.push(score_with_oracle(improvement, self.oracle.as_ref()).await);
        }
        rank(scored)
    }

    async fn wait_for_feedback(&self, proposal_id: &str) -> FeedbackResolution {
        let timeout = self.config.feedback_timeout;
        let resolution = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => FeedbackResolution::Cancelled,
            response = self.feedback.await_feedback(proposal_id, timeout) => match response {
                Ok(FeedbackResponse::Answered(outcome)) => FeedbackResolution::Received(outcome),
                Ok(FeedbackResponse::TimedOut) => FeedbackResolution::TimedOut,
                Err(e) => {
                    log::warn!("Feedback for proposal={} failed: {}; treating as no response", proposal_id, e);
                    FeedbackResolution::TimedOut
                }
            },
        };

        if resolution == FeedbackResolution::Cancelled {
            self.feedback.withdraw(proposal_id);
            log::warn!(
                "Shutdown while awaiting proposal={}; its outcome will not be recorded",
                proposal_id
            );
        }
        resolution
    }

    async fn learn(&self, improvement: &Improvement, proposal_id: &str, resolution: FeedbackResolution) {
        let Some(outcome) = resolution.recorded_outcome() else {
            return;
        };
        if let Err(e) = self
            .oracle
            .record_proposal_outcome(&improvement.category, proposal_id, outcome)
            .await
        {
            log::warn!(
                "Failed to record {} for category={} proposal={}: {}",
                outcome,
                improvement.category,
                proposal_id,
                e
            );
        }
    }
}
