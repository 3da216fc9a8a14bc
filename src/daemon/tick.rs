//! Tick Loop - host main loop driving the cycle controller
//!
//! The tick loop periodically:
//! - Polls the task feed and forwards completions to the controller
//! - Resets the cycle budget when the project changes
//! - Starts a cycle attempt in the background
//! - Collects finished attempts

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::config::CycleConfig;
use crate::domain::CycleResult;
use crate::error::{EverThinkerError, Result};
use crate::orchestrator::CycleController;
use crate::tasks::TaskFeed;

/// Configuration for the host tick loop
#[derive(Debug, Clone)]
pub struct TickConfig {
    /// Interval between ticks
    pub tick_interval: Duration,
}

impl Default for TickConfig {
    fn default() -> Self {
        Self::from(&CycleConfig::default())
    }
}

impl From<&CycleConfig> for TickConfig {
    fn from(config: &CycleConfig) -> Self {
        Self {
            tick_interval: config.tick_interval(),
        }
    }
}

/// Tick result indicates what happened during a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickResult {
    /// Nothing new arrived
    Ok,
    /// New task completions were observed
    Observed(usize),
}

/// Tick state tracks what's happening between ticks
#[derive(Debug, Default)]
pub struct TickState {
    /// Number of ticks since start
    pub tick_count: u64,
    /// Task completions forwarded to the controller
    pub observed: u64,
    /// Cycles that submitted a proposal
    pub proposals: u64,
    /// Attempts refused because the budget is spent
    pub halted: u64,
    /// Attempts that ended without a proposal
    pub skips: u64,
    /// Budget resets after a project change
    pub resets: u64,
    /// Project of the last observed task
    pub last_project: Option<String>,
    /// A project change happened but the reset has not been applied yet
    pub reset_pending: bool,
}

impl TickState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tick(&mut self) {
        self.tick_count += 1;
    }

    /// Fold a finished attempt into the counters
    pub fn record(&mut self, result: &CycleResult) {
        match result {
            CycleResult::Proposed(_) => self.proposals += 1,
            CycleResult::Halted => self.halted += 1,
            CycleResult::Skipped(_) => self.skips += 1,
        }
    }

    /// Track the project of an observed task. Returns true on a change.
    pub fn observe_project(&mut self, project: &str) -> bool {
        let changed = self.last_project.as_deref().is_some_and(|p| p != project);
        if changed {
            self.reset_pending = true;
        }
        self.last_project = Some(project.to_string());
        changed
    }
}

type Attempts = JoinSet<Result<CycleResult>>;

/// Collect finished attempts. A contract violation is returned as an error.
fn reap(attempts: &mut Attempts, state: &mut TickState) -> Result<()> {
    while let Some(joined) = attempts.try_join_next() {
        settle(joined, state)?;
    }
    Ok(())
}

fn settle(joined: std::result::Result<Result<CycleResult>, tokio::task::JoinError>, state: &mut TickState) -> Result<()> {
    match joined {
        Ok(Ok(result)) => {
            state.record(&result);
            Ok(())
        }
        Ok(Err(e)) => Err(e),
        Err(e) => {
            log::error!("Cycle attempt task failed: {}", e);
            Ok(())
        }
    }
}

/// One tick: feed, reset, attempt.
async fn tick(
    controller: &Arc<CycleController>,
    feed: &TaskFeed,
    state: &mut TickState,
    attempts: &mut Attempts,
) -> Result<TickResult> {
    state.tick();
    reap(attempts, state)?;

    let tasks = match feed.poll_new() {
        Ok(tasks) => tasks,
        Err(e) => {
            log::warn!("Failed to poll task feed {}: {}", feed.path().display(), e);
            Vec::new()
        }
    };
    let observed = tasks.len();
    for task in tasks {
        if state.observe_project(&task.project) {
            log::info!("Project changed to '{}'", task.project);
        }
        controller.observe_completion(task);
    }
    state.observed += observed as u64;

    if state.reset_pending {
        match controller.reset_cycle_count() {
            Ok(()) => {
                state.reset_pending = false;
                state.resets += 1;
            }
            Err(EverThinkerError::InvalidState(reason)) => {
                log::debug!("Deferring budget reset: {}", reason);
            }
            Err(e) => return Err(e),
        }
    }

    let controller = Arc::clone(controller);
    attempts.spawn(async move { controller.run_cycle_if_idle().await });

    Ok(if observed > 0 {
        TickResult::Observed(observed)
    } else {
        TickResult::Ok
    })
}

/// Run the host loop until `shutdown` fires or an analyzer breaks its
/// contract. Cycles run in background tasks so polling continues while a
/// proposal waits for feedback.
pub async fn run_host_loop(
    controller: Arc<CycleController>,
    feed: Arc<TaskFeed>,
    config: TickConfig,
    shutdown: CancellationToken,
) -> Result<TickState> {
    let mut state = TickState::new();
    let mut attempts: Attempts = JoinSet::new();
    let mut interval = tokio::time::interval(config.tick_interval);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    log::info!("Host loop started (tick every {:?})", config.tick_interval);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            _ = interval.tick() => {}
        }

        match tick(&controller, &feed, &mut state, &mut attempts).await {
            Ok(TickResult::Observed(n)) => log::debug!("Tick {}: observed {} completions", state.tick_count, n),
            Ok(TickResult::Ok) => {}
            Err(e) => {
                log::error!("Host loop stopping: {}", e);
                controller.shutdown();
                attempts.abort_all();
                return Err(e);
            }
        }
    }

    log::info!("Host loop shutting down");
    controller.shutdown();
    while let Some(joined) = attempts.join_next().await {
        settle(joined, &mut state)?;
    }

    log::info!(
        "Host loop stopped after {} ticks: {} proposals, {} skips, {} resets",
        state.tick_count,
        state.proposals,
        state.skips,
        state.resets
    );
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::{Analyzer, FanOutExecutor};
    use crate::domain::{Effort, Impact, Improvement, SkipReason, Task};
    use crate::feedback::FeedbackRegistry;
    use crate::learning::MemoryOracle;
    use crate::orchestrator::ControllerConfig;
    use async_trait::async_trait;
    use std::fs::OpenOptions;
    use std::io::Write;
    use tempfile::TempDir;

    struct OneFinding {
        category: &'static str,
    }

    #[async_trait]
    impl Analyzer for OneFinding {
        fn name(&self) -> &str {
            "quality"
        }

        async fn analyze(&self, _task: &Task) -> Result<Vec<Improvement>> {
            Ok(vec![Improvement::new("quality", self.category, Impact::Medium, Effort::Small, "fix")])
        }
    }

    fn append_task(feed: &TaskFeed, id: &str, project: &str) {
        let mut file = OpenOptions::new().create(true).append(true).open(feed.path()).unwrap();
        writeln!(file, "{{\"id\":\"{}\",\"project\":\"{}\",\"root\":\"/repo\"}}", id, project).unwrap();
    }

    /// Controller wired to a registry whose reviewer accepts everything.
    fn accepting_controller(max_cycles: u32, category: &'static str, oracle: Arc<MemoryOracle>) -> Arc<CycleController> {
        let (registry, mut rx) = FeedbackRegistry::new();
        let registry = Arc::new(registry);
        {
            let registry = Arc::clone(&registry);
            tokio::spawn(async move {
                while let Some(proposal) = rx.recv().await {
                    registry.resolve(&proposal.id, true);
                }
            });
        }

        let config = ControllerConfig {
            max_cycles,
            idle_quiet_window: Duration::ZERO,
            feedback_timeout: Duration::from_secs(5),
        };
        let executor = FanOutExecutor::new(vec![]).with_analyzer(OneFinding { category });
        let tasks = Arc::new(crate::tasks::RecentTasks::new(4));
        Arc::new(CycleController::new(config, executor, oracle, registry, tasks))
    }

    async fn wait_for(mut done: impl FnMut() -> bool) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(3);
        while !done() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    #[test]
    fn test_tick_config_from_cycle_config() {
        let config = TickConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(5));
    }

    #[test]
    fn test_tick_state_record() {
        let mut state = TickState::new();
        state.record(&CycleResult::Halted);
        state.record(&CycleResult::Skipped(SkipReason::NotIdle));
        state.record(&CycleResult::Skipped(SkipReason::NoTask));
        assert_eq!(state.halted, 1);
        assert_eq!(state.skips, 2);
        assert_eq!(state.proposals, 0);
    }

    #[test]
    fn test_observe_project() {
        let mut state = TickState::new();
        assert!(!state.observe_project("a"));
        assert!(!state.observe_project("a"));
        assert!(!state.reset_pending);
        assert!(state.observe_project("b"));
        assert!(state.reset_pending);
    }

    #[tokio::test]
    async fn test_host_loop_proposes_and_stops() {
        let temp = TempDir::new().unwrap();
        let feed = Arc::new(TaskFeed::open(temp.path(), 4).unwrap());
        let oracle = Arc::new(MemoryOracle::new());
        let controller = accepting_controller(5, "quality.unwrap", Arc::clone(&oracle));
        let shutdown = CancellationToken::new();

        append_task(&feed, "t-1", "alpha");
        let host = tokio::spawn(run_host_loop(
            Arc::clone(&controller),
            Arc::clone(&feed),
            TickConfig {
                tick_interval: Duration::from_millis(10),
            },
            shutdown.clone(),
        ));

        wait_for(|| oracle.total_recorded() >= 1).await;
        shutdown.cancel();
        let state = host.await.unwrap().unwrap();

        assert_eq!(state.proposals, 1);
        assert_eq!(state.observed, 1);
        assert_eq!(oracle.stats("quality.unwrap").accepted, 1);
    }

    #[tokio::test]
    async fn test_project_change_resets_budget() {
        let temp = TempDir::new().unwrap();
        let feed = Arc::new(TaskFeed::open(temp.path(), 4).unwrap());
        let oracle = Arc::new(MemoryOracle::new());
        let controller = accepting_controller(1, "quality.todo", Arc::clone(&oracle));
        let shutdown = CancellationToken::new();

        append_task(&feed, "t-1", "alpha");
        let host = tokio::spawn(run_host_loop(
            Arc::clone(&controller),
            Arc::clone(&feed),
            TickConfig {
                tick_interval: Duration::from_millis(10),
            },
            shutdown.clone(),
        ));

        wait_for(|| oracle.total_recorded() >= 1).await;
        wait_for(|| controller.phase() == crate::domain::CyclePhase::Halted).await;
        append_task(&feed, "t-2", "beta");
        wait_for(|| oracle.total_recorded() >= 2).await;

        shutdown.cancel();
        let state = host.await.unwrap().unwrap();
        assert_eq!(state.proposals, 2);
        assert_eq!(state.resets, 1);
        assert!(state.halted >= 1);
    }

    #[tokio::test]
    async fn test_contract_violation_stops_loop() {
        let temp = TempDir::new().unwrap();
        let feed = Arc::new(TaskFeed::open(temp.path(), 4).unwrap());
        let controller = accepting_controller(5, "", Arc::new(MemoryOracle::new()));

        append_task(&feed, "t-1", "alpha");
        let result = tokio::time::timeout(
            Duration::from_secs(3),
            run_host_loop(
                controller,
                feed,
                TickConfig {
                    tick_interval: Duration::from_millis(10),
                },
                CancellationToken::new(),
            ),
        )
        .await
        .unwrap();

        assert!(matches!(result, Err(EverThinkerError::ContractViolation { .. })));
    }
}
