//! Concurrent fan-out of one task to every analyzer.
//!
//! Each analyzer runs as its own spawned task, so the fan-out takes roughly as
//! long as the slowest analyzer. Failures (errors or panics) are caught at the
//! task boundary, logged with the analyzer's name and dropped. The executor
//! always joins every analyzer before returning.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use futures::FutureExt;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::traits::Analyzer;
use crate::domain::{Improvement, Task};
use crate::error::{EverThinkerError, Result};

/// Per-analyzer outcome collected by the join.
type AnalyzerOutcome = (String, Result<Vec<Improvement>>);

/// Summary of one fan-out, kept for logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub succeeded: usize,
    pub failed: usize,
    pub improvements: usize,
}

/// Runs analyzers concurrently over a worker pool sized to the analyzer count.
pub struct FanOutExecutor {
    analyzers: Vec<Arc<dyn Analyzer>>,
}

impl FanOutExecutor {
    /// Create an executor over an ordered collection of analyzers.
    pub fn new(analyzers: Vec<Arc<dyn Analyzer>>) -> Self {
        Self { analyzers }
    }

    /// Add an analyzer (builder pattern)
    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzers.push(Arc::new(analyzer));
        self
    }

    pub fn len(&self) -> usize {
        self.analyzers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.analyzers.is_empty()
    }

    pub fn analyzer_names(&self) -> Vec<&str> {
        self.analyzers.iter().map(|a| a.name()).collect()
    }

    /// Run every analyzer against the task and merge their improvements.
    ///
    /// Only a contract violation is returned as an error; analyzer failures
    /// are absorbed.
    pub async fn run_all(&self, task: Arc<Task>) -> Result<Vec<Improvement>> {
        let (improvements, _report) = self.run_all_with_report(task).await?;
        Ok(improvements)
    }

    /// Same as [`run_all`](Self::run_all), also returning success/failure counts.
    pub async fn run_all_with_report(&self, task: Arc<Task>) -> Result<(Vec<Improvement>, FanOutReport)> {
        let started = Instant::now();
        let mut report = FanOutReport::default();

        if self.analyzers.is_empty() {
            log::warn!("Fan-out for task={} has no analyzers registered", task.id);
            return Ok((Vec::new(), report));
        }

        let pool = Arc::new(Semaphore::new(self.analyzers.len()));
        let mut join_set: JoinSet<AnalyzerOutcome> = JoinSet::new();

        for analyzer in &self.analyzers {
            let analyzer = Arc::clone(analyzer);
            let task = Arc::clone(&task);
            let pool = Arc::clone(&pool);
            join_set.spawn(async move {
                let name = analyzer.name().to_string();
                let _permit = match pool.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(e) => {
                        return (
                            name.clone(),
                            Err(EverThinkerError::AnalyzerFailed {
                                analyzer: name,
                                reason: format!("worker pool closed: {}", e),
                            }),
                        );
                    }
                };
                let result = AssertUnwindSafe(analyzer.analyze(&task)).catch_unwind().await;
                let result = match result {
                    Ok(result) => result,
                    Err(panic) => Err(EverThinkerError::AnalyzerFailed {
                        analyzer: name.clone(),
                        reason: format!("panicked: {}", panic_message(&*panic)),
                    }),
                };
                (name, result)
            });
        }

        let mut merged = Vec::new();
        let mut violation = None;

        while let Some(joined) = join_set.join_next().await {
            let (name, result) = match joined {
                Ok(outcome) => outcome,
                Err(e) => {
                    log::error!("Analyzer task for task={} could not be joined: {}", task.id, e);
                    report.failed += 1;
                    continue;
                }
            };

            match result {
                Ok(found) => {
                    log::debug!("Analyzer {} returned {} improvements for task={}", name, found.len(), task.id);
                    report.succeeded += 1;
                    for improvement in found {
                        if let Err(e) = improvement.check_contract() {
                            log::error!("Analyzer {} broke the improvement contract: {}", name, e);
                            violation.get_or_insert(attribute(e, &name));
                            continue;
                        }
                        merged.push(improvement);
                    }
                }
                Err(EverThinkerError::ContractViolation { reason, .. }) => {
                    log::error!("Analyzer {} reported a contract violation: {}", name, reason);
                    report.failed += 1;
                    violation.get_or_insert(EverThinkerError::ContractViolation {
                        analyzer: name.clone(),
                        reason,
                    });
                }
                Err(e) => {
                    log::warn!("Analyzer {} failed on task={}: {}", name, task.id, e);
                    report.failed += 1;
                }
            }
        }

        if let Some(e) = violation {
            return Err(e);
        }

        report.improvements = merged.len();
        log::info!(
            "Fan-out for task={} finished in {:?}: {} ok, {} failed, {} improvements",
            task.id,
            started.elapsed(),
            report.succeeded,
            report.failed,
            report.improvements
        );
        Ok((merged, report))
    }
}

/// Attribute a contract violation to the analyzer that produced it.
fn attribute(err: EverThinkerError, analyzer: &str) -> EverThinkerError {
    match err {
        EverThinkerError::ContractViolation { reason, .. } => EverThinkerError::ContractViolation {
            analyzer: analyzer.to_string(),
            reason,
        },
        other => other,
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
