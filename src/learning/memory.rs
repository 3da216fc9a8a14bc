//! In-memory oracle for dry runs and tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use super::traits::{AcceptanceRateOracle, CategoryStats};
use crate::domain::FeedbackOutcome;
use crate::error::{EverThinkerError, Result};

/// Oracle that keeps tallies in memory.
///
/// Fixed rates set with `with_rate` take precedence over recorded history.
#[derive(Debug, Default)]
pub struct MemoryOracle {
    fixed: Mutex<HashMap<String, f64>>,
    stats: Mutex<HashMap<String, CategoryStats>>,
    unavailable: AtomicBool,
}

impl MemoryOracle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pin the rate reported for a category.
    pub fn with_rate(self, category: impl Into<String>, rate: f64) -> Self {
        if let Ok(mut fixed) = self.fixed.lock() {
            fixed.insert(category.into(), rate);
        }
        self
    }

    /// Make every call fail with `OracleUnavailable`.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Recorded tallies for a category.
    pub fn stats(&self, category: &str) -> CategoryStats {
        self.stats
            .lock()
            .ok()
            .and_then(|s| s.get(category).copied())
            .unwrap_or_default()
    }

    /// Every outcome recorded so far, summed over categories.
    pub fn total_recorded(&self) -> u64 {
        self.stats
            .lock()
            .map(|s| s.values().map(CategoryStats::total).sum())
            .unwrap_or(0)
    }

    fn check_available(&self) -> Result<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(EverThinkerError::OracleUnavailable("memory oracle switched off".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AcceptanceRateOracle for MemoryOracle {
    async fn get_rate(&self, category: &str) -> Result<Option<f64>> {
        self.check_available()?;

        let fixed = self.fixed.lock().map_err(|e| EverThinkerError::OracleUnavailable(e.to_string()))?;
        if let Some(rate) = fixed.get(category) {
            return Ok(Some(*rate));
        }
        drop(fixed);

        let stats = self.stats.lock().map_err(|e| EverThinkerError::OracleUnavailable(e.to_string()))?;
        Ok(stats.get(category).and_then(CategoryStats::acceptance_rate))
    }

    async fn record_outcome(&self, category: &str, outcome: FeedbackOutcome) -> Result<()> {
        self.check_available()?;

        let mut stats = self.stats.lock().map_err(|e| EverThinkerError::Storage(e.to_string()))?;
        stats.entry(category.to_string()).or_default().record(outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unknown_category_has_no_rate() {
        let oracle = MemoryOracle::new();
        assert_eq!(oracle.get_rate("perf.clone").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_fixed_rate() {
        let oracle = MemoryOracle::new().with_rate("perf.clone", 0.8);
        assert_eq!(oracle.get_rate("perf.clone").await.unwrap(), Some(0.8));
    }

    #[tokio::test]
    async fn test_rate_from_recorded_outcomes() {
        let oracle = MemoryOracle::new();
        oracle.record_outcome("docs.missing", FeedbackOutcome::Accepted).await.unwrap();
        oracle.record_outcome("docs.missing", FeedbackOutcome::Rejected).await.unwrap();
        oracle.record_outcome("docs.missing", FeedbackOutcome::Accepted).await.unwrap();
        oracle.record_outcome("docs.missing", FeedbackOutcome::Accepted).await.unwrap();
        assert_eq!(oracle.get_rate("docs.missing").await.unwrap(), Some(0.75));
        assert_eq!(oracle.stats("docs.missing").accepted, 3);
        assert_eq!(oracle.total_recorded(), 4);
    }

    #[tokio::test]
    async fn test_unavailable() {
        let oracle = MemoryOracle::new().with_rate("x", 1.0);
        oracle.set_unavailable(true);
        assert!(matches!(
            oracle.get_rate("x").await,
            Err(EverThinkerError::OracleUnavailable(_))
        ));
        assert!(oracle.record_outcome("x", FeedbackOutcome::Accepted).await.is_err());

        oracle.set_unavailable(false);
        assert_eq!(oracle.get_rate("x").await.unwrap(), Some(1.0));
    }
}
