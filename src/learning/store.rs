//! JSONL-backed outcome store with an in-memory tally cache.
//!
//! The file is append-only; the cache is built once on open and kept in step
//! with every append.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use super::traits::{AcceptanceRateOracle, CategoryStats};
use crate::domain::FeedbackOutcome;
use crate::error::{EverThinkerError, Result};
use crate::id::generate_outcome_id;

const OUTCOMES_FILE: &str = "outcomes.jsonl";

/// One persisted learning outcome.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub id: String,
    pub category: String,
    pub outcome: FeedbackOutcome,
    /// Proposal the outcome answers, when known
    pub proposal_id: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl OutcomeRecord {
    pub fn new(category: impl Into<String>, outcome: FeedbackOutcome) -> Self {
        Self {
            id: generate_outcome_id(),
            category: category.into(),
            outcome,
            proposal_id: None,
            recorded_at: Utc::now(),
        }
    }

    pub fn for_proposal(mut self, proposal_id: impl Into<String>) -> Self {
        self.proposal_id = Some(proposal_id.into());
        self
    }
}

/// Persistent acceptance-rate oracle.
pub struct OutcomeStore {
    path: PathBuf,
    tallies: RwLock<HashMap<String, CategoryStats>>,
}

impl std::fmt::Debug for OutcomeStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutcomeStore").field("path", &self.path).finish_non_exhaustive()
    }
}

impl OutcomeStore {
    /// Open or create the store under a data directory.
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let data_dir = data_dir.as_ref();
        fs::create_dir_all(data_dir)?;
        let path = data_dir.join(OUTCOMES_FILE);

        let mut tallies: HashMap<String, CategoryStats> = HashMap::new();
        if path.exists() {
            let reader = BufReader::new(File::open(&path)?);
            for (index, line) in reader.lines().enumerate() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<OutcomeRecord>(&line) {
                    Ok(record) => tallies.entry(record.category).or_default().record(record.outcome),
                    Err(e) => log::warn!("Skipping corrupt outcome line {} in {}: {}", index + 1, path.display(), e),
                }
            }
        }

        log::debug!("Opened outcome store at {} ({} categories)", path.display(), tallies.len());
        Ok(Self {
            path,
            tallies: RwLock::new(tallies),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Append a record to the file, then fold it into the cache.
    pub async fn append(&self, record: &OutcomeRecord) -> Result<()> {
        let line = format!("{}\n", serde_json::to_string(record)?);
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        let mut tallies = self.tallies.write().map_err(|e| EverThinkerError::Storage(e.to_string()))?;
        tallies.entry(record.category.clone()).or_default().record(record.outcome);
        Ok(())
    }

    /// Tallies for one category.
    pub fn category_stats(&self, category: &str) -> Result<CategoryStats> {
        let tallies = self.tallies.read().map_err(|e| EverThinkerError::Storage(e.to_string()))?;
        Ok(tallies.get(category).copied().unwrap_or_default())
    }

    /// Tallies for every category, sorted by name.
    pub fn stats(&self) -> Result<BTreeMap<String, CategoryStats>> {
        let tallies = self.tallies.read().map_err(|e| EverThinkerError::Storage(e.to_string()))?;
        Ok(tallies.iter().map(|(k, v)| (k.clone(), *v)).collect())
    }

    /// Read every persisted record back from disk.
    pub fn records(&self) -> Result<Vec<OutcomeRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let reader = BufReader::new(File::open(&self.path)?);
        let mut records = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(&line)?);
            }
        }
        Ok(records)
    }
}

#[async_trait]
impl AcceptanceRateOracle for OutcomeStore {
    async fn get_rate(&self, category: &str) -> Result<Option<f64>> {
        let tallies = self
            .tallies
            .read()
            .map_err(|e| EverThinkerError::OracleUnavailable(e.to_string()))?;
        Ok(tallies.get(category).and_then(CategoryStats::acceptance_rate))
    }

    async fn record_outcome(&self, category: &str, outcome: FeedbackOutcome) -> Result<()> {
        self.append(&OutcomeRecord::new(category, outcome)).await
    }

    async fn record_proposal_outcome(&self, category: &str, proposal_id: &str, outcome: FeedbackOutcome) -> Result<()> {
        self.append(&OutcomeRecord::new(category, outcome).for_proposal(proposal_id))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_open_empty_store() {
        let temp = TempDir::new().unwrap();
        let store = OutcomeStore::open(temp.path()).unwrap();
        assert_eq!(store.get_rate("anything").await.unwrap(), None);
        assert!(store.stats().unwrap().is_empty());
        assert!(store.records().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_and_rate() {
        let temp = TempDir::new().unwrap();
        let store = OutcomeStore::open(temp.path()).unwrap();

        store.record_outcome("testing.missing", FeedbackOutcome::Accepted).await.unwrap();
        store.record_outcome("testing.missing", FeedbackOutcome::Rejected).await.unwrap();
        store.record_outcome("testing.missing", FeedbackOutcome::NoResponse).await.unwrap();

        assert_eq!(store.get_rate("testing.missing").await.unwrap(), Some(0.5));
        let stats = store.category_stats("testing.missing").unwrap();
        assert_eq!(stats.no_response, 1);
        assert_eq!(store.records().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_persistence_across_reopen() {
        let temp = TempDir::new().unwrap();
        {
            let store = OutcomeStore::open(temp.path()).unwrap();
            store.record_outcome("docs.module", FeedbackOutcome::Accepted).await.unwrap();
            store
                .record_proposal_outcome("docs.module", "prop-1", FeedbackOutcome::Accepted)
                .await
                .unwrap();
        }

        let store = OutcomeStore::open(temp.path()).unwrap();
        assert_eq!(store.get_rate("docs.module").await.unwrap(), Some(1.0));
        let records = store.records().unwrap();
        assert_eq!(records[0].proposal_id, None);
        assert_eq!(records[1].proposal_id.as_deref(), Some("prop-1"));
    }

    #[tokio::test]
    async fn test_concurrent_appends_keep_every_line() {
        let temp = TempDir::new().unwrap();
        let store = OutcomeStore::open(temp.path()).unwrap();

        let writes = (0..20).map(|i| {
            let outcome = if i % 2 == 0 {
                FeedbackOutcome::Accepted
            } else {
                FeedbackOutcome::Rejected
            };
            store.record_proposal_outcome("perf.clone", "prop-x", outcome)
        });
        for result in futures::future::join_all(writes).await {
            result.unwrap();
        }

        let reopened = OutcomeStore::open(temp.path()).unwrap();
        assert_eq!(reopened.records().unwrap().len(), 20);
        assert_eq!(reopened.get_rate("perf.clone").await.unwrap(), Some(0.5));
    }

    #[test]
    fn test_corrupt_lines_are_skipped() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join(OUTCOMES_FILE);
        let good = serde_json::to_string(&OutcomeRecord::new("ux.panic", FeedbackOutcome::Rejected)).unwrap();
        fs::write(&path, format!("{}\nnot json\n\n", good)).unwrap();

        let store = OutcomeStore::open(temp.path()).unwrap();
        assert_eq!(store.category_stats("ux.panic").unwrap().rejected, 1);
    }

    #[tokio::test]
    async fn test_stats_sorted_by_category() {
        let temp = TempDir::new().unwrap();
        let store = OutcomeStore::open(temp.path()).unwrap();
        store.append(&OutcomeRecord::new("z.last", FeedbackOutcome::Accepted)).await.unwrap();
        store.append(&OutcomeRecord::new("a.first", FeedbackOutcome::Accepted)).await.unwrap();

        let names: Vec<String> = store.stats().unwrap().into_keys().collect();
        assert_eq!(names, vec!["a.first".to_string(), "z.last".to_string()]);
    }
}
