use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::analysis::BUILTIN_ANALYZERS;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub log_level: Option<String>,
    pub cycle: CycleConfig,
    pub analysis: AnalysisConfig,
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleConfig {
    /// Proposals submitted before the orchestrator halts
    pub max_cycles: u32,
    /// No task completion for this long counts as idle
    pub idle_quiet_window_ms: u64,
    pub feedback_timeout_ms: u64,
    /// How often the host loop attempts a cycle
    pub tick_interval_ms: u64,
}

impl Default for CycleConfig {
    fn default() -> Self {
        Self {
            max_cycles: 10,
            idle_quiet_window_ms: 300_000,
            feedback_timeout_ms: 3_600_000,
            tick_interval_ms: 5_000,
        }
    }
}

impl CycleConfig {
    pub fn idle_quiet_window(&self) -> Duration {
        Duration::from_millis(self.idle_quiet_window_ms)
    }

    pub fn feedback_timeout(&self) -> Duration {
        Duration::from_millis(self.feedback_timeout_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Built-in analyzers to run, by name
    pub enabled: Vec<String>,
    pub max_files_per_task: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            enabled: BUILTIN_ANALYZERS.iter().map(|s| s.to_string()).collect(),
            max_files_per_task: 200,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Holds `outcomes.jsonl` and `tasks.jsonl`
    pub data_dir: PathBuf,
    /// Completed tasks retained for task selection
    pub history_len: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("ever-thinker"),
            history_len: 16,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_level: Some("info".to_string()),
            cycle: CycleConfig::default(),
            analysis: AnalysisConfig::default(),
            storage: StorageConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration with fallback chain
    pub fn load(config_path: Option<&PathBuf>) -> Result<Self> {
        // An explicit path must load; no silent fallback
        if let Some(path) = config_path {
            return Self::load_from_file(path);
        }

        // Try primary location: ~/.config/<project>/<project>.yml
        let project_name = env!("CARGO_PKG_NAME");
        if let Some(config_dir) = dirs::config_dir() {
            let primary_config = config_dir.join(project_name).join(format!("{}.yml", project_name));
            if primary_config.exists() {
                match Self::load_from_file(&primary_config) {
                    Ok(config) => return Ok(config),
                    Err(e) => {
                        log::warn!("Failed to load config from {}: {}", primary_config.display(), e);
                    }
                }
            }
        }

        // Try fallback location: ./<project>.yml
        let fallback_config = PathBuf::from(format!("{}.yml", project_name));
        if fallback_config.exists() {
            match Self::load_from_file(&fallback_config) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    log::warn!("Failed to load config from {}: {}", fallback_config.display(), e);
                }
            }
        }

        // No config file found, use defaults
        log::info!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)?;
        let config: Self = serde_yaml::from_str(&content)?;

        log::info!("Loaded config from: {}", path.as_ref().display());
        Ok(config)
    }
}
