use std::path::Path;
use std::time::Duration;

use flowfield_core::config::{env_parse, load_dotenv};
use flowfield_core::{FlowFieldError, Result};
use serde::{Deserialize, Serialize};

/// What a worker thread is doing, as seen by `pause()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkerState {
    /// Waiting for work, or parked at a safe point while paused.
    PrepOrIdle,
    /// Executing a job outside the control lock.
    Working,
}

/// Point-in-time view of the scheduler's control plane.
#[derive(Debug, Clone, Serialize)]
pub struct SchedulerStatus {
    pub pending_jobs: usize,
    pub free_stations: usize,
    pub live_requests: usize,
    pub paused: bool,
    pub workers: Vec<WorkerState>,
}

/// Scheduler configuration, typically parsed from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Number of worker threads, and stations. Must be positive.
    #[serde(default = "default_worker_threads")]
    pub worker_threads: usize,
    /// Ticks a completed result survives uncollected before it is dropped.
    #[serde(default = "default_expiration_limit")]
    pub expiration_limit: u32,
    /// Cells settled per integration batch between safe points.
    #[serde(default = "default_integration_batch")]
    pub integration_batch_cells: usize,
    /// Rows computed per flow batch between safe points.
    #[serde(default = "default_flow_batch")]
    pub flow_batch_rows: usize,
    /// Soft budget for `pause()` to quiesce before it logs a warning.
    #[serde(default = "default_pause_warn_ms")]
    pub pause_warn_ms: u64,
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
fn default_expiration_limit() -> u32 { 10 }
fn default_integration_batch() -> usize { 256 }
fn default_flow_batch() -> usize { 4 }
fn default_pause_warn_ms() -> u64 { 5 }

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            worker_threads: default_worker_threads(),
            expiration_limit: default_expiration_limit(),
            integration_batch_cells: default_integration_batch(),
            flow_batch_rows: default_flow_batch(),
            pause_warn_ms: default_pause_warn_ms(),
        }
    }
}

impl SchedulerConfig {
    /// Config with an explicit worker count and defaults elsewhere.
    pub fn with_workers(worker_threads: usize) -> Self {
        Self {
            worker_threads,
            ..Self::default()
        }
    }

    /// Defaults with `FLOWFIELD_*` overrides (reads `.env` first).
    pub fn from_env() -> Result<Self> {
        load_dotenv();
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Parse config from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    fn apply_env_overrides(&mut self) {
        if let Some(v) = env_parse("FLOWFIELD_WORKER_THREADS") {
            self.worker_threads = v;
        }
        if let Some(v) = env_parse("FLOWFIELD_EXPIRATION_LIMIT") {
            self.expiration_limit = v;
        }
        if let Some(v) = env_parse("FLOWFIELD_INTEGRATION_BATCH") {
            self.integration_batch_cells = v;
        }
        if let Some(v) = env_parse("FLOWFIELD_FLOW_BATCH") {
            self.flow_batch_rows = v;
        }
        if let Some(v) = env_parse("FLOWFIELD_PAUSE_WARN_MS") {
            self.pause_warn_ms = v;
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.worker_threads == 0 {
            return Err(FlowFieldError::InvalidConcurrency(self.worker_threads));
        }
        if self.integration_batch_cells == 0 {
            return Err(FlowFieldError::Config(
                "integration_batch_cells must be positive".into(),
            ));
        }
        if self.flow_batch_rows == 0 {
            return Err(FlowFieldError::Config("flow_batch_rows must be positive".into()));
        }
        Ok(())
    }

    pub fn pause_warn(&self) -> Duration {
        Duration::from_millis(self.pause_warn_ms)
    }
}
