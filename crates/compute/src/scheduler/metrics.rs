use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Scheduler operational counters.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SchedulerMetrics {
    pub requests_submitted: u64,
    pub requests_completed: u64,
    pub requests_collected: u64,
    pub requests_cancelled: u64,
    pub requests_expired: u64,
    /// Ticks that had to block on a request reaching its deadline.
    pub forced_completions: u64,
    pub integration_jobs: u64,
    pub flow_jobs: u64,
    /// Rolling mean of complete integration passes.
    pub avg_integration_duration: Duration,
    pub last_completed_at: Option<DateTime<Utc>>,
}

impl SchedulerMetrics {
    /// Record a finished integration pass.
    pub fn record_integration(&mut self, duration: Duration) {
        self.integration_jobs += 1;
        let count = self.integration_jobs;

        // Incremental mean: new_avg = prev_avg + (duration - prev_avg) / count
        self.avg_integration_duration = if count == 1 {
            duration
        } else {
            let prev_nanos = self.avg_integration_duration.as_nanos() as f64;
            let cur_nanos = duration.as_nanos() as f64;
            let avg_nanos = prev_nanos + (cur_nanos - prev_nanos) / count as f64;
            Duration::from_nanos(avg_nanos as u64)
        };
    }

    pub fn record_completion(&mut self) {
        self.requests_completed += 1;
        self.last_completed_at = Some(Utc::now());
    }
}
