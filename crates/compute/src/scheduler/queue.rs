//! Priority picker over the pending job queue.
//!
//! Integration jobs get a fixed head start because each one fans out into a
//! batch of flow jobs, but every job also pays 1000 points per tick its
//! request has left, so work for a request close to its deadline overtakes
//! integration for a request with time to spare.

use super::job::{Job, JobKind};

const INTEGRATION_BONUS: i64 = 1999;
const URGENCY_WEIGHT: i64 = 1000;

/// Score of `job` when picked by `worker`; higher runs first.
pub(crate) fn score(job: &Job, worker: usize) -> i64 {
    let base = match job.kind {
        JobKind::ComputeFlow {
            preferred_worker, ..
        } if preferred_worker == worker => return i64::MAX,
        JobKind::ComputeFlow { .. } => 0,
        JobKind::BuildIntegration { .. } => INTEGRATION_BONUS,
    };
    base.saturating_sub(job.request.decay().saturating_mul(URGENCY_WEIGHT))
}

/// Index of the best job `worker` may claim. Integration jobs are only
/// eligible while a station is free. Ties keep the earliest job.
pub(crate) fn pick(queue: &[Job], worker: usize, station_free: bool) -> Option<usize> {
    let mut best: Option<(usize, i64)> = None;
    for (index, job) in queue.iter().enumerate() {
        if job.is_integration() && !station_free {
            continue;
        }
        let score = score(job, worker);
        match best {
            Some((_, top)) if score <= top => {}
            _ => best = Some((index, score)),
        }
    }
    best.map(|(index, _)| index)
}
