use std::time::Instant;

use flowfield_core::{
    CollectedField, CostProviderId, FlowFieldError, GridPos, GridRect, GridSize, RequestId, Result,
};
use tracing::{debug, info, warn};

use crate::scheduler::job::Job;

use super::core::Scheduler;

impl Scheduler {
    /// Queue a flow field over the rectangle at `origin` of `size` cells,
    /// converging on the world-space `target`.
    ///
    /// `max_iterations` is the number of [`advance`](Self::advance) calls
    /// after which the result is forced to completion. Invalid arguments are
    /// rejected before anything is queued.
    pub fn submit(
        &self,
        origin: GridPos,
        size: GridSize,
        target: GridPos,
        cost_provider: CostProviderId,
        max_iterations: u32,
    ) -> Result<RequestId> {
        if !self.shared.providers.contains_key(&cost_provider) {
            return Err(FlowFieldError::UnknownCostProvider(cost_provider));
        }
        if max_iterations < 1 {
            return Err(FlowFieldError::InvalidMaxIterations(max_iterations));
        }
        let rect = GridRect::new(origin, size);
        if !rect.contains(target) {
            return Err(FlowFieldError::TargetOutOfBounds { target, rect });
        }
        if rect.far_corner().is_none() || size.width.checked_mul(size.height).is_none() {
            return Err(FlowFieldError::FieldOutOfRange { rect });
        }

        let request = self
            .shared
            .requests
            .insert(cost_provider, origin, max_iterations);
        let id = request.id();
        self.shared.metrics.lock().requests_submitted += 1;
        self.shared
            .enqueue(vec![Job::build_integration(rect, target, request)]);

        debug!(request_id = id, ?origin, ?size, ?target, max_iterations, "Request submitted");
        Ok(id)
    }

    /// Drop a request. Its jobs wind down at their next batch boundary.
    /// Unknown or already removed ids are ignored.
    pub fn cancel(&self, id: RequestId) {
        let Some(request) = self.shared.requests.remove(id) else {
            return;
        };
        request.cancel();
        self.shared.metrics.lock().requests_cancelled += 1;
        debug!(request_id = id, "Request cancelled");
    }

    /// Take the finished field of a request.
    ///
    /// Returns `Ok(None)` while it is still being computed. A successful
    /// collect removes the request, so collecting again is `RequestNotFound`.
    pub fn collect(&self, id: RequestId) -> Result<Option<CollectedField>> {
        let collected = self.shared.requests.collect(id)?;
        if collected.is_some() {
            self.shared.metrics.lock().requests_collected += 1;
            debug!(request_id = id, "Request collected");
        }
        Ok(collected)
    }

    /// Advance every request by one simulation step.
    ///
    /// Blocks on any request whose deadline arrives this step until its field
    /// is ready. Expired uncollected results are discarded. Fails with
    /// [`FlowFieldError::Paused`] while paused, since no work could progress.
    pub fn advance(&self) -> Result<()> {
        if self.shared.control.lock().paused {
            return Err(FlowFieldError::Paused);
        }

        let outcome = self
            .shared
            .requests
            .tick_all(self.shared.config.expiration_limit);

        for id in &outcome.expired {
            info!(request_id = *id, "Discarding uncollected flow field");
        }

        let forced = outcome
            .deadline
            .iter()
            .filter(|request| !request.is_complete())
            .count() as u64;
        {
            let mut metrics = self.shared.metrics.lock();
            metrics.requests_expired += outcome.expired.len() as u64;
            metrics.forced_completions += forced;
        }

        for request in outcome.deadline {
            if !request.is_complete() {
                debug!(request_id = request.id(), "Deadline reached, waiting for flow field");
            }
            request.wait_for_completion();
        }
        Ok(())
    }

    /// Stop workers from taking or continuing work and wait until none is
    /// mid-batch. Cost sources may be mutated until [`unpause`](Self::unpause).
    pub fn pause(&self) {
        let started = Instant::now();
        let budget = self.shared.config.pause_warn();
        let mut warned = false;

        let mut state = self.shared.control.lock();
        state.paused = true;
        while state.any_working() {
            if warned {
                self.shared.quiesced.wait(&mut state);
                continue;
            }
            let remaining = budget.saturating_sub(started.elapsed());
            let timed_out = self
                .shared
                .quiesced
                .wait_for(&mut state, remaining)
                .timed_out();
            if timed_out && state.any_working() {
                warn!(
                    budget_ms = budget.as_millis() as u64,
                    "Pause is taking longer than its quiesce budget"
                );
                warned = true;
            }
        }
        drop(state);

        debug!(elapsed_us = started.elapsed().as_micros() as u64, "Scheduler paused");
    }

    /// Resume all workers.
    pub fn unpause(&self) {
        {
            let mut state = self.shared.control.lock();
            state.paused = false;
        }
        self.shared.work_available.notify_all();
        debug!("Scheduler unpaused");
    }
}

