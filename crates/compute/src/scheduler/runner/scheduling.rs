use tracing::debug;

use crate::scheduler::job::Job;
use crate::scheduler::queue;
use crate::scheduler::request::Request;
use crate::scheduler::station::StationId;
use crate::scheduler::types::WorkerState;

use super::core::Shared;

impl Shared {
    /// Body of every worker thread.
    pub(super) fn worker_loop(&self, worker: usize) {
        debug!(worker, "Worker started");
        while let Some(job) = self.next_job(worker) {
            self.execute(worker, job);
        }
        debug!(worker, "Worker stopped");
    }

    /// Block until a job is claimable and claim it, or return `None` on stop.
    fn next_job(&self, worker: usize) -> Option<Job> {
        let mut state = self.control.lock();
        state.workers[worker] = WorkerState::PrepOrIdle;
        self.quiesced.notify_all();

        loop {
            if state.stop {
                return None;
            }
            if !state.paused {
                let station_free = state.free_stations > 0;
                if let Some(index) = queue::pick(&state.queue, worker, station_free) {
                    let job = state.queue.swap_remove(index);
                    if job.is_integration() {
                        state.free_stations -= 1;
                    }
                    state.workers[worker] = WorkerState::Working;
                    return Some(job);
                }
            }
            self.work_available.wait(&mut state);
        }
    }

    /// Append jobs to the queue and wake idle workers.
    pub(super) fn enqueue(&self, jobs: Vec<Job>) {
        if jobs.is_empty() {
            return;
        }
        let mut state = self.control.lock();
        state.queue.extend(jobs);
        self.work_available.notify_all();
    }

    /// Batch boundary. Parks while paused; returns `false` when the job
    /// should wind down because of stop or cancellation.
    pub(super) fn checkpoint(&self, worker: usize, request: &Request) -> bool {
        let mut state = self.control.lock();
        loop {
            if state.stop || request.is_cancelled() {
                return false;
            }
            if !state.paused {
                state.workers[worker] = WorkerState::Working;
                return true;
            }
            if state.workers[worker] == WorkerState::Working {
                state.workers[worker] = WorkerState::PrepOrIdle;
                self.quiesced.notify_all();
            }
            self.work_available.wait(&mut state);
        }
    }

    /// Hand an integration reservation back without touching the pool.
    pub(super) fn return_reservation(&self) {
        let mut state = self.control.lock();
        state.free_stations += 1;
        self.work_available.notify_all();
    }

    /// Free a station and its reservation.
    pub(super) fn release_station(&self, station: StationId) {
        self.stations.release(station);
        self.return_reservation();
    }
}
