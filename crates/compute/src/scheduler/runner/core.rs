use std::sync::Arc;
use std::thread::{self, JoinHandle};

use flowfield_core::{CostProviderTable, FlowFieldError, Result};
use parking_lot::{Condvar, Mutex};
use tracing::{error, info};

use crate::algorithms::{DijkstraCalculator, FlowFieldCalculator};
use crate::scheduler::job::Job;
use crate::scheduler::metrics::SchedulerMetrics;
use crate::scheduler::request::RequestTable;
use crate::scheduler::station::StationPool;
use crate::scheduler::types::{SchedulerConfig, SchedulerStatus, WorkerState};

/// Control-plane state guarded by one lock.
pub(super) struct ControlState {
    pub(super) queue: Vec<Job>,
    pub(super) paused: bool,
    pub(super) stop: bool,
    pub(super) workers: Vec<WorkerState>,
    /// Stations not yet reserved by a claimed integration job.
    pub(super) free_stations: usize,
}

impl ControlState {
    pub(super) fn any_working(&self) -> bool {
        self.workers.iter().any(|w| *w == WorkerState::Working)
    }
}

/// Everything the worker threads share with the facade.
pub(super) struct Shared {
    pub(super) config: SchedulerConfig,
    pub(super) providers: CostProviderTable,
    pub(super) control: Mutex<ControlState>,
    /// Signalled when jobs are queued, stations freed, or pause/stop change.
    pub(super) work_available: Condvar,
    /// Signalled when a worker leaves `Working`.
    pub(super) quiesced: Condvar,
    pub(super) stations: StationPool,
    pub(super) requests: RequestTable,
    pub(super) metrics: Mutex<SchedulerMetrics>,
}

/// Background flow-field scheduler.
///
/// Owns a fixed pool of worker threads and one station per worker. All
/// methods take `&self` and may be called from several threads; dropping the
/// scheduler stops and joins the workers, abandoning in-flight jobs.
pub struct Scheduler {
    pub(super) shared: Arc<Shared>,
    workers: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Create a scheduler using the built-in [`DijkstraCalculator`].
    pub fn new(providers: CostProviderTable, config: SchedulerConfig) -> Result<Self> {
        Self::with_calculator(providers, config, || {
            Box::new(DijkstraCalculator::new()) as Box<dyn FlowFieldCalculator>
        })
    }

    /// Create a scheduler whose stations use calculators built by `factory`.
    pub fn with_calculator<F>(
        providers: CostProviderTable,
        config: SchedulerConfig,
        factory: F,
    ) -> Result<Self>
    where
        F: Fn() -> Box<dyn FlowFieldCalculator>,
    {
        if providers.is_empty() {
            return Err(FlowFieldError::NoCostProviders);
        }
        config.validate()?;

        let count = config.worker_threads;
        let shared = Arc::new(Shared {
            providers,
            control: Mutex::new(ControlState {
                queue: Vec::new(),
                paused: false,
                stop: false,
                workers: vec![WorkerState::PrepOrIdle; count],
                free_stations: count,
            }),
            work_available: Condvar::new(),
            quiesced: Condvar::new(),
            stations: StationPool::new(count, factory),
            requests: RequestTable::new(),
            metrics: Mutex::new(SchedulerMetrics::default()),
            config,
        });

        let mut scheduler = Self {
            shared,
            workers: Vec::with_capacity(count),
        };
        for worker in 0..count {
            let shared = Arc::clone(&scheduler.shared);
            // On failure, dropping `scheduler` joins the threads already started
            let handle = thread::Builder::new()
                .name(format!("flowfield-worker-{worker}"))
                .spawn(move || shared.worker_loop(worker))
                .map_err(FlowFieldError::WorkerSpawn)?;
            scheduler.workers.push(handle);
        }

        info!(
            workers = count,
            providers = scheduler.shared.providers.len(),
            "Flow-field scheduler started"
        );
        Ok(scheduler)
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.shared.config
    }

    /// Get a snapshot of the current scheduler metrics.
    pub fn metrics(&self) -> SchedulerMetrics {
        self.shared.metrics.lock().clone()
    }

    /// Number of jobs waiting to be claimed.
    pub fn pending_jobs(&self) -> usize {
        self.shared.control.lock().queue.len()
    }

    /// Stations not currently bound to a request.
    pub fn free_stations(&self) -> usize {
        self.shared.stations.free_count()
    }

    /// Requests still in the table (pending, or done and uncollected).
    pub fn live_requests(&self) -> usize {
        self.shared.requests.len()
    }

    pub fn is_paused(&self) -> bool {
        self.shared.control.lock().paused
    }

    pub fn status(&self) -> SchedulerStatus {
        let (pending_jobs, paused, workers) = {
            let state = self.shared.control.lock();
            (state.queue.len(), state.paused, state.workers.clone())
        };
        SchedulerStatus {
            pending_jobs,
            free_stations: self.free_stations(),
            live_requests: self.live_requests(),
            paused,
            workers,
        }
    }

    /// Stop the workers and wait for them to exit.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        {
            let mut state = self.shared.control.lock();
            state.stop = true;
        }
        self.shared.work_available.notify_all();

        for handle in self.workers.drain(..) {
            if handle.join().is_err() {
                error!("Flow-field worker panicked");
            }
        }
        info!("Flow-field scheduler stopped");
    }
}
