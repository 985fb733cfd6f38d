use std::sync::Arc;
use std::time::Instant;

use flowfield_core::{CostProvider, GridPos, GridRect};
use tracing::{debug, error};

use crate::scheduler::job::{row_chunks, Job, JobKind};
use crate::scheduler::request::Request;
use crate::scheduler::station::StationId;

use super::core::Shared;

impl Shared {
    /// Run a claimed job. Called without the control lock.
    pub(super) fn execute(&self, worker: usize, job: Job) {
        let Job { kind, request } = job;
        match kind {
            JobKind::BuildIntegration { rect, target } => {
                self.build_integration(worker, rect, target, request)
            }
            JobKind::ComputeFlow {
                station,
                start_row,
                rows,
                ..
            } => self.compute_flow(worker, station, start_row, rows, &request),
        }
    }

    /// Integration phase: claim a station, integrate in batches, fan out.
    fn build_integration(
        &self,
        worker: usize,
        rect: GridRect,
        target: GridPos,
        request: Arc<Request>,
    ) {
        let request_id = request.id();
        let Some(source) = self.providers.get(&request.cost_provider()) else {
            // submit() validates ids against the same immutable table
            error!(
                worker,
                request_id,
                provider = request.cost_provider(),
                "Unknown cost provider"
            );
            request.cancel();
            self.return_reservation();
            return;
        };
        let provider = CostProvider::new(Arc::clone(source), rect.origin);

        let Some(station_id) = self.stations.acquire(provider, rect.size, rect.to_local(target))
        else {
            error!(worker, request_id, "No free station despite reservation, requeueing");
            self.return_reservation();
            self.enqueue(vec![Job::build_integration(rect, target, request)]);
            return;
        };
        debug!(worker, request_id, station = station_id.0, "Integration started");

        let started = Instant::now();
        let station = self.stations.get(station_id);
        loop {
            if !self.checkpoint(worker, &request) {
                debug!(worker, request_id, station = station_id.0, "Integration abandoned");
                self.release_station(station_id);
                return;
            }
            if station.integrate(self.config.integration_batch_cells) {
                break;
            }
        }
        self.metrics.lock().record_integration(started.elapsed());

        let chunks = row_chunks(rect.size.height, self.config.worker_threads);
        debug_assert!(!chunks.is_empty(), "validated fields have at least one row");
        station.set_remaining(chunks.len());
        let jobs = chunks
            .into_iter()
            .map(|(start_row, rows)| Job {
                kind: JobKind::ComputeFlow {
                    station: station_id,
                    preferred_worker: worker,
                    start_row,
                    rows,
                },
                request: Arc::clone(&request),
            })
            .collect::<Vec<_>>();
        debug!(
            worker,
            request_id,
            parts = jobs.len(),
            elapsed_us = started.elapsed().as_micros() as u64,
            "Integration complete"
        );
        self.enqueue(jobs);
    }

    /// Flow phase for one row range. Always finalizes, even when stopped or
    /// cancelled, so the station is released.
    fn compute_flow(
        &self,
        worker: usize,
        station_id: StationId,
        start_row: usize,
        rows: usize,
        request: &Request,
    ) {
        let station = self.stations.get(station_id);
        let end = start_row + rows;
        let mut row = start_row;
        while row < end {
            if !self.checkpoint(worker, request) {
                debug!(worker, request_id = request.id(), row, "Flow part cut short");
                break;
            }
            let batch_end = (row + self.config.flow_batch_rows).min(end);
            station.compute_rows(row, batch_end);
            row = batch_end;
        }
        self.metrics.lock().flow_jobs += 1;
        self.finish_flow_part(station_id, request);
    }

    fn finish_flow_part(&self, station_id: StationId, request: &Request) {
        let station = self.stations.get(station_id);
        if !station.finish_part() {
            return;
        }

        let field = station.take_field();
        if request.is_cancelled() {
            debug!(request_id = request.id(), "Dropping field of cancelled request");
        } else {
            request.complete(field);
            self.metrics.lock().record_completion();
            debug!(request_id = request.id(), station = station_id.0, "Flow field ready");
        }
        self.release_station(station_id);
    }
}
