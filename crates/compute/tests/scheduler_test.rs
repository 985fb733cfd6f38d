//! End-to-end scheduler behaviour: deadlines, collection, cancellation,
//! expiry, pausing and station backpressure, driven through the public API.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use flowfield_compute::{
    DijkstraCalculator, FlowFieldCalculator, Scheduler, SchedulerConfig, WorkerState,
};
use flowfield_core::{
    uniform_cost, CostProvider, CostProviderTable, Direction, FlowFieldError, GridPos, GridSize,
    SharedCostSource,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn uniform_providers() -> CostProviderTable {
    let mut table = HashMap::new();
    table.insert(0, uniform_cost(1.0));
    table
}

fn config(workers: usize, expiration_limit: u32) -> SchedulerConfig {
    SchedulerConfig {
        expiration_limit,
        ..SchedulerConfig::with_workers(workers)
    }
}

fn wait_until(mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        thread::sleep(Duration::from_millis(2));
    }
    cond()
}

/// Counts integration batches and flow rows. The calculator sleeps inside
/// each so tests can observe workers mid-batch.
#[derive(Default)]
struct Probe {
    in_flight: AtomicUsize,
    rows_done: AtomicUsize,
    batches_in_flight: AtomicUsize,
    batches_done: AtomicUsize,
}

struct SlowCalculator {
    inner: DijkstraCalculator,
    probe: Arc<Probe>,
    row_delay: Duration,
    batch_delay: Duration,
}

impl FlowFieldCalculator for SlowCalculator {
    fn reset(&mut self, provider: CostProvider, size: GridSize, target: GridPos) {
        self.inner.reset(provider, size, target);
    }

    fn integrate(&mut self, budget: usize) -> bool {
        self.probe.batches_in_flight.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.batch_delay);
        let done = self.inner.integrate(budget);
        self.probe.batches_done.fetch_add(1, Ordering::SeqCst);
        self.probe.batches_in_flight.fetch_sub(1, Ordering::SeqCst);
        done
    }

    fn flow_row(&self, y: usize, out: &mut [Direction]) {
        self.probe.in_flight.fetch_add(1, Ordering::SeqCst);
        thread::sleep(self.row_delay);
        self.inner.flow_row(y, out);
        self.probe.rows_done.fetch_add(1, Ordering::SeqCst);
        self.probe.in_flight.fetch_sub(1, Ordering::SeqCst);
    }

    fn size(&self) -> GridSize {
        self.inner.size()
    }
}

fn slow_scheduler(config: SchedulerConfig, row_delay: Duration) -> (Scheduler, Arc<Probe>) {
    slow_scheduler_with(config, row_delay, Duration::ZERO)
}

fn slow_scheduler_with(
    config: SchedulerConfig,
    row_delay: Duration,
    batch_delay: Duration,
) -> (Scheduler, Arc<Probe>) {
    let probe = Arc::new(Probe::default());
    let factory_probe = Arc::clone(&probe);
    let scheduler = Scheduler::with_calculator(uniform_providers(), config, move || {
        Box::new(SlowCalculator {
            inner: DijkstraCalculator::new(),
            probe: Arc::clone(&factory_probe),
            row_delay,
            batch_delay,
        }) as Box<dyn FlowFieldCalculator>
    })
    .unwrap();
    (scheduler, probe)
}

// ── Scenarios ───────────────────────────────────────────────────────

#[test]
fn four_by_four_field_toward_center() {
    let scheduler = Scheduler::new(uniform_providers(), config(2, 10)).unwrap();
    let id = scheduler
        .submit(GridPos::new(0, 0), GridSize::new(4, 4), GridPos::new(2, 2), 0, 3)
        .unwrap();
    assert_eq!(id, 0);

    for _ in 0..3 {
        scheduler.advance().unwrap();
    }

    let collected = scheduler.collect(0).unwrap().expect("field forced by deadline");
    assert_eq!(collected.origin, GridPos::new(0, 0));
    let field = collected.field;
    assert_eq!(field.size(), GridSize::new(4, 4));

    assert!(field.get(GridPos::new(2, 2)).unwrap().is_zero());
    assert_eq!(field.get(GridPos::new(1, 2)), Some(Direction::toward(1, 0)));
    assert_eq!(field.get(GridPos::new(3, 2)), Some(Direction::toward(-1, 0)));
    assert_eq!(field.get(GridPos::new(2, 1)), Some(Direction::toward(0, 1)));
    assert_eq!(field.get(GridPos::new(2, 3)), Some(Direction::toward(0, -1)));
    assert_eq!(field.get(GridPos::new(0, 0)), Some(Direction::toward(1, 1)));

    // Every non-target cell has somewhere to go on a uniform field
    let moving = field.directions().iter().filter(|d| !d.is_zero()).count();
    assert_eq!(moving, 15);
}

#[test]
fn deadline_forces_completion() {
    let scheduler = Scheduler::new(uniform_providers(), config(3, 16)).unwrap();
    let origin = GridPos::new(-50, 20);
    let id = scheduler
        .submit(origin, GridSize::new(96, 96), GridPos::new(0, 60), 0, 5)
        .unwrap();

    for _ in 0..5 {
        scheduler.advance().unwrap();
    }

    let collected = scheduler.collect(id).unwrap().expect("result after deadline");
    assert_eq!(collected.origin, origin);
    assert!(collected.direction_at(GridPos::new(0, 60)).unwrap().is_zero());
    assert_eq!(
        collected.direction_at(GridPos::new(-10, 60)),
        Some(Direction::toward(1, 0))
    );
}

#[test]
fn collect_delivers_at_most_once() {
    let scheduler = Scheduler::new(uniform_providers(), config(2, 10)).unwrap();
    let id = scheduler
        .submit(GridPos::default(), GridSize::new(8, 8), GridPos::new(1, 1), 0, 1)
        .unwrap();
    scheduler.advance().unwrap();

    assert!(scheduler.collect(id).unwrap().is_some());
    assert!(matches!(
        scheduler.collect(id),
        Err(FlowFieldError::RequestNotFound(_))
    ));
    assert_eq!(scheduler.metrics().requests_collected, 1);
}

#[test]
fn cancelled_requests_never_deliver_and_free_stations() {
    let workers = 2;
    let scheduler = Scheduler::new(uniform_providers(), config(workers, 10)).unwrap();

    for _ in 0..workers {
        let id = scheduler
            .submit(GridPos::default(), GridSize::new(64, 64), GridPos::new(5, 5), 0, 2)
            .unwrap();
        scheduler.cancel(id);
        scheduler.advance().unwrap();
        scheduler.advance().unwrap();
        assert!(matches!(
            scheduler.collect(id),
            Err(FlowFieldError::RequestNotFound(_))
        ));
    }

    assert!(wait_until(|| scheduler.free_stations() == workers
        && scheduler.pending_jobs() == 0));
    let metrics = scheduler.metrics();
    assert_eq!(metrics.requests_cancelled, workers as u64);
    assert_eq!(metrics.requests_collected, 0);
}

#[test]
fn cancel_mid_flow_still_releases_station() {
    let mut cfg = config(2, 10);
    cfg.flow_batch_rows = 1;
    let (scheduler, probe) = slow_scheduler(cfg, Duration::from_millis(5));
    let id = scheduler
        .submit(GridPos::default(), GridSize::new(4, 40), GridPos::new(0, 0), 0, 50)
        .unwrap();

    assert!(wait_until(|| probe.rows_done.load(Ordering::SeqCst) > 0));
    scheduler.cancel(id);

    assert!(wait_until(|| scheduler.free_stations() == 2 && scheduler.pending_jobs() == 0));
    // Cut short well before all 40 rows
    assert!(probe.rows_done.load(Ordering::SeqCst) < 40);
    assert_eq!(scheduler.metrics().requests_completed, 0);
}

#[test]
fn cancel_mid_integration_queues_no_flow_jobs() {
    let mut cfg = config(2, 10);
    cfg.integration_batch_cells = 4;
    let (scheduler, probe) = slow_scheduler_with(cfg, Duration::ZERO, Duration::from_millis(5));
    // 1024 cells at 4 per batch: far longer than the test waits
    let id = scheduler
        .submit(GridPos::default(), GridSize::new(32, 32), GridPos::new(16, 16), 0, 50)
        .unwrap();

    assert!(wait_until(|| probe.batches_done.load(Ordering::SeqCst) > 0));
    scheduler.cancel(id);

    assert!(wait_until(|| scheduler.free_stations() == 2
        && scheduler.pending_jobs() == 0
        && probe.batches_in_flight.load(Ordering::SeqCst) == 0));
    assert!(probe.batches_done.load(Ordering::SeqCst) < 256);
    assert_eq!(probe.rows_done.load(Ordering::SeqCst), 0);

    let metrics = scheduler.metrics();
    assert_eq!(metrics.integration_jobs, 0);
    assert_eq!(metrics.flow_jobs, 0);
    assert_eq!(metrics.requests_completed, 0);
}

#[test]
fn pause_waits_for_integration_batch() {
    let mut cfg = config(1, 10);
    cfg.integration_batch_cells = 4;
    cfg.pause_warn_ms = 1;
    let (scheduler, probe) = slow_scheduler_with(cfg, Duration::ZERO, Duration::from_millis(15));
    let id = scheduler
        .submit(GridPos::default(), GridSize::new(8, 8), GridPos::new(4, 4), 0, 1)
        .unwrap();

    assert!(wait_until(|| probe.batches_in_flight.load(Ordering::SeqCst) > 0));
    scheduler.pause();

    // The batch that was running has finished, no other has started
    assert_eq!(probe.batches_in_flight.load(Ordering::SeqCst), 0);
    let batches_at_pause = probe.batches_done.load(Ordering::SeqCst);
    assert!(batches_at_pause >= 1);
    let status = scheduler.status();
    assert!(status.workers.iter().all(|w| *w == WorkerState::PrepOrIdle));

    thread::sleep(Duration::from_millis(60));
    assert_eq!(probe.batches_done.load(Ordering::SeqCst), batches_at_pause);
    assert_eq!(probe.rows_done.load(Ordering::SeqCst), 0);

    scheduler.unpause();
    scheduler.advance().unwrap();
    let field = scheduler.collect(id).unwrap().expect("completed after unpause").field;
    assert!(probe.batches_done.load(Ordering::SeqCst) > batches_at_pause);
    assert_eq!(probe.rows_done.load(Ordering::SeqCst), 8);
    assert!(field.get(GridPos::new(4, 4)).unwrap().is_zero());
}

#[test]
fn uncollected_results_expire() {
    let scheduler = Scheduler::new(uniform_providers(), config(2, 1)).unwrap();
    let kept = scheduler
        .submit(GridPos::default(), GridSize::new(8, 8), GridPos::new(2, 2), 0, 1)
        .unwrap();
    let dropped = scheduler
        .submit(GridPos::default(), GridSize::new(8, 8), GridPos::new(6, 6), 0, 1)
        .unwrap();

    // Completion resets both counters to 0 and starts the grace period
    assert!(wait_until(|| scheduler.metrics().requests_completed == 2));

    // 0 -> -1: still inside the grace period
    scheduler.advance().unwrap();
    assert_eq!(scheduler.live_requests(), 2);
    assert!(scheduler.collect(kept).unwrap().is_some());

    // -1 -> -2: limit 1 reached, dropped uncollected
    scheduler.advance().unwrap();
    assert_eq!(scheduler.live_requests(), 0);

    assert!(matches!(
        scheduler.collect(dropped),
        Err(FlowFieldError::RequestNotFound(_))
    ));
    assert_eq!(scheduler.metrics().requests_expired, 1);
}

#[test]
fn pause_waits_for_batch_boundary() {
    let mut cfg = config(2, 10);
    cfg.flow_batch_rows = 1;
    cfg.pause_warn_ms = 1;
    let (scheduler, probe) = slow_scheduler(cfg, Duration::from_millis(15));
    let id = scheduler
        .submit(GridPos::default(), GridSize::new(6, 30), GridPos::new(3, 0), 0, 1)
        .unwrap();

    assert!(wait_until(|| probe.in_flight.load(Ordering::SeqCst) > 0));
    scheduler.pause();

    assert_eq!(probe.in_flight.load(Ordering::SeqCst), 0);
    let status = scheduler.status();
    assert!(status.paused);
    assert!(status.workers.iter().all(|w| *w == WorkerState::PrepOrIdle));

    let rows_at_pause = probe.rows_done.load(Ordering::SeqCst);
    thread::sleep(Duration::from_millis(60));
    assert_eq!(probe.rows_done.load(Ordering::SeqCst), rows_at_pause);

    scheduler.unpause();
    scheduler.advance().unwrap();
    let field = scheduler.collect(id).unwrap().expect("completed after unpause").field;
    assert_eq!(probe.rows_done.load(Ordering::SeqCst), 30);
    assert!(field.get(GridPos::new(3, 0)).unwrap().is_zero());
}

#[test]
fn single_station_serves_many_requests() {
    let scheduler = Scheduler::new(uniform_providers(), config(1, 10)).unwrap();
    let ids: Vec<_> = (0..5)
        .map(|i| {
            let target = GridPos::new(i * 10 + 3, 3);
            scheduler
                .submit(GridPos::new(i * 10, 0), GridSize::new(12, 12), target, 0, 1)
                .unwrap()
        })
        .collect();

    scheduler.advance().unwrap();
    for id in ids {
        let collected = scheduler.collect(id).unwrap().expect("every request completes");
        assert_eq!(collected.field.size(), GridSize::new(12, 12));
    }
    assert!(wait_until(|| scheduler.free_stations() == 1));
}

#[test]
fn offset_cost_source_is_read_in_world_space() {
    // Wall along world x == 103 except at world y == 7
    let terrain: SharedCostSource = Arc::new(|p: GridPos| {
        if p.x == 103 && p.y != 7 {
            None
        } else {
            Some(1.0)
        }
    });
    let mut providers = HashMap::new();
    providers.insert(9, terrain);
    let scheduler = Scheduler::new(providers, config(2, 10)).unwrap();

    let origin = GridPos::new(100, 0);
    let id = scheduler
        .submit(origin, GridSize::new(8, 8), GridPos::new(106, 0), 9, 1)
        .unwrap();
    scheduler.advance().unwrap();
    let collected = scheduler.collect(id).unwrap().unwrap();

    // Wall cells are unreachable
    assert!(collected.direction_at(GridPos::new(103, 2)).unwrap().is_zero());
    // West of the wall, near the top, the way out is downward toward the gap
    let west = collected.direction_at(GridPos::new(102, 0)).unwrap();
    assert!(west.y > 0.0, "expected to head toward the gap, got {west:?}");
}

#[test]
fn concurrent_submitters() {
    let scheduler = Arc::new(Scheduler::new(uniform_providers(), config(4, 100)).unwrap());
    let handles: Vec<_> = (0..4)
        .map(|t| {
            let scheduler = Arc::clone(&scheduler);
            thread::spawn(move || {
                (0..5)
                    .map(|i| {
                        let origin = GridPos::new(t * 100, i * 100);
                        let target = GridPos::new(origin.x + 10, origin.y + 10);
                        scheduler
                            .submit(origin, GridSize::new(20, 20), target, 0, 3)
                            .unwrap()
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let mut ids: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids, (0..20).collect::<Vec<_>>());

    for _ in 0..3 {
        scheduler.advance().unwrap();
    }
    for id in ids {
        assert!(scheduler.collect(id).unwrap().is_some());
    }
    assert!(wait_until(|| scheduler.metrics().requests_completed == 20));
}
