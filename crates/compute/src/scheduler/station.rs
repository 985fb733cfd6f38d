use std::sync::atomic::{AtomicUsize, Ordering};

use flowfield_core::{CostProvider, Direction, FlowField, GridPos, GridSize};
use parking_lot::{Mutex, RwLock};

use crate::algorithms::FlowFieldCalculator;

/// Stable handle to a station in the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct StationId(pub(crate) usize);

/// Reusable scratch context for one flow-field computation.
///
/// The integration phase holds the calculator's write lock one batch at a
/// time; flow-part jobs share its read lock and copy their rows into
/// `output`.
pub(crate) struct Station {
    calculator: RwLock<Box<dyn FlowFieldCalculator>>,
    output: Mutex<Vec<Direction>>,
    /// Flow-part jobs of the current field that have not finalized.
    remaining: AtomicUsize,
}

impl Station {
    fn new(calculator: Box<dyn FlowFieldCalculator>) -> Self {
        Self {
            calculator: RwLock::new(calculator),
            output: Mutex::new(Vec::new()),
            remaining: AtomicUsize::new(0),
        }
    }

    pub(crate) fn size(&self) -> GridSize {
        self.calculator.read().size()
    }

    fn reset(&self, provider: CostProvider, size: GridSize, target: GridPos) {
        self.calculator.write().reset(provider, size, target);
        let mut output = self.output.lock();
        output.clear();
        output.resize(size.cell_count(), Direction::ZERO);
    }

    /// Run one integration batch. Returns `true` once the field is complete.
    pub(crate) fn integrate(&self, budget: usize) -> bool {
        self.calculator.write().integrate(budget)
    }

    /// Compute flow rows `start..end` into the station's output buffer.
    pub(crate) fn compute_rows(&self, start: usize, end: usize) {
        let calculator = self.calculator.read();
        let width = calculator.size().width;
        let mut rows = vec![Direction::ZERO; (end - start) * width];
        for (chunk, y) in rows.chunks_mut(width.max(1)).zip(start..end) {
            calculator.flow_row(y, chunk);
        }
        drop(calculator);

        let mut output = self.output.lock();
        output[start * width..end * width].copy_from_slice(&rows);
    }

    pub(crate) fn set_remaining(&self, parts: usize) {
        self.remaining.store(parts, Ordering::Release);
    }

    /// Mark one flow part finished. Returns `true` for the last one.
    pub(crate) fn finish_part(&self) -> bool {
        self.remaining.fetch_sub(1, Ordering::AcqRel) == 1
    }

    /// Move the assembled field out of the station.
    pub(crate) fn take_field(&self) -> FlowField {
        let size = self.size();
        let directions = std::mem::take(&mut *self.output.lock());
        FlowField::from_directions(size, directions)
    }
}

/// Fixed arena of stations, one per worker. Never resized, so a
/// `StationId` stays valid for the pool's whole lifetime.
pub(crate) struct StationPool {
    stations: Box<[Station]>,
    occupied: Mutex<Vec<bool>>,
}

impl StationPool {
    pub(crate) fn new(count: usize, factory: impl Fn() -> Box<dyn FlowFieldCalculator>) -> Self {
        let stations: Vec<Station> = (0..count).map(|_| Station::new(factory())).collect();
        Self {
            stations: stations.into_boxed_slice(),
            occupied: Mutex::new(vec![false; count]),
        }
    }

    pub(crate) fn get(&self, id: StationId) -> &Station {
        &self.stations[id.0]
    }

    /// Claim a free station and prepare it for a new field.
    pub(crate) fn acquire(
        &self,
        provider: CostProvider,
        size: GridSize,
        target: GridPos,
    ) -> Option<StationId> {
        let id = {
            let mut occupied = self.occupied.lock();
            let index = occupied.iter().position(|busy| !busy)?;
            occupied[index] = true;
            StationId(index)
        };
        self.get(id).reset(provider, size, target);
        Some(id)
    }

    pub(crate) fn release(&self, id: StationId) {
        let mut occupied = self.occupied.lock();
        debug_assert!(occupied[id.0], "releasing free station {}", id.0);
        occupied[id.0] = false;
    }

    pub(crate) fn free_count(&self) -> usize {
        self.occupied.lock().iter().filter(|busy| !**busy).count()
    }
}
