//! Flow-field calculators.
//!
//! The scheduler drives a calculator in two phases: an incremental
//! integration pass that can be interrupted between batches, then flow
//! extraction over independent row ranges that may run on different threads
//! at the same time.

pub mod dijkstra_field;

use flowfield_core::{CostProvider, Direction, GridPos, GridSize};

pub use dijkstra_field::DijkstraCalculator;

/// Two-phase flow-field computation bound to one station.
pub trait FlowFieldCalculator: Send + Sync {
    /// Discard previous state and prepare a field of `size` cells toward the
    /// field-local `target`.
    fn reset(&mut self, provider: CostProvider, size: GridSize, target: GridPos);

    /// Settle at most `budget` cells of the integration field. Returns `true`
    /// once the field is complete.
    fn integrate(&mut self, budget: usize) -> bool;

    /// Write the flow directions of row `y` into `out` (`size().width` long).
    /// Only called after `integrate` reported completion.
    fn flow_row(&self, y: usize, out: &mut [Direction]);

    fn size(&self) -> GridSize;
}
