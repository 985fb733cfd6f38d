use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::grid::GridPos;

/// Opaque key into the caller's cost-provider table.
pub type CostProviderId = u32;

/// Per-cell traversal cost lookup supplied by the caller.
///
/// Returns `None` for impassable cells. Implementations are read from worker
/// threads, so any state they consult must only be mutated while the
/// scheduler is paused.
pub trait CostSource: Send + Sync {
    fn cost_at(&self, pos: GridPos) -> Option<f32>;
}

impl<F> CostSource for F
where
    F: Fn(GridPos) -> Option<f32> + Send + Sync,
{
    fn cost_at(&self, pos: GridPos) -> Option<f32> {
        self(pos)
    }
}

pub type SharedCostSource = Arc<dyn CostSource>;

pub type CostProviderTable = HashMap<CostProviderId, SharedCostSource>;

/// A cost source shifted by a positional offset, so one global function can
/// serve fields anchored anywhere in the world.
#[derive(Clone)]
pub struct CostProvider {
    source: SharedCostSource,
    offset: GridPos,
}

impl CostProvider {
    pub fn new(source: SharedCostSource, offset: GridPos) -> Self {
        Self { source, offset }
    }

    pub fn offset(&self) -> GridPos {
        self.offset
    }

    /// Cost of a field-local cell.
    pub fn cost(&self, local: GridPos) -> Option<f32> {
        self.source.cost_at(local + self.offset)
    }
}

impl fmt::Debug for CostProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CostProvider")
            .field("offset", &self.offset)
            .finish_non_exhaustive()
    }
}

/// A source returning the same cost everywhere.
pub fn uniform_cost(cost: f32) -> SharedCostSource {
    Arc::new(move |_: GridPos| Some(cost))
}
