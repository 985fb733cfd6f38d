use std::cmp::Ordering;
use std::collections::BinaryHeap;

use flowfield_core::{CostProvider, Direction, GridPos, GridSize};

use super::FlowFieldCalculator;

const ORTHOGONAL: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

// Orthogonal first so ties resolve to straight moves.
const ALL_NEIGHBORS: [(i32, i32); 8] = [
    (1, 0),
    (-1, 0),
    (0, 1),
    (0, -1),
    (1, 1),
    (1, -1),
    (-1, 1),
    (-1, -1),
];

/// A priority queue entry for the integration frontier.
///
/// Uses reversed ordering so `BinaryHeap` (a max-heap) behaves as a min-heap.
#[derive(Debug, Clone, Copy)]
struct Frontier {
    cost: f32,
    index: usize,
}

impl PartialEq for Frontier {
    fn eq(&self, other: &Self) -> bool {
        self.cost.total_cmp(&other.cost) == Ordering::Equal
    }
}

impl Eq for Frontier {}

impl Ord for Frontier {
    fn cmp(&self, other: &Self) -> Ordering {
        other.cost.total_cmp(&self.cost)
    }
}

impl PartialOrd for Frontier {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Incremental Dijkstra integration field with 8-neighbour flow extraction.
///
/// Integration expands over the 4-neighbourhood, paying the cost of the cell
/// being entered. Cells whose cost is `None`, negative or non-finite are
/// impassable. Each flow vector points at the 8-neighbour with the lowest
/// integration value strictly below the cell's own.
#[derive(Debug, Default)]
pub struct DijkstraCalculator {
    provider: Option<CostProvider>,
    size: GridSize,
    integration: Vec<f32>,
    settled: Vec<bool>,
    frontier: BinaryHeap<Frontier>,
}

impl DijkstraCalculator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Accumulated cost from a field-local cell to the target.
    /// `f32::INFINITY` marks unreachable cells.
    pub fn integration_at(&self, local: GridPos) -> Option<f32> {
        if !self.size.contains(local) {
            return None;
        }
        Some(self.integration[self.size.index(local.x as usize, local.y as usize)])
    }

    fn neighbor(&self, x: usize, y: usize, dx: i32, dy: i32) -> Option<(GridPos, usize)> {
        let pos = GridPos::new(x as i32 + dx, y as i32 + dy);
        if !self.size.contains(pos) {
            return None;
        }
        Some((pos, self.size.index(pos.x as usize, pos.y as usize)))
    }
}

impl FlowFieldCalculator for DijkstraCalculator {
    fn reset(&mut self, provider: CostProvider, size: GridSize, target: GridPos) {
        let cells = size.cell_count();
        self.size = size;
        self.integration.clear();
        self.integration.resize(cells, f32::INFINITY);
        self.settled.clear();
        self.settled.resize(cells, false);
        self.frontier.clear();

        if size.contains(target) {
            let index = size.index(target.x as usize, target.y as usize);
            self.integration[index] = 0.0;
            self.frontier.push(Frontier { cost: 0.0, index });
        }
        self.provider = Some(provider);
    }

    fn integrate(&mut self, budget: usize) -> bool {
        let provider = match &self.provider {
            Some(p) => p.clone(),
            None => return true,
        };

        let mut settled_now = 0;
        while settled_now < budget {
            let Some(Frontier { cost, index }) = self.frontier.pop() else {
                return true;
            };

            // Stale entry superseded by a cheaper path
            if self.settled[index] || cost > self.integration[index] {
                continue;
            }
            self.settled[index] = true;
            settled_now += 1;

            let x = index % self.size.width;
            let y = index / self.size.width;
            for (dx, dy) in ORTHOGONAL {
                let Some((pos, next)) = self.neighbor(x, y, dx, dy) else {
                    continue;
                };
                if self.settled[next] {
                    continue;
                }
                let Some(step) = provider.cost(pos) else {
                    continue;
                };
                if !step.is_finite() || step < 0.0 {
                    continue;
                }

                let candidate = cost + step;
                if candidate < self.integration[next] {
                    self.integration[next] = candidate;
                    self.frontier.push(Frontier {
                        cost: candidate,
                        index: next,
                    });
                }
            }
        }

        self.frontier.is_empty()
    }

    fn flow_row(&self, y: usize, out: &mut [Direction]) {
        for (x, slot) in out.iter_mut().enumerate().take(self.size.width) {
            let own = self.integration[self.size.index(x, y)];
            if !own.is_finite() {
                *slot = Direction::ZERO;
                continue;
            }

            let mut best = own;
            let mut best_step = (0, 0);
            for (dx, dy) in ALL_NEIGHBORS {
                let Some((_, index)) = self.neighbor(x, y, dx, dy) else {
                    continue;
                };
                if self.integration[index] < best {
                    best = self.integration[index];
                    best_step = (dx, dy);
                }
            }
            *slot = Direction::toward(best_step.0, best_step.1);
        }
    }

    fn size(&self) -> GridSize {
        self.size
    }
}
