pub mod config;
pub mod cost;
pub mod error;
pub mod flow;
pub mod grid;

pub use cost::{
    CostProvider, CostProviderId, CostProviderTable, CostSource, SharedCostSource, uniform_cost,
};
pub use error::*;
pub use flow::{CollectedField, Direction, FlowField};
pub use grid::{GridPos, GridRect, GridSize};

/// Identifier of a flow-field request, unique for the lifetime of a scheduler.
pub type RequestId = u64;
