use thiserror::Error;

use crate::cost::CostProviderId;
use crate::grid::{GridPos, GridRect};
use crate::RequestId;

#[derive(Error, Debug)]
pub enum FlowFieldError {
    #[error("cost provider table is empty")]
    NoCostProviders,

    #[error("concurrency limit must be positive, got {0}")]
    InvalidConcurrency(usize),

    #[error("unknown cost provider: {0}")]
    UnknownCostProvider(CostProviderId),

    #[error("target {target:?} lies outside field {rect:?}")]
    TargetOutOfBounds { target: GridPos, rect: GridRect },

    #[error("field {rect:?} does not fit the i32 coordinate range")]
    FieldOutOfRange { rect: GridRect },

    #[error("max iterations must be at least 1, got {0}")]
    InvalidMaxIterations(u32),

    #[error("request not found: {0}")]
    RequestNotFound(RequestId),

    #[error("scheduler is paused")]
    Paused,

    #[error("failed to spawn worker thread: {0}")]
    WorkerSpawn(std::io::Error),

    #[error("config error: {0}")]
    Config(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FlowFieldError>;
