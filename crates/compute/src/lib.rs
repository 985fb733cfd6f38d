pub mod algorithms;
pub mod scheduler;

pub use algorithms::{DijkstraCalculator, FlowFieldCalculator};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerMetrics, SchedulerStatus, WorkerState};
