//! Flow-field scheduler: a fixed worker pool turning requests into flow
//! fields in two phases, with deadline-biased priorities, pausing,
//! cooperative cancellation, and expiry of uncollected results.
//!
//! A request starts as one integration job. The worker that runs it claims a
//! station, builds the integration field in interruptible batches, then fans
//! the field out into one flow job per worker. The last flow job to finish
//! publishes the field on the request.

mod gate;
mod job;
pub mod metrics;
mod queue;
mod request;
pub mod runner;
mod station;
pub mod types;

pub use metrics::SchedulerMetrics;
pub use runner::Scheduler;
pub use types::{SchedulerConfig, SchedulerStatus, WorkerState};
