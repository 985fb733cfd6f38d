//! Scheduler runner -- worker pool, job execution and request lifecycle.
//!
//! Split into focused submodules:
//! - `core`: Scheduler struct, shared state, construction and shutdown
//! - `scheduling`: worker loop, job claiming and safe points
//! - `execution`: integration and flow-row phases
//! - `lifecycle`: submit, cancel, collect, advance, pause/unpause

mod core;
mod execution;
mod lifecycle;
mod scheduling;

pub use self::core::Scheduler;
