//! Crawl orchestration
//!
//! This module contains the worker pool that drives a run:
//! - the shared FIFO task queue
//! - the drain signal used for graceful cancellation
//! - the orchestrator that commits every per-URL outcome to the checkpoint store

mod drain;
mod orchestrator;
mod queue;

pub use drain::DrainSignal;
pub use orchestrator::{Orchestrator, RunOptions, RunSummary};
pub use queue::TaskQueue;
