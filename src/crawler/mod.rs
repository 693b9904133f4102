//! Crawler module for turning a date window into stored articles
//!
//! This module contains the core collection logic, including:
//! - Frontier building and fair interleaving across archives
//! - Per-item and per-section state tracking
//! - Batch enrichment and persistence
//! - Overall run orchestration with cooperative stop

mod batch;
mod frontier;
mod orchestrator;
mod state;

pub use batch::{enrich, flush_batch, PendingBatch};
pub use frontier::{
    build_adapter_frontier, build_frontier, interleave, CrawlWindow, Frontier, FrontierItem,
};
pub use orchestrator::{Orchestrator, StopSignal, DEFAULT_BATCH_SIZE};
pub use state::{CounterSnapshot, CrawlCounters, ItemState, SectionState};

use crate::adapter::Registry;
use crate::config::Config;
use crate::report::RunReport;
use crate::HarvestError;

/// Runs one complete collection
///
/// This is the main entry point for a run. It will:
/// 1. Check archive names and the date window
/// 2. Open storage and build the decorated adapters
/// 3. Build the frontier and drain it with the worker pool
/// 4. Return the per-archive report
///
/// # Arguments
///
/// * `config` - The collector configuration
/// * `registry` - Archives available by name
/// * `stop` - Signal another task can use to end the run early
pub async fn crawl(
    config: &Config,
    registry: &Registry,
    stop: StopSignal,
) -> Result<RunReport, HarvestError> {
    Orchestrator::from_config(config, registry)?
        .with_stop_signal(stop)
        .run()
        .await
}
