// THEORY:
// This file is the main entry point for the `siesta` library crate. It
// follows the standard Rust convention of using `lib.rs` to define the public
// API that will be exposed to external consumers (the routing/simulation
// layer).
//
// The primary goal is to export the `SleepScheduler` and its associated data
// structures (`SchedulerConfig`, `SensorNode`, `ScheduleLog`) as the clean,
// high-level interface for the entire scheduling engine. The coverage
// internals (`core_modules`) stay public for consumers that want to drive
// the rasterizer, region extractor, coverage oracle, or optimizer directly.

pub mod core_modules;
pub mod error;
pub mod parallel_scheduler;
pub mod scheduler;

pub use core_modules::coverage_oracle::{CoverageInfo, CoverageOracle};
pub use core_modules::grid::NodeId;
pub use core_modules::optimizer::{Candidate, OptimizerConfig, SleepOptimizer, Variant};
pub use error::CoverageError;
pub use parallel_scheduler::ParallelScheduler;
pub use scheduler::{ScheduleLog, SchedulerConfig, SensorNode, SleepScheduler};
