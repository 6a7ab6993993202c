// crates/server-jobs/src/lib.rs
//! Background job executor for jobwatch.
//!
//! Provides:
//! - `JobRunner` - spawns jobs, owns their status records, reclaims expired ones
//! - `JobContext` - the narrow write handle a running job reports through
//! - `RunnerConfig` - after-life and reaper cadence

pub mod config;
pub mod context;
pub mod runner;

pub use config::RunnerConfig;
pub use context::JobContext;
pub use runner::JobRunner;
