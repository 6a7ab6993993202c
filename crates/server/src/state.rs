// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use jobwatch_core::{JobLookup, Monitor};
use jobwatch_server_jobs::JobRunner;

use crate::config::ServerConfig;

/// Shared application state accessible from all route handlers.
///
/// Holds no per-observer state: cursors and the expanded flag travel with each
/// request.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// Job executor owning every status record.
    pub jobs: Arc<JobRunner>,
    /// Poll handler reading from `jobs`.
    pub monitor: Monitor,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(config: &ServerConfig) -> Arc<Self> {
        let jobs = Arc::new(JobRunner::with_config(config.runner.clone()).with_markers(&config.monitor));
        Self::with_runner(jobs, config)
    }

    /// Build state around an existing runner.
    pub fn with_runner(jobs: Arc<JobRunner>, config: &ServerConfig) -> Arc<Self> {
        let lookup: Arc<dyn JobLookup> = jobs.clone();
        Arc::new(Self {
            start_time: Instant::now(),
            jobs,
            monitor: Monitor::new(lookup, config.monitor.clone()),
        })
    }

    /// Seconds since the server started.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
