// crates/server-jobs/src/context.rs
//! Write handle given to running jobs.

use std::sync::Arc;

use jobwatch_core::JobStatus;
use jobwatch_types::JobHandle;

/// Progress reporting for one running job.
///
/// Exposes only what the job itself may change: messages and counters.
/// Completion is decided by the runner from the job's return value.
#[derive(Debug, Clone)]
pub struct JobContext {
    status: Arc<JobStatus>,
}

impl JobContext {
    pub(crate) fn new(status: Arc<JobStatus>) -> Self {
        Self { status }
    }

    pub fn handle(&self) -> JobHandle {
        self.status.handle()
    }

    /// Append a line to the job's message log.
    pub fn log(&self, message: impl Into<String>) {
        self.status.append_message(message);
    }

    /// Set the unit count. `total <= 0` switches observers to indeterminate mode.
    pub fn set_total(&self, total: i64) {
        self.status.set_total(total);
    }

    pub fn set_processed(&self, processed: i64) {
        self.status.set_processed(processed);
    }

    /// Increment the processed counter and return the **new** value.
    pub fn increment(&self) -> i64 {
        self.status.increment_processed()
    }
}
