// crates/server-jobs/src/runner.rs
//! Central job runner that owns all job status records.

use std::any::Any;
use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use jobwatch_core::{JobLookup, JobStatus, MonitorConfig};
use jobwatch_types::{JobHandle, JobSnapshot, JobStateKind};
use tokio::task::{JoinError, JoinHandle};

use crate::config::RunnerConfig;
use crate::context::JobContext;

/// Central job runner that manages all background jobs.
///
/// Thread-safe via `Arc` wrapping. Call `start_job` to spawn async work with
/// progress tracking; observers reach the status records through
/// [`JobLookup::get_job`].
pub struct JobRunner {
    next_id: AtomicU64,
    jobs: RwLock<HashMap<JobHandle, Arc<JobStatus>>>,
    config: RunnerConfig,
    /// Prefix for messages logged when a job returns an error.
    error_marker: String,
    /// Prefix for messages logged when a job panics.
    exception_marker: String,
}

impl JobRunner {
    /// Create a new job runner with default settings.
    pub fn new() -> Self {
        Self::with_config(RunnerConfig::default())
    }

    pub fn with_config(config: RunnerConfig) -> Self {
        let monitor = MonitorConfig::default();
        Self {
            next_id: AtomicU64::new(1),
            jobs: RwLock::new(HashMap::new()),
            config,
            error_marker: monitor.error_marker,
            exception_marker: monitor.exception_marker,
        }
    }

    /// Write failures with the markers the monitor classifies them by.
    pub fn with_markers(mut self, monitor: &MonitorConfig) -> Self {
        self.error_marker = monitor.error_marker.clone();
        self.exception_marker = monitor.exception_marker.clone();
        self
    }

    /// Start a new background job.
    ///
    /// The closure `f` receives a [`JobContext`] for reporting progress.
    /// `Ok` finishes the job; `Err` logs the error with the error marker and
    /// fails it; a panic logs the panic payload with the exception marker and
    /// fails it. `total <= 0` starts the job in indeterminate mode.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_job<F, Fut>(&self, name: impl Into<String>, total: i64, f: F) -> JobHandle
    where
        F: FnOnce(JobContext) -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), String>> + Send + 'static,
    {
        let handle = JobHandle(self.next_id.fetch_add(1, Ordering::Relaxed));
        let after_life = self.config.after_life();
        let status = Arc::new(JobStatus::new(handle, name, total, Utc::now() + after_life));

        match self.jobs.write() {
            Ok(mut jobs) => {
                jobs.insert(handle, Arc::clone(&status));
            }
            Err(e) => tracing::error!("RwLock poisoned writing jobs map: {e}"),
        }
        tracing::debug!(job = %handle, name = status.name(), total, "Job started");

        let error_marker = self.error_marker.clone();
        let exception_marker = self.exception_marker.clone();
        let ctx = JobContext::new(Arc::clone(&status));
        tokio::spawn(async move {
            // Run the work in its own task so a panic surfaces as a JoinError
            // instead of tearing down this supervisor.
            let work = tokio::spawn(async move { f(ctx).await });
            let failure = match work.await {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(format!("{error_marker}{e}")),
                Err(join_err) => Some(format!("{exception_marker}{}", describe_join_error(join_err))),
            };
            let failed = failure.is_some();
            if let Some(message) = failure {
                tracing::warn!(job = %status.handle(), message = %message, "Job failed");
                status.append_message(message);
            }
            status.finish(failed, Utc::now() + after_life);
        });

        handle
    }

    /// Snapshots of all retained jobs, ordered by handle.
    pub fn jobs(&self) -> Vec<JobSnapshot> {
        let mut snapshots: Vec<JobSnapshot> = match self.jobs.read() {
            Ok(jobs) => jobs.values().map(|s| s.snapshot()).collect(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs: {e}");
                Vec::new()
            }
        };
        snapshots.sort_by_key(|s| s.handle);
        snapshots
    }

    /// Get all running jobs.
    pub fn active_jobs(&self) -> Vec<JobSnapshot> {
        self.jobs()
            .into_iter()
            .filter(|s| s.state == JobStateKind::Running)
            .collect()
    }

    /// Drop finished jobs whose expiry has passed. Returns how many were removed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> usize {
        let mut jobs = match self.jobs.write() {
            Ok(jobs) => jobs,
            Err(e) => {
                tracing::error!("RwLock poisoned writing jobs map: {e}");
                return 0;
            }
        };
        let before = jobs.len();
        jobs.retain(|handle, status| {
            let reclaim = status.is_reclaimable(now);
            if reclaim {
                tracing::info!(job = %handle, failed = status.failed(), "Reclaimed expired job");
            }
            !reclaim
        });
        before - jobs.len()
    }

    /// Periodically sweep expired jobs until the runner is dropped.
    pub fn spawn_reaper(self: &Arc<Self>) -> JoinHandle<()> {
        let runner = Arc::downgrade(self);
        let period = self.config.reap_interval();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                let Some(runner) = runner.upgrade() else {
                    break;
                };
                let reclaimed = runner.sweep_expired(Utc::now());
                if reclaimed > 0 {
                    tracing::debug!(reclaimed, "Reaper sweep");
                }
            }
        })
    }
}

impl Default for JobRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JobLookup for JobRunner {
    fn get_job(&self, handle: JobHandle) -> Option<Arc<JobStatus>> {
        match self.jobs.read() {
            Ok(jobs) => jobs.get(&handle).cloned(),
            Err(e) => {
                tracing::error!("RwLock poisoned reading jobs map: {e}");
                None
            }
        }
    }
}

fn describe_join_error(err: JoinError) -> String {
    if !err.is_panic() {
        return "job task was cancelled".to_string();
    }
    panic_message(err.into_panic())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "job panicked".to_string()
    }
}
