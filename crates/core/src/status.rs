// crates/core/src/status.rs
//! The job status record shared between the executor and the monitor.

use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use jobwatch_types::{JobHandle, JobSnapshot, JobStateKind};

use crate::log::MessageLog;

/// Running, or finished with or without failure.
///
/// `state` and `failed` share one atomic so the transition out of `Running`
/// happens once and fixes both at the same time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Lifecycle {
    Running = 0,
    Succeeded = 1,
    Failed = 2,
}

impl Lifecycle {
    fn from_u8(v: u8) -> Self {
        match v {
            0 => Self::Running,
            1 => Self::Succeeded,
            _ => Self::Failed,
        }
    }
}

/// Status record of one job.
///
/// Owned by the executor, which appends messages and advances the counters
/// and lifecycle. The monitor reads it, and its only write is
/// [`JobStatus::extend_expiry`], which can never shorten the expiry.
#[derive(Debug)]
pub struct JobStatus {
    handle: JobHandle,
    name: String,
    lifecycle: AtomicU8,
    processed: AtomicI64,
    total: AtomicI64,
    messages: MessageLog,
    expiry: RwLock<DateTime<Utc>>,
}

impl JobStatus {
    /// Create a running job. `total <= 0` means progress is indeterminate.
    pub fn new(handle: JobHandle, name: impl Into<String>, total: i64, expiry: DateTime<Utc>) -> Self {
        Self {
            handle,
            name: name.into(),
            lifecycle: AtomicU8::new(Lifecycle::Running as u8),
            processed: AtomicI64::new(0),
            total: AtomicI64::new(total),
            messages: MessageLog::new(),
            expiry: RwLock::new(expiry),
        }
    }

    pub fn handle(&self) -> JobHandle {
        self.handle
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // -- Lifecycle ------------------------------------------------------------

    fn lifecycle(&self) -> Lifecycle {
        Lifecycle::from_u8(self.lifecycle.load(Ordering::Acquire))
    }

    pub fn state(&self) -> JobStateKind {
        match self.lifecycle() {
            Lifecycle::Running => JobStateKind::Running,
            Lifecycle::Succeeded | Lifecycle::Failed => JobStateKind::Finished,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.state() == JobStateKind::Finished
    }

    pub fn failed(&self) -> bool {
        self.lifecycle() == Lifecycle::Failed
    }

    /// Move the job to `Finished`. Only the first call has any effect; returns
    /// whether this call was it.
    ///
    /// `expiry` is applied as an extension, so a retention bump an observer
    /// already made is kept.
    pub fn finish(&self, failed: bool, expiry: DateTime<Utc>) -> bool {
        let target = if failed {
            Lifecycle::Failed
        } else {
            Lifecycle::Succeeded
        };
        let won = self
            .lifecycle
            .compare_exchange(
                Lifecycle::Running as u8,
                target as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if won {
            self.extend_expiry(expiry);
        }
        won
    }

    // -- Counters -------------------------------------------------------------

    pub fn processed(&self) -> i64 {
        self.processed.load(Ordering::Relaxed)
    }

    pub fn total(&self) -> i64 {
        self.total.load(Ordering::Relaxed)
    }

    pub fn set_total(&self, total: i64) {
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn set_processed(&self, processed: i64) {
        self.processed.store(processed, Ordering::Relaxed);
    }

    /// Increment the processed counter and return the **new** value.
    pub fn increment_processed(&self) -> i64 {
        self.processed.fetch_add(1, Ordering::Relaxed) + 1
    }

    // -- Messages -------------------------------------------------------------

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub fn append_message(&self, message: impl Into<String>) {
        self.messages.append(message);
    }

    // -- Expiry ---------------------------------------------------------------

    pub fn expiry(&self) -> DateTime<Utc> {
        *self.expiry.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Move the expiry to `until` if that is later than the current one.
    /// Returns whether the expiry changed.
    pub fn extend_expiry(&self, until: DateTime<Utc>) -> bool {
        let mut expiry = self.expiry.write().unwrap_or_else(PoisonError::into_inner);
        if until > *expiry {
            *expiry = until;
            true
        } else {
            false
        }
    }

    /// Whether the executor may reclaim this record. Running jobs never expire.
    pub fn is_reclaimable(&self, now: DateTime<Utc>) -> bool {
        self.is_finished() && self.expiry() <= now
    }

    pub fn snapshot(&self) -> JobSnapshot {
        JobSnapshot {
            handle: self.handle,
            name: self.name.clone(),
            state: self.state(),
            processed: self.processed(),
            total: self.total(),
            failed: self.failed(),
            message_count: self.messages.len(),
            latest_message: self.messages.latest(),
            expiry: self.expiry().to_rfc3339(),
        }
    }
}

/// Access to job status records by handle, provided by the executor.
pub trait JobLookup: Send + Sync {
    /// `None` when the handle is unknown or the record has been reclaimed.
    fn get_job(&self, handle: JobHandle) -> Option<Arc<JobStatus>>;
}
