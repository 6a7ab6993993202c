// crates/core/src/log.rs
//! Append-only message log shared between a job and its observer.

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Mutex-guarded, append-only sequence of job messages.
///
/// The executor appends from its worker task while the observer reads during a
/// poll. Both go through the same lock, held only for the push or the copy, so
/// neither side can block the other for longer than a `Vec` clone of the new
/// range. Indices are stable once assigned.
#[derive(Debug, Default)]
pub struct MessageLog {
    entries: Mutex<Vec<String>>,
}

/// Messages copied out of the log in one lock acquisition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LogBatch {
    pub lines: Vec<String>,
    /// Log length observed when the batch was copied. The next batch starts here.
    pub end: usize,
}

impl LogBatch {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, message: impl Into<String>) {
        let message = message.into();
        self.entries().push(message);
    }

    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Most recent message, if any.
    pub fn latest(&self) -> Option<String> {
        self.entries().last().cloned()
    }

    /// Copy every message from `cursor` to the current end.
    ///
    /// The length is read once under the lock and bounds both the copy and the
    /// returned `end`, so a concurrent append lands entirely in the next batch.
    /// Returns `None` if `cursor` is past the end of the log.
    pub fn read_from(&self, cursor: usize) -> Option<LogBatch> {
        let entries = self.entries();
        let end = entries.len();
        let lines = entries.get(cursor..end)?.to_vec();
        Some(LogBatch { lines, end })
    }

    /// Copy of the whole log.
    pub fn snapshot(&self) -> Vec<String> {
        self.entries().clone()
    }

    fn entries(&self) -> MutexGuard<'_, Vec<String>> {
        // An append can't leave the Vec half-written, so a poisoned lock is
        // still safe to read.
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
