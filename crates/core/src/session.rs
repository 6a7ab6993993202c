// crates/core/src/session.rs
use jobwatch_types::JobHandle;
use serde::{Deserialize, Serialize};

/// Observer-side state for one monitored job.
///
/// Held by the caller for as long as it keeps polling and passed into every
/// [`crate::Monitor`] call; the monitor itself keeps nothing between polls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObserverSession {
    handle: JobHandle,
    last_delivered: usize,
    expanded: bool,
}

impl ObserverSession {
    /// A fresh session in summary-only mode.
    pub fn new(handle: JobHandle) -> Self {
        Self::resume(handle, 0, false)
    }

    /// Rebuild a session from state the observer carried between requests.
    pub fn resume(handle: JobHandle, last_delivered: usize, expanded: bool) -> Self {
        Self {
            handle,
            last_delivered,
            expanded,
        }
    }

    pub fn with_expanded(mut self, expanded: bool) -> Self {
        self.expanded = expanded;
        self
    }

    pub fn handle(&self) -> JobHandle {
        self.handle
    }

    /// Number of messages already delivered.
    pub fn last_delivered(&self) -> usize {
        self.last_delivered
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn set_expanded(&mut self, expanded: bool) {
        self.expanded = expanded;
    }

    /// Flip incremental mode and return the new value.
    pub fn toggle_expanded(&mut self) -> bool {
        self.expanded = !self.expanded;
        self.expanded
    }

    /// Record delivery up to `end`. The cursor never moves backwards.
    pub(crate) fn advance_to(&mut self, end: usize) {
        self.last_delivered = self.last_delivered.max(end);
    }
}
