// crates/types/src/poll.rs
//! Poll responses sent to the observer.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Result of one poll of a job.
///
/// `next_poll_delay_ms` is `None` once `finished` is set: the observer must not
/// poll again after a finished result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct PollResult {
    /// Fraction processed, formatted `"0.00"`. Absent in indeterminate mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress_factor: Option<String>,
    pub summary_text: String,
    pub new_log_lines: Vec<String>,
    /// Cursor to send back with the next poll.
    pub cursor: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_poll_delay_ms: Option<u64>,
    pub finished: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_info: Option<FailureInfo>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct FailureInfo {
    /// Failure cause, clipped for display.
    pub summary_text: String,
    pub has_detail: bool,
    /// Untruncated failure cause, present when `has_detail` is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail_text: Option<String>,
}

/// Answer to a detail toggle request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum DetailResponse {
    /// The job is not in a failed terminal state; incremental mode was flipped.
    Toggled { expanded: bool },
    /// The job failed; full diagnostic text instead of a toggle.
    Detail { text: String },
}
