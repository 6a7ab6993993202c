// crates/types/src/job.rs
//! Read-only job summaries for listing endpoints.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::JobHandle;

/// Lifecycle of a job. Monotonic: `Running` only ever moves to `Finished`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "snake_case")]
pub enum JobStateKind {
    Running,
    Finished,
}

/// Point-in-time view of a job's status record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct JobSnapshot {
    pub handle: JobHandle,
    pub name: String,
    pub state: JobStateKind,
    pub processed: i64,
    pub total: i64,
    pub failed: bool,
    pub message_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_message: Option<String>,
    /// RFC 3339 timestamp after which the executor may reclaim the job.
    pub expiry: String,
}
