// crates/core/src/config.rs
//! Monitor configuration.
//!
//! Every field has a default matching the protocol's fixed constants, so an
//! empty (or absent) config file yields the standard polling behavior. The
//! marker strings are configurable because job logs may be written in a
//! localized language.

use std::path::Path;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::diagnostics::ErrorMarkers;
use crate::error::ConfigError;

/// Poll delay while the job reports a known total.
pub const DETERMINATE_POLL_MS: u64 = 500;
/// Poll delay while the job has no known total.
pub const INDETERMINATE_POLL_MS: u64 = 1000;
/// Minimum time a failed job stays inspectable after it is observed.
pub const FAILURE_RETENTION_MINS: i64 = 30;
/// Grace period granted to a job when its observer closes.
pub const CLOSE_GRACE_SECS: i64 = 60;
/// Maximum characters of the failure cause shown in the summary line.
pub const SUMMARY_CLIP_LIMIT: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub determinate_poll_ms: u64,
    pub indeterminate_poll_ms: u64,
    pub failure_retention_mins: i64,
    pub close_grace_secs: i64,
    pub summary_clip_limit: usize,
    /// Shown when a failed job logged nothing, and as the failure title.
    pub fallback_error: String,
    pub exception_marker: String,
    pub error_marker: String,
    /// Separator used when a delivered batch is rendered as one text block.
    pub line_break: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            determinate_poll_ms: DETERMINATE_POLL_MS,
            indeterminate_poll_ms: INDETERMINATE_POLL_MS,
            failure_retention_mins: FAILURE_RETENTION_MINS,
            close_grace_secs: CLOSE_GRACE_SECS,
            summary_clip_limit: SUMMARY_CLIP_LIMIT,
            fallback_error: crate::diagnostics::GENERIC_ERROR.to_string(),
            exception_marker: "Exception: ".to_string(),
            error_marker: "Error: ".to_string(),
            line_break: "\n".to_string(),
        }
    }
}

impl MonitorConfig {
    pub fn determinate_poll(&self) -> Duration {
        Duration::from_millis(self.determinate_poll_ms)
    }

    pub fn indeterminate_poll(&self) -> Duration {
        Duration::from_millis(self.indeterminate_poll_ms)
    }

    pub fn failure_retention(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.failure_retention_mins)
    }

    pub fn close_grace(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.close_grace_secs)
    }

    pub fn error_markers(&self) -> ErrorMarkers<'_> {
        ErrorMarkers {
            exception: &self.exception_marker,
            error: &self.error_marker,
            fallback: &self.fallback_error,
        }
    }
}

/// Read and deserialize a TOML config file.
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;
    toml::from_str(&raw).map_err(|e| ConfigError::Malformed {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}
