// crates/core/src/error.rs
use std::path::PathBuf;

use jobwatch_types::JobHandle;
use thiserror::Error;

/// Errors the monitor can return to its caller.
///
/// A failed *job* is not an error here: it is a normal terminal outcome and
/// is reported through [`crate::Completion::Failure`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MonitorError {
    /// The handle is unknown or the job record has already been reclaimed.
    #[error("Job not found: {handle}")]
    JobNotFound { handle: JobHandle },

    /// The observer claims to have seen more messages than the job has logged.
    #[error("Cursor {cursor} is past the end of job {handle}'s log ({len} messages)")]
    CursorOutOfRange {
        handle: JobHandle,
        cursor: usize,
        len: usize,
    },
}

/// Errors that can occur when loading configuration files
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config file not found: {path}")]
    NotFound { path: PathBuf },

    #[error("IO error reading config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed config {path}: {message}")]
    Malformed { path: PathBuf, message: String },
}

impl ConfigError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        match source.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound { path },
            _ => Self::Io { path, source },
        }
    }
}
