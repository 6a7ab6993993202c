// crates/types/src/lib.rs
//! Wire types for the jobwatch polling protocol.
//!
//! Everything here crosses the boundary to the observer (the progress dialog
//! or any other UI polling a job), so it is serde-serializable with camelCase
//! field names and can be exported as TypeScript via `ts-rs`.

pub mod handle;
pub mod job;
pub mod poll;

pub use handle::{JobHandle, ParseHandleError};
pub use job::{JobSnapshot, JobStateKind};
pub use poll::{DetailResponse, FailureInfo, PollResult};
