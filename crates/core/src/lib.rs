// crates/core/src/lib.rs
pub mod config;
pub mod diagnostics;
pub mod error;
pub mod log;
pub mod monitor;
pub mod session;
pub mod status;

pub use config::*;
pub use diagnostics::*;
pub use error::*;
pub use log::*;
pub use monitor::*;
pub use session::*;
pub use status::*;
