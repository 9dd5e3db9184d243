//! Headless driver for the georadar sweep engine.
//!
//! Wires `georadar-core` to tokio timers, reads a JSON configuration and
//! writes render commands to the log or to stdout as JSON lines.

pub mod config;
pub mod error;
pub mod output;
pub mod session;
pub mod tokio_timer;

pub use config::ServerConfig;
pub use error::ServerError;
pub use session::{build_radar, run, RunSummary};
pub use tokio_timer::TokioScheduler;
