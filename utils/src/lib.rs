//! Shared utilities for the Gavel governance engine.

pub mod logging;
pub mod spans;
pub mod time;

pub use logging::{init_logging, init_tracing, LogFormat};
pub use time::format_duration;
