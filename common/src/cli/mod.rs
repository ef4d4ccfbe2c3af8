//! CLI-related shared utilities.
//!
//! This module centralizes CLI policy so binaries don't duplicate behavior.

mod log_format;

pub use log_format::{LogFormat, LogOutput};
