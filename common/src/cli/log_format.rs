//! Standardized log output policy.
//!
//! Mirrors common Rust service behavior:
//! - Command-line choice wins.
//! - `NO_COLOR` (or `EMACS`) disables ANSI colors in pretty output.
//! - In `Auto`, an interactive stderr gets pretty output and anything else
//!   (pipes, container log collectors) gets one JSON object per line.

use std::env;

/// Requested log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Pretty on a TTY, JSON otherwise.
    Auto,

    /// Always human-readable.
    Pretty,

    /// Always JSON lines.
    Json,
}

/// Concrete output chosen after looking at the environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Human-readable output, optionally with ANSI colors.
    Pretty { ansi: bool },

    /// Structured JSON lines.
    Json,
}

impl LogFormat {
    // ---
    /// Resolves the format against the current process environment.
    pub fn resolve(self) -> LogOutput {
        // ---
        let colors_disabled = env::var_os("NO_COLOR").is_some() || env::var_os("EMACS").is_some();
        self.resolve_with(atty::is(atty::Stream::Stderr), colors_disabled)
    }

    /// Resolves the format from explicit inputs.
    pub fn resolve_with(self, stderr_is_tty: bool, colors_disabled: bool) -> LogOutput {
        // ---
        match self {
            LogFormat::Json => LogOutput::Json,
            LogFormat::Pretty => LogOutput::Pretty {
                ansi: stderr_is_tty && !colors_disabled,
            },
            LogFormat::Auto if stderr_is_tty => LogOutput::Pretty {
                ansi: !colors_disabled,
            },
            LogFormat::Auto => LogOutput::Json,
        }
    }
}
