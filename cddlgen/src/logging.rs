//! Diagnostics for the command line driver.
//!
//! The driver reports through the [`Logger`] trait so tests can capture what
//! it says; the binary plugs in [`TracingLogger`] on top of a
//! `tracing-subscriber` formatter writing to stderr.

use crate::error::CliError;
use std::cell::RefCell;
use std::io::IsTerminal;
use tracing_subscriber::{EnvFilter, fmt};

/// Sink for driver diagnostics.
pub trait Logger {
    /// Reports progress.
    fn log(&self, message: &str);

    /// Reports a failure.
    fn error(&self, message: &str);
}

/// Logger forwarding to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogger;

impl Logger for TracingLogger {
    fn log(&self, message: &str) {
        tracing::info!("{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!("{message}");
    }
}

/// Logger that keeps every message in memory.
#[derive(Debug, Default)]
pub struct CapturingLogger {
    messages: RefCell<Vec<String>>,
    errors: RefCell<Vec<String>>,
}

impl CapturingLogger {
    /// Creates an empty logger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Progress messages logged so far.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        self.messages.borrow().clone()
    }

    /// Errors logged so far.
    #[must_use]
    pub fn errors(&self) -> Vec<String> {
        self.errors.borrow().clone()
    }
}

impl Logger for CapturingLogger {
    fn log(&self, message: &str) {
        self.messages.borrow_mut().push(message.to_string());
    }

    fn error(&self, message: &str) {
        self.errors.borrow_mut().push(message.to_string());
    }
}

/// Returns the default filter directive for a `-v` count.
#[must_use]
pub fn default_directive(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Installs the global `tracing` subscriber.
///
/// `RUST_LOG` overrides the level chosen by `verbosity`.
///
/// # Errors
/// Returns `CliError::Logging` if a global subscriber is already set.
pub fn init(verbosity: u8) -> Result<(), CliError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive(verbosity)));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal())
        .try_init()
        .map_err(|e| CliError::Logging {
            message: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directive() {
        assert_eq!(default_directive(0), "warn");
        assert_eq!(default_directive(1), "info");
        assert_eq!(default_directive(2), "debug");
        assert_eq!(default_directive(9), "trace");
    }

    #[test]
    fn test_capturing_logger() {
        let logger = CapturingLogger::new();
        logger.log("one");
        logger.error("two");
        logger.log("three");
        assert_eq!(logger.messages(), vec!["one", "three"]);
        assert_eq!(logger.errors(), vec!["two"]);
    }
}
