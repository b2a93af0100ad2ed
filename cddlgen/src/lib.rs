//! # cddlgen
//!
//! Command line driver for the CDDL to C++ generator.
//!
//! This crate provides:
//! - Argument parsing and run configuration
//! - The pipeline from schema file to generated header and source
//! - Logging setup and an injectable diagnostics sink

pub mod cli;
pub mod error;
pub mod logging;

pub use cli::{Args, Config, run};
pub use error::CliError;
pub use logging::{CapturingLogger, Logger, TracingLogger};
