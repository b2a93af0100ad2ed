//! Error type for the command line driver.

use cddlgen_codegen::CodegenError;
use cddlgen_schema::{ParseError, SymbolError};
use std::path::PathBuf;
use thiserror::Error;

/// Error type for a generator run.
#[derive(Debug, Error)]
pub enum CliError {
    /// Inconsistent command line arguments.
    #[error("invalid arguments: {message}")]
    Usage {
        /// What is wrong.
        message: String,
    },

    /// Input file could not be read.
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        /// Input path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Input file holds no rules.
    #[error("input file '{}' is empty", path.display())]
    EmptyInput {
        /// Input path.
        path: PathBuf,
    },

    /// Output file could not be written.
    #[error("failed to write '{}': {source}", path.display())]
    Write {
        /// Output path.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Schema syntax error.
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),

    /// Symbol table construction error.
    #[error("symbol table error: {0}")]
    Symbol(#[from] SymbolError),

    /// C++ type table failed validation.
    #[error("validation error: {0}")]
    Validation(#[source] CodegenError),

    /// Type mapping or emission error.
    #[error("code generation error: {0}")]
    Codegen(#[from] CodegenError),

    /// Logging could not be initialized.
    #[error("failed to initialize logging: {message}")]
    Logging {
        /// Error message.
        message: String,
    },
}

impl CliError {
    /// Creates a usage error.
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
        }
    }
}
