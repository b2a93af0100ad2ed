//! Error types for code generation.

use thiserror::Error;

/// Error type for code generation operations.
#[derive(Debug, Error)]
pub enum CodegenError {
    /// Schema parsing error.
    #[error("schema parse error: {0}")]
    Parse(#[from] cddlgen_schema::ParseError),

    /// Symbol resolution error.
    #[error("schema error: {0}")]
    Symbol(#[from] cddlgen_schema::SymbolError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Formatter error while writing output.
    #[error("format error: {0}")]
    Format(#[from] std::fmt::Error),

    /// An emit step failed.
    #[error("{step} failed: {source}")]
    Step {
        /// Name of the failing step.
        step: &'static str,
        /// Underlying error.
        #[source]
        source: Box<CodegenError>,
    },

    /// Two types claim the same numeric discriminant.
    #[error("duplicate discriminant {value} claimed by '{first}' and '{second}'")]
    DuplicateDiscriminant {
        /// Discriminant value.
        value: u64,
        /// First claimant.
        first: String,
        /// Second claimant.
        second: String,
    },

    /// Two declarations map to the same C++ identifier.
    #[error("C++ identifier '{identifier}' produced by both '{first}' and '{second}'")]
    DuplicateIdentifier {
        /// Generated identifier.
        identifier: String,
        /// First source name.
        first: String,
        /// Second source name.
        second: String,
    },

    /// Untagged union members that cannot be told apart on the wire.
    #[error("union '{type_name}': untagged members '{first}' and '{second}' share wire kind {wire_kind}")]
    AmbiguousUnion {
        /// Union type.
        type_name: String,
        /// First member.
        first: String,
        /// Second member.
        second: String,
        /// Shared wire kind.
        wire_kind: String,
    },

    /// Type with no C++ mapping.
    #[error("type '{type_name}' cannot be mapped to C++: {reason}")]
    UnsupportedType {
        /// CDDL type name.
        type_name: String,
        /// Why the mapping failed.
        reason: String,
    },

    /// Code generation error.
    #[error("generation error: {message}")]
    Generation {
        /// Error message.
        message: String,
    },
}

impl CodegenError {
    /// Creates a generation error with the given message.
    pub fn generation(message: impl Into<String>) -> Self {
        Self::Generation {
            message: message.into(),
        }
    }

    /// Creates an unsupported type error.
    pub fn unsupported_type(type_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::UnsupportedType {
            type_name: type_name.into(),
            reason: reason.into(),
        }
    }

    /// Creates a duplicate identifier error.
    pub fn duplicate_identifier(
        identifier: impl Into<String>,
        first: impl Into<String>,
        second: impl Into<String>,
    ) -> Self {
        Self::DuplicateIdentifier {
            identifier: identifier.into(),
            first: first.into(),
            second: second.into(),
        }
    }

    /// Wraps this error with the name of the emit step that produced it.
    #[must_use]
    pub fn in_step(self, step: &'static str) -> Self {
        Self::Step {
            step,
            source: Box::new(self),
        }
    }
}
