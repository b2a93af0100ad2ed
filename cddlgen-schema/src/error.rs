//! Error types for schema parsing and symbol resolution.

use thiserror::Error;

/// Error type for CDDL parsing operations.
#[derive(Debug, Error)]
pub enum ParseError {
    /// Character that cannot start any token.
    #[error("unexpected character '{ch}' at {line}:{column}")]
    UnexpectedChar {
        /// Offending character.
        ch: char,
        /// Line (1-based).
        line: usize,
        /// Column (1-based).
        column: usize,
    },

    /// Text literal missing its closing quote.
    #[error("unterminated text literal starting at {line}:{column}")]
    UnterminatedText {
        /// Line (1-based).
        line: usize,
        /// Column (1-based).
        column: usize,
    },

    /// Numeric literal that does not fit in 64 bits or is malformed.
    #[error("invalid number '{text}' at {line}:{column}")]
    InvalidNumber {
        /// Source text of the number.
        text: String,
        /// Line (1-based).
        line: usize,
        /// Column (1-based).
        column: usize,
    },

    /// Token that does not fit the grammar at this position.
    #[error("expected {expected}, found {found} at {line}:{column}")]
    Unexpected {
        /// What the parser was looking for.
        expected: String,
        /// What it got instead.
        found: String,
        /// Line (1-based).
        line: usize,
        /// Column (1-based).
        column: usize,
    },

    /// Construct that is valid CDDL but outside the supported subset.
    #[error("unsupported construct {construct} at {line}:{column}")]
    Unsupported {
        /// Construct description.
        construct: String,
        /// Line (1-based).
        line: usize,
        /// Column (1-based).
        column: usize,
    },

    /// Same rule name defined twice.
    #[error("duplicate rule '{name}' at {line}:{column}")]
    DuplicateRule {
        /// Rule name.
        name: String,
        /// Line (1-based) of the second definition.
        line: usize,
        /// Column (1-based) of the second definition.
        column: usize,
    },
}

/// Error type for symbol table construction.
#[derive(Debug, Error)]
pub enum SymbolError {
    /// Reference to a name that is not defined anywhere.
    #[error("unresolved reference to '{name}' in '{context}'")]
    UnresolvedReference {
        /// Referenced name.
        name: String,
        /// Rule containing the reference.
        context: String,
    },

    /// Name defined more than once.
    #[error("duplicate definition of '{name}'")]
    DuplicateName {
        /// Duplicate name.
        name: String,
    },

    /// Two fields or members with the same name in one type.
    #[error("duplicate member '{member}' in '{type_name}'")]
    DuplicateMember {
        /// Owning type.
        type_name: String,
        /// Duplicate member name.
        member: String,
    },

    /// Two map members with the same key in one struct.
    #[error("duplicate key {key} in '{type_name}'")]
    DuplicateKey {
        /// Owning type.
        type_name: String,
        /// Key as written.
        key: String,
    },

    /// Two members sharing a numeric discriminant or enum value.
    #[error("duplicate discriminant {value} in '{type_name}' (members '{first}' and '{second}')")]
    DuplicateDiscriminant {
        /// Owning type.
        type_name: String,
        /// Discriminant value.
        value: u64,
        /// First member using the value.
        first: String,
        /// Second member using the value.
        second: String,
    },

    /// Discriminant or enum value below zero.
    #[error("negative value {value} for member '{member}' in '{type_name}'")]
    NegativeDiscriminant {
        /// Owning type.
        type_name: String,
        /// Member name.
        member: String,
        /// Offending value.
        value: i64,
    },

    /// Integer-keyed field without a trailing name comment.
    #[error("field with key {key} in '{type_name}' has no name comment")]
    UnnamedField {
        /// Owning type.
        type_name: String,
        /// Key value or position.
        key: String,
    },

    /// A group rule used where a type is required.
    #[error("group '{name}' used as a type in '{context}'")]
    GroupAsType {
        /// Group name.
        name: String,
        /// Rule containing the use.
        context: String,
    },

    /// Types or groups referring to themselves.
    #[error("circular reference detected: {path}")]
    CircularReference {
        /// Reference path, joined with " -> ".
        path: String,
    },

    /// Construct the generator cannot lower.
    #[error("unsupported construct in '{context}': {message}")]
    Unsupported {
        /// Rule being lowered.
        context: String,
        /// What is unsupported.
        message: String,
    },
}

impl ParseError {
    /// Creates an unexpected token error.
    pub fn unexpected(
        expected: impl Into<String>,
        found: impl Into<String>,
        line: usize,
        column: usize,
    ) -> Self {
        Self::Unexpected {
            expected: expected.into(),
            found: found.into(),
            line,
            column,
        }
    }

    /// Creates an unsupported construct error.
    pub fn unsupported(construct: impl Into<String>, line: usize, column: usize) -> Self {
        Self::Unsupported {
            construct: construct.into(),
            line,
            column,
        }
    }
}

impl SymbolError {
    /// Creates an unsupported construct error.
    pub fn unsupported(context: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unsupported {
            context: context.into(),
            message: message.into(),
        }
    }

    /// Creates an unresolved reference error.
    pub fn unresolved(name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::UnresolvedReference {
            name: name.into(),
            context: context.into(),
        }
    }

    /// Creates a duplicate member error.
    pub fn duplicate_member(type_name: impl Into<String>, member: impl Into<String>) -> Self {
        Self::DuplicateMember {
            type_name: type_name.into(),
            member: member.into(),
        }
    }
}
