//! # cddlgen Schema
//!
//! CDDL schema parser and resolved type definitions.
//!
//! This crate provides:
//! - Tokenizing and parsing of the supported CDDL subset
//! - An arena-backed syntax tree
//! - Symbol table construction with reference resolution
//! - Schema validation (duplicates, cycles, unsupported constructs)

pub mod error;
pub mod lexer;
pub mod parser;
pub mod symbols;
pub mod syntax;
pub mod types;

pub use error::{ParseError, SymbolError};
pub use parser::parse_schema;
pub use symbols::{CddlSymbolTable, build_symbol_table};
pub use syntax::{MemberKey, NodeId, NodeKind, Occurrence, Span, SyntaxTree};
pub use types::{
    ArrayDef, CddlType, EnumDef, EnumMember, FieldKey, FieldType, Primitive, PrimitiveType,
    StructDef, StructEncoding, StructField, TypeEntry, UnionDef, UnionMember,
};
