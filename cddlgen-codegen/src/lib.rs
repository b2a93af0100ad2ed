//! # cddlgen Codegen
//!
//! C++ code generation from CDDL schemas.
//!
//! This crate provides:
//! - Mapping of resolved CDDL types onto C++ types
//! - Whole-table validation (discriminants, union ambiguity, identifiers)
//! - Header and source emission targeting tinycbor
//! - Type-keyed message framing

pub mod cpp;
pub mod error;
pub mod generator;

pub use cpp::{CppSymbolTable, build_cpp_types, validate_cpp_types};
pub use error::CodegenError;
pub use generator::{EMIT_STEPS, GeneratedCode, Generator};

/// Generates C++ code from a CDDL schema string with default settings.
///
/// # Arguments
/// * `cddl` - CDDL schema content
///
/// # Returns
/// Generated header and source text.
///
/// # Errors
/// Returns `CodegenError` if parsing, resolution, validation or generation
/// fails.
pub fn generate_from_cddl(cddl: &str) -> Result<GeneratedCode, CodegenError> {
    let tree = cddlgen_schema::parse_schema(cddl)?;
    let symbols = cddlgen_schema::build_symbol_table(&tree)?;
    let table = build_cpp_types(&symbols)?;
    validate_cpp_types(&table)?;
    Generator::new(&table).generate()
}

/// Generates C++ code from a CDDL schema file with default settings.
///
/// # Arguments
/// * `path` - Path to the CDDL schema file
///
/// # Returns
/// Generated header and source text.
///
/// # Errors
/// Returns `CodegenError` if reading, parsing, or generation fails.
pub fn generate_from_file(path: &std::path::Path) -> Result<GeneratedCode, CodegenError> {
    let cddl = std::fs::read_to_string(path)?;
    generate_from_cddl(&cddl)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_from_cddl() {
        let code = generate_from_cddl("entry = { a: uint, b: text }").expect("Failed to generate");
        assert!(code.header.contains("struct Entry {\n  uint64_t a;\n  std::string b;\n};"));
        assert!(code.source.contains("bool DecodeEntry(CborValue* it, Entry* data) {"));
    }

    #[test]
    fn test_unresolved_reference() {
        let result = generate_from_cddl("entry = { a: foo }");
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("unresolved reference to 'foo'"));
    }

    #[test]
    fn test_duplicate_union_discriminant() {
        let source = "shape = #6.3(circle) / #6.3(square)\ncircle = { r: uint }\nsquare = { s: uint }\n";
        let message = generate_from_cddl(source)
            .err()
            .map(|e| e.to_string())
            .unwrap_or_default();
        assert!(message.contains("duplicate discriminant 3"));
    }

    #[test]
    fn test_syntax_error() {
        assert!(matches!(
            generate_from_cddl("entry = {"),
            Err(CodegenError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = generate_from_file(std::path::Path::new("/nonexistent/schema.cddl"));
        assert!(matches!(result, Err(CodegenError::Io(_))));
    }
}
