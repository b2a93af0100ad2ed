//! Validation of the C++ type table before emission.
//!
//! Checks properties that only hold once every type has been mapped:
//! discriminants are unique across the whole schema, untagged union members
//! can be told apart while decoding, and generated identifiers do not
//! collide.

use crate::cpp::source::HELPER_FUNCTIONS;
use crate::cpp::types::{CppSymbolTable, CppType, CppTypeKind};
use crate::error::CodegenError;
use std::collections::HashMap;

/// Name of the generated enum listing type keys.
pub const TYPE_ENUM_NAME: &str = "Type";

/// Name of the generated function reading a message's type key.
pub const PEEK_FUNCTION_NAME: &str = "PeekMessageType";

/// tinycbor types named by the generated code.
const TINYCBOR_TYPES: [&str; 5] = [
    "CborEncoder",
    "CborError",
    "CborParser",
    "CborTag",
    "CborValue",
];

/// Validates a C++ type table.
///
/// # Arguments
/// * `table` - The mapped types
///
/// # Returns
/// Ok(()) if the table can be emitted.
///
/// # Errors
/// Returns `CodegenError` on a duplicate discriminant, an ambiguous union
/// or a C++ identifier collision.
pub fn validate_cpp_types(table: &CppSymbolTable) -> Result<(), CodegenError> {
    validate_discriminants(table)?;
    validate_type_names(table)?;
    for ty in table {
        match &ty.kind {
            CppTypeKind::Struct(_) => validate_struct_members(ty)?,
            CppTypeKind::Enum(_) => validate_enumerators(ty)?,
            CppTypeKind::Union(_) => validate_union(ty)?,
            CppTypeKind::Alias(_) => {}
        }
    }
    tracing::debug!(types = table.len(), "validated C++ types");
    Ok(())
}

/// Type keys and union tags share one space; each value may name only one
/// type.
fn validate_discriminants(table: &CppSymbolTable) -> Result<(), CodegenError> {
    let mut claims: HashMap<u64, &str> = HashMap::new();

    for ty in table {
        if let Some(key) = ty.type_key {
            claim(&mut claims, key, &ty.cddl_name)?;
        }
        if let CppTypeKind::Union(members) = &ty.kind {
            for member in members {
                if let Some(tag) = member.discriminant {
                    claim(&mut claims, tag, &member.cddl_name)?;
                }
            }
        }
    }
    Ok(())
}

fn claim<'t>(
    claims: &mut HashMap<u64, &'t str>,
    value: u64,
    claimant: &'t str,
) -> Result<(), CodegenError> {
    match claims.get(&value) {
        Some(&first) if first != claimant => Err(CodegenError::DuplicateDiscriminant {
            value,
            first: first.to_string(),
            second: claimant.to_string(),
        }),
        Some(_) => Ok(()),
        None => {
            claims.insert(value, claimant);
            Ok(())
        }
    }
}

/// Every type name and generated function shares the namespace with the
/// helper routines and the tinycbor types they use.
fn validate_type_names(table: &CppSymbolTable) -> Result<(), CodegenError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for name in HELPER_FUNCTIONS {
        seen.insert(name.to_string(), "generated helper");
    }
    for name in TINYCBOR_TYPES {
        seen.insert(name.to_string(), "tinycbor");
    }
    if table.has_keyed_types() {
        seen.insert(TYPE_ENUM_NAME.to_string(), "type key enum");
        seen.insert(PEEK_FUNCTION_NAME.to_string(), "type key enum");
    }
    for ty in table {
        let names = std::iter::once(ty.name.clone()).chain(ty.function_names());
        for name in names {
            if let Some(first) = seen.get(name.as_str()) {
                return Err(CodegenError::duplicate_identifier(
                    name,
                    *first,
                    &ty.cddl_name,
                ));
            }
            seen.insert(name, &ty.cddl_name);
        }
    }
    Ok(())
}

fn validate_struct_members(ty: &CppType) -> Result<(), CodegenError> {
    let CppTypeKind::Struct(def) = &ty.kind else {
        return Ok(());
    };
    let mut seen: HashMap<String, &str> = HashMap::new();
    for field in &def.fields {
        let mut names = vec![field.name.clone()];
        if field.optional {
            names.push(field.presence_flag());
        }
        for name in names {
            if let Some(first) = seen.insert(name.clone(), &field.cddl_name) {
                return Err(CodegenError::duplicate_identifier(
                    format!("{}::{name}", ty.name),
                    first,
                    &field.cddl_name,
                ));
            }
        }
    }
    Ok(())
}

fn validate_enumerators(ty: &CppType) -> Result<(), CodegenError> {
    let CppTypeKind::Enum(members) = &ty.kind else {
        return Ok(());
    };
    let mut seen: HashMap<&str, &str> = HashMap::new();
    for member in members {
        if let Some(first) = seen.insert(&member.name, &member.cddl_name) {
            return Err(CodegenError::duplicate_identifier(
                format!("{}::{}", ty.name, member.name),
                first,
                &member.cddl_name,
            ));
        }
    }
    Ok(())
}

fn validate_union(ty: &CppType) -> Result<(), CodegenError> {
    let CppTypeKind::Union(members) = &ty.kind else {
        return Ok(());
    };

    let mut spellings: HashMap<String, &str> = HashMap::new();
    for member in members {
        if let Some(first) = spellings.insert(member.ty.spelling(), &member.cddl_name) {
            return Err(CodegenError::duplicate_identifier(
                member.ty.spelling(),
                first,
                &member.cddl_name,
            ));
        }
    }

    let untagged: Vec<_> = members.iter().filter(|m| m.discriminant.is_none()).collect();
    for (i, first) in untagged.iter().enumerate() {
        for second in &untagged[i + 1..] {
            let kind = first.ty.wire_kind();
            if kind.overlaps(second.ty.wire_kind()) {
                return Err(CodegenError::AmbiguousUnion {
                    type_name: ty.cddl_name.clone(),
                    first: first.cddl_name.clone(),
                    second: second.cddl_name.clone(),
                    wire_kind: kind.to_string(),
                });
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpp::types::build_cpp_types;
    use cddlgen_schema::{build_symbol_table, parse_schema};

    fn validate(source: &str) -> Result<(), CodegenError> {
        let tree = parse_schema(source)?;
        let symbols = build_symbol_table(&tree)?;
        let table = build_cpp_types(&symbols)?;
        validate_cpp_types(&table)
    }

    #[test]
    fn test_valid_schema() {
        let source = "; type key 10\nping = { 0: uint ; id }\n; type key 11\npong = { 0: uint ; id }\n";
        assert!(validate(source).is_ok());
    }

    #[test]
    fn test_type_key_collision() {
        let source = "; type key 10\nping = { 0: uint ; id }\n; type key 10\npong = { 0: uint ; id }\n";
        let result = validate(source);
        assert!(matches!(
            result,
            Err(CodegenError::DuplicateDiscriminant { value: 10, ref first, ref second })
                if first == "ping" && second == "pong"
        ));
    }

    #[test]
    fn test_union_tag_collides_with_type_key() {
        let source = "; type key 3\nping = { 0: uint ; id }\n\
                      shape = #6.3(circle) / #6.4(square)\n\
                      circle = { r: uint }\nsquare = { s: uint }\n";
        let result = validate(source);
        assert!(matches!(
            result,
            Err(CodegenError::DuplicateDiscriminant { value: 3, .. })
        ));
    }

    #[test]
    fn test_same_type_same_tag_in_two_unions() {
        let source = "a = #6.5(circle) / text\nb = #6.5(circle) / uint\ncircle = { r: uint }\n";
        assert!(validate(source).is_ok());
    }

    #[test]
    fn test_tags_shared_across_unions_by_different_types() {
        let source = "a = #6.5(circle) / text\nb = #6.5(square) / uint\n\
                      circle = { r: uint }\nsquare = { s: uint }\n";
        let result = validate(source);
        assert!(result.is_err());
        let message = result.err().map(|e| e.to_string()).unwrap_or_default();
        assert!(message.contains("duplicate discriminant 5"));
    }

    #[test]
    fn test_ambiguous_untagged_union() {
        let source = "a = { x: uint }\nb = { y: text }\nshape = a / b\n";
        assert!(matches!(
            validate(source),
            Err(CodegenError::AmbiguousUnion { .. })
        ));
    }

    #[test]
    fn test_untagged_union_distinct_kinds() {
        assert!(validate("id = uint / text / names\nnames = [* uint]").is_ok());
    }

    #[test]
    fn test_int_overlaps_uint() {
        assert!(matches!(
            validate("n = int / uint"),
            Err(CodegenError::AmbiguousUnion { .. })
        ));
    }

    #[test]
    fn test_text_and_tstr_collide() {
        assert!(matches!(
            validate("s = #6.1(text) / #6.2(tstr)"),
            Err(CodegenError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn test_type_name_collision() {
        assert!(matches!(
            validate("foo-bar = uint\nfoo_bar = text\n"),
            Err(CodegenError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn test_reserved_type_enum_name() {
        let source = "; type key 1\nping = { 0: uint ; id }\ntype = uint\n";
        assert!(matches!(
            validate(source),
            Err(CodegenError::DuplicateIdentifier { ref identifier, .. }) if identifier == "Type"
        ));
    }

    #[test]
    fn test_type_collides_with_helper() {
        let source = "double = float\nholder = { d: double }\n";
        assert!(matches!(
            validate(source),
            Err(CodegenError::DuplicateIdentifier { ref identifier, ref first, ref second })
                if identifier == "DecodeDouble" && first == "generated helper" && second == "double"
        ));
    }

    #[test]
    fn test_type_collides_with_generated_function() {
        let source = "foo = { a: uint }\nencode-foo = { b: uint }\n";
        assert!(matches!(
            validate(source),
            Err(CodegenError::DuplicateIdentifier { ref identifier, ref first, ref second })
                if identifier == "EncodeFoo" && first == "foo" && second == "encode-foo"
        ));
    }

    #[test]
    fn test_type_collides_with_message_function() {
        let source = "; type key 1\nping = { 0: uint ; id }\nencode-ping-message = uint\n";
        assert!(matches!(
            validate(source),
            Err(CodegenError::DuplicateIdentifier { ref identifier, .. })
                if identifier == "EncodePingMessage"
        ));
    }

    #[test]
    fn test_reserved_peek_function_name() {
        let source = "; type key 1\nping = { 0: uint ; id }\npeek-message-type = uint\n";
        assert!(matches!(
            validate(source),
            Err(CodegenError::DuplicateIdentifier { ref identifier, .. })
                if identifier == "PeekMessageType"
        ));
        assert!(validate("peek-message-type = uint\n").is_ok());
    }

    #[test]
    fn test_type_collides_with_tinycbor() {
        assert!(matches!(
            validate("cbor-value = uint\n"),
            Err(CodegenError::DuplicateIdentifier { ref identifier, .. }) if identifier == "CborValue"
        ));
    }

    #[test]
    fn test_presence_flag_collision() {
        let source = "s = {\n  ? b: uint\n  has-b: bool\n}\n";
        assert!(matches!(
            validate(source),
            Err(CodegenError::DuplicateIdentifier { .. })
        ));
    }

    #[test]
    fn test_field_name_collision_after_conversion() {
        let source = "s = {\n  foo-bar: uint\n  foo_bar: uint\n}\n";
        assert!(matches!(
            validate(source),
            Err(CodegenError::DuplicateIdentifier { .. })
        ));
    }
}
