//! Header file emit steps.

use crate::cpp::types::{CppType, CppTypeKind};
use crate::cpp::validation::{PEEK_FUNCTION_NAME, TYPE_ENUM_NAME};
use crate::error::CodegenError;
use crate::generator::EmitContext;
use std::fmt::Write;

/// Banner at the top of both generated files.
pub(crate) const GENERATED_BANNER: &str = "// Generated by cddlgen. Do not edit.";

/// Writes the banner, include guard, includes and namespace opening.
///
/// # Errors
/// Returns `CodegenError::Format` if writing fails.
pub fn write_header_prologue(
    ctx: &EmitContext<'_>,
    out: &mut dyn Write,
) -> Result<(), CodegenError> {
    writeln!(out, "{GENERATED_BANNER}")?;
    writeln!(out)?;
    writeln!(out, "#ifndef {}", ctx.header_guard)?;
    writeln!(out, "#define {}", ctx.header_guard)?;
    writeln!(out)?;
    writeln!(out, "#include <cstddef>")?;
    writeln!(out, "#include <cstdint>")?;
    writeln!(out, "#include <string>")?;
    writeln!(out, "#include <variant>")?;
    writeln!(out, "#include <vector>")?;
    writeln!(out)?;
    writeln!(out, "#include <tinycbor/cbor.h>")?;
    writeln!(out)?;
    writeln!(out, "namespace {} {{", ctx.namespace)?;
    writeln!(out)?;
    Ok(())
}

/// Writes the type key enum and one definition per type, in dependency
/// order.
///
/// # Errors
/// Returns `CodegenError::Format` if writing fails.
pub fn write_type_definitions(
    ctx: &EmitContext<'_>,
    out: &mut dyn Write,
) -> Result<(), CodegenError> {
    if ctx.table.has_keyed_types() {
        writeln!(out, "// Type keys of messages framed as [type key, body].")?;
        writeln!(out, "enum class {TYPE_ENUM_NAME} : uint64_t {{")?;
        for ty in ctx.table.keyed_types() {
            if let Some(key) = ty.type_key {
                writeln!(out, "  {} = {key},", ty.type_enumerator())?;
            }
        }
        writeln!(out, "}};")?;
        writeln!(out)?;
    }

    for ty in ctx.table {
        write_type_definition(ty, out)?;
        writeln!(out)?;
    }
    Ok(())
}

fn write_type_definition(ty: &CppType, out: &mut dyn Write) -> Result<(), CodegenError> {
    match &ty.kind {
        CppTypeKind::Enum(members) => {
            writeln!(out, "enum class {} : uint64_t {{", ty.name)?;
            for member in members {
                writeln!(out, "  {} = {},", member.name, member.value)?;
            }
            writeln!(out, "}};")?;
        }
        CppTypeKind::Struct(def) => {
            writeln!(out, "struct {} {{", ty.name)?;
            for field in &def.fields {
                if field.optional {
                    writeln!(out, "  bool {} = false;", field.presence_flag())?;
                }
                writeln!(out, "  {} {};", field.ty.spelling(), field.name)?;
            }
            writeln!(out, "}};")?;
        }
        CppTypeKind::Union(members) => {
            let alternatives: Vec<_> = members.iter().map(|m| m.ty.spelling()).collect();
            writeln!(
                out,
                "using {} = std::variant<{}>;",
                ty.name,
                alternatives.join(", ")
            )?;
        }
        CppTypeKind::Alias(target) => {
            writeln!(out, "using {} = {};", ty.name, target.spelling())?;
        }
    }
    Ok(())
}

/// Writes encoder, decoder and equality declarations.
///
/// # Errors
/// Returns `CodegenError::Format` if writing fails.
pub fn write_function_declarations(
    ctx: &EmitContext<'_>,
    out: &mut dyn Write,
) -> Result<(), CodegenError> {
    for ty in ctx.table {
        let name = &ty.name;
        writeln!(out, "bool Encode{name}(const {name}& data, CborEncoder* encoder);")?;
        writeln!(out, "bool Decode{name}(CborValue* it, {name}* data);")?;
        if matches!(ty.kind, CppTypeKind::Struct(_)) {
            writeln!(out, "bool operator==(const {name}& lhs, const {name}& rhs);")?;
            writeln!(out, "bool operator!=(const {name}& lhs, const {name}& rhs);")?;
        }
        writeln!(out)?;
    }

    if !ctx.table.has_keyed_types() {
        return Ok(());
    }

    writeln!(
        out,
        "// Message encoders return the number of bytes written, -1 if the"
    )?;
    writeln!(
        out,
        "// value is invalid, or the negated required size if |length| is too"
    )?;
    writeln!(
        out,
        "// small. Message decoders return the number of bytes read or -1."
    )?;
    for ty in ctx.table.keyed_types() {
        let name = &ty.name;
        writeln!(
            out,
            "int64_t Encode{name}Message(const {name}& data, uint8_t* buffer, size_t length);"
        )?;
        writeln!(
            out,
            "int64_t Decode{name}Message(const uint8_t* buffer, size_t length, {name}* data);"
        )?;
    }
    writeln!(out)?;
    writeln!(out, "// Reads the type key of a framed message.")?;
    writeln!(
        out,
        "bool {PEEK_FUNCTION_NAME}(const uint8_t* buffer, size_t length, {TYPE_ENUM_NAME}* type);"
    )?;
    writeln!(out)?;
    Ok(())
}

/// Closes the namespace and the include guard.
///
/// # Errors
/// Returns `CodegenError::Format` if writing fails.
pub fn write_header_epilogue(
    ctx: &EmitContext<'_>,
    out: &mut dyn Write,
) -> Result<(), CodegenError> {
    writeln!(out, "}}  // namespace {}", ctx.namespace)?;
    writeln!(out)?;
    writeln!(out, "#endif  // {}", ctx.header_guard)?;
    Ok(())
}
