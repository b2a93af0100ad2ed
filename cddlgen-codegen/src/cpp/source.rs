//! Source file emit steps.
//!
//! Encoders write tinycbor output and tolerate `CborErrorOutOfMemory` so the
//! message entry points can report the required buffer size. Decoders are
//! strict: unknown map keys, missing required fields and out-of-range
//! lengths all fail.

use crate::cpp::header::GENERATED_BANNER;
use crate::cpp::types::{
    CppField, CppFieldType, CppStruct, CppType, CppTypeKind, CppUnionMember,
};
use crate::cpp::validation::{PEEK_FUNCTION_NAME, TYPE_ENUM_NAME};
use crate::error::CodegenError;
use crate::generator::EmitContext;
use cddlgen_schema::{FieldKey, StructEncoding};
use std::fmt::{self, Write};

/// Helper routines shared by all encoders and decoders.
const HELPERS: &str = r#"#define CBOR_RETURN_ON_ERROR(stmt)                                 \
  do {                                                             \
    const CborError cbor_error = (stmt);                           \
    if (cbor_error != CborNoError &&                               \
        cbor_error != CborErrorOutOfMemory) {                      \
      return false;                                                \
    }                                                              \
  } while (0)

#define CBOR_RETURN_IF_ERROR(stmt)                                 \
  do {                                                             \
    if ((stmt) != CborNoError) {                                   \
      return false;                                                \
    }                                                              \
  } while (0)

inline bool DecodeUint(CborValue* it, uint64_t* out) {
  if (!cbor_value_is_unsigned_integer(it)) {
    return false;
  }
  CBOR_RETURN_IF_ERROR(cbor_value_get_uint64(it, out));
  CBOR_RETURN_IF_ERROR(cbor_value_advance_fixed(it));
  return true;
}

inline bool DecodeInt(CborValue* it, int64_t* out) {
  if (!cbor_value_is_integer(it)) {
    return false;
  }
  CBOR_RETURN_IF_ERROR(cbor_value_get_int64_checked(it, out));
  CBOR_RETURN_IF_ERROR(cbor_value_advance_fixed(it));
  return true;
}

inline bool DecodeNegativeInt(CborValue* it, int64_t* out) {
  if (!cbor_value_is_negative_integer(it)) {
    return false;
  }
  return DecodeInt(it, out);
}

inline bool DecodeBool(CborValue* it, bool* out) {
  if (!cbor_value_is_boolean(it)) {
    return false;
  }
  CBOR_RETURN_IF_ERROR(cbor_value_get_boolean(it, out));
  CBOR_RETURN_IF_ERROR(cbor_value_advance_fixed(it));
  return true;
}

inline bool DecodeDouble(CborValue* it, double* out) {
  if (cbor_value_is_double(it)) {
    CBOR_RETURN_IF_ERROR(cbor_value_get_double(it, out));
  } else if (cbor_value_is_float(it)) {
    float value = 0;
    CBOR_RETURN_IF_ERROR(cbor_value_get_float(it, &value));
    *out = value;
  } else {
    return false;
  }
  CBOR_RETURN_IF_ERROR(cbor_value_advance_fixed(it));
  return true;
}

inline bool DecodeText(CborValue* it, std::string* out) {
  if (!cbor_value_is_text_string(it)) {
    return false;
  }
  size_t length = 0;
  CBOR_RETURN_IF_ERROR(cbor_value_calculate_string_length(it, &length));
  out->resize(length);
  CBOR_RETURN_IF_ERROR(cbor_value_copy_text_string(
      it, length ? &(*out)[0] : nullptr, &length, it));
  return true;
}

inline bool DecodeBytes(CborValue* it, std::vector<uint8_t>* out) {
  if (!cbor_value_is_byte_string(it)) {
    return false;
  }
  size_t length = 0;
  CBOR_RETURN_IF_ERROR(cbor_value_calculate_string_length(it, &length));
  out->resize(length);
  CBOR_RETURN_IF_ERROR(cbor_value_copy_byte_string(
      it, length ? out->data() : nullptr, &length, it));
  return true;
}
"#;

/// Routines defined by [`HELPERS`].
pub(crate) const HELPER_FUNCTIONS: [&str; 7] = [
    "DecodeUint",
    "DecodeInt",
    "DecodeNegativeInt",
    "DecodeBool",
    "DecodeDouble",
    "DecodeText",
    "DecodeBytes",
];

/// Writes the banner, includes, helper macros and helper routines.
///
/// # Errors
/// Returns `CodegenError::Format` if writing fails.
pub fn write_source_prologue(
    ctx: &EmitContext<'_>,
    out: &mut dyn Write,
) -> Result<(), CodegenError> {
    writeln!(out, "{GENERATED_BANNER}")?;
    writeln!(out)?;
    writeln!(out, "#include \"{}\"", ctx.header_include)?;
    writeln!(out)?;
    writeln!(out, "#include <utility>")?;
    writeln!(out)?;
    writeln!(out, "namespace {} {{", ctx.namespace)?;
    writeln!(out, "namespace {{")?;
    writeln!(out)?;
    out.write_str(HELPERS)?;
    writeln!(out)?;
    writeln!(out, "}}  // namespace")?;
    writeln!(out)?;
    Ok(())
}

/// Writes one encoder per type, then the framed message encoders.
///
/// # Errors
/// Returns `CodegenError::Format` if writing fails.
pub fn write_encoders(ctx: &EmitContext<'_>, out: &mut dyn Write) -> Result<(), CodegenError> {
    for ty in ctx.table {
        let name = &ty.name;
        writeln!(
            out,
            "bool Encode{name}(const {name}& data, CborEncoder* encoder) {{"
        )?;
        match &ty.kind {
            CppTypeKind::Struct(def) => write_struct_encoder(def, out)?,
            CppTypeKind::Enum(_) => {
                writeln!(
                    out,
                    "  CBOR_RETURN_ON_ERROR(cbor_encode_uint(encoder, static_cast<uint64_t>(data)));"
                )?;
                writeln!(out, "  return true;")?;
            }
            CppTypeKind::Union(members) => write_union_encoder(members, out)?,
            CppTypeKind::Alias(target) => {
                encode_value(out, target, "data", "encoder", 1, 0)?;
                writeln!(out, "  return true;")?;
            }
        }
        writeln!(out, "}}")?;
        writeln!(out)?;
    }

    if ctx.table.has_keyed_types() {
        write_message_encoders(ctx, out)?;
    }
    Ok(())
}

fn write_struct_encoder(def: &CppStruct, out: &mut dyn Write) -> fmt::Result {
    match def.encoding {
        StructEncoding::Map => {
            let required = def.fields.iter().filter(|f| !f.optional).count();
            let has_optional = def.fields.iter().any(|f| f.optional);
            let count = if has_optional {
                writeln!(out, "  size_t count = {required};")?;
                for field in def.fields.iter().filter(|f| f.optional) {
                    writeln!(out, "  if (data.{}) {{", field.presence_flag())?;
                    writeln!(out, "    ++count;")?;
                    writeln!(out, "  }}")?;
                }
                "count".to_string()
            } else {
                required.to_string()
            };

            writeln!(out, "  CborEncoder map;")?;
            writeln!(
                out,
                "  CBOR_RETURN_ON_ERROR(cbor_encoder_create_map(encoder, &map, {count}));"
            )?;
            for field in &def.fields {
                let value = format!("data.{}", field.name);
                if field.optional {
                    writeln!(out, "  if (data.{}) {{", field.presence_flag())?;
                    write_key(out, &field.key, "&map", 2)?;
                    encode_value(out, &field.ty, &value, "&map", 2, 0)?;
                    writeln!(out, "  }}")?;
                } else {
                    write_key(out, &field.key, "&map", 1)?;
                    encode_value(out, &field.ty, &value, "&map", 1, 0)?;
                }
            }
            writeln!(
                out,
                "  CBOR_RETURN_ON_ERROR(cbor_encoder_close_container(encoder, &map));"
            )?;
        }
        StructEncoding::Array => {
            writeln!(out, "  CborEncoder array;")?;
            writeln!(
                out,
                "  CBOR_RETURN_ON_ERROR(cbor_encoder_create_array(encoder, &array, {}));",
                def.fields.len()
            )?;
            for field in &def.fields {
                let value = format!("data.{}", field.name);
                encode_value(out, &field.ty, &value, "&array", 1, 0)?;
            }
            writeln!(
                out,
                "  CBOR_RETURN_ON_ERROR(cbor_encoder_close_container(encoder, &array));"
            )?;
        }
    }
    writeln!(out, "  return true;")
}

fn write_key(out: &mut dyn Write, key: &FieldKey, encoder: &str, indent: usize) -> fmt::Result {
    let pad = "  ".repeat(indent);
    match key {
        FieldKey::Int(value) => writeln!(
            out,
            "{pad}CBOR_RETURN_ON_ERROR(cbor_encode_uint({encoder}, {value}));"
        ),
        FieldKey::Text(text) => writeln!(
            out,
            "{pad}CBOR_RETURN_ON_ERROR(cbor_encode_text_stringz({encoder}, {}));",
            string_literal(text)
        ),
        FieldKey::Position(_) => Ok(()),
    }
}

fn write_union_encoder(members: &[CppUnionMember], out: &mut dyn Write) -> fmt::Result {
    writeln!(out, "  switch (data.index()) {{")?;
    for (index, member) in members.iter().enumerate() {
        writeln!(out, "    case {index}: {{")?;
        if let Some(tag) = member.discriminant {
            writeln!(out, "      CBOR_RETURN_ON_ERROR(cbor_encode_tag(encoder, {tag}));")?;
        }
        let value = format!("std::get<{index}>(data)");
        encode_value(out, &member.ty, &value, "encoder", 3, 0)?;
        writeln!(out, "      return true;")?;
        writeln!(out, "    }}")?;
    }
    writeln!(out, "    default:")?;
    writeln!(out, "      return false;")?;
    writeln!(out, "  }}")
}

fn write_message_encoders(ctx: &EmitContext<'_>, out: &mut dyn Write) -> fmt::Result {
    writeln!(out, "namespace {{")?;
    writeln!(out)?;
    for ty in ctx.table.keyed_types() {
        let name = &ty.name;
        writeln!(
            out,
            "bool Encode{name}Frame(const {name}& data, CborEncoder* encoder) {{"
        )?;
        writeln!(out, "  CborEncoder frame;")?;
        writeln!(
            out,
            "  CBOR_RETURN_ON_ERROR(cbor_encoder_create_array(encoder, &frame, 2));"
        )?;
        writeln!(
            out,
            "  CBOR_RETURN_ON_ERROR(cbor_encode_uint(&frame, static_cast<uint64_t>({TYPE_ENUM_NAME}::{})));",
            ty.type_enumerator()
        )?;
        write_guard(out, "  ", &format!("!Encode{name}(data, &frame)"))?;
        writeln!(
            out,
            "  CBOR_RETURN_ON_ERROR(cbor_encoder_close_container(encoder, &frame));"
        )?;
        writeln!(out, "  return true;")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }
    writeln!(out, "}}  // namespace")?;
    writeln!(out)?;

    for ty in ctx.table.keyed_types() {
        let name = &ty.name;
        writeln!(
            out,
            "int64_t Encode{name}Message(const {name}& data, uint8_t* buffer, size_t length) {{"
        )?;
        writeln!(out, "  CborEncoder encoder;")?;
        writeln!(out, "  cbor_encoder_init(&encoder, buffer, length, 0);")?;
        writeln!(out, "  if (!Encode{name}Frame(data, &encoder)) {{")?;
        writeln!(out, "    return -1;")?;
        writeln!(out, "  }}")?;
        writeln!(
            out,
            "  const size_t extra = cbor_encoder_get_extra_bytes_needed(&encoder);"
        )?;
        writeln!(out, "  if (extra > 0) {{")?;
        writeln!(out, "    return -static_cast<int64_t>(length + extra);")?;
        writeln!(out, "  }}")?;
        writeln!(
            out,
            "  return static_cast<int64_t>(cbor_encoder_get_buffer_size(&encoder, buffer));"
        )?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }
    Ok(())
}

/// Writes one decoder per type, then the framed message decoders.
///
/// # Errors
/// Returns `CodegenError::Format` if writing fails.
pub fn write_decoders(ctx: &EmitContext<'_>, out: &mut dyn Write) -> Result<(), CodegenError> {
    for ty in ctx.table {
        let name = &ty.name;
        writeln!(out, "bool Decode{name}(CborValue* it, {name}* data) {{")?;
        match &ty.kind {
            CppTypeKind::Struct(def) => write_struct_decoder(def, out)?,
            CppTypeKind::Enum(members) => {
                writeln!(out, "  uint64_t value = 0;")?;
                write_guard(out, "  ", "!DecodeUint(it, &value)")?;
                writeln!(out, "  switch (value) {{")?;
                for member in members {
                    writeln!(out, "    case {}:", member.value)?;
                }
                if !members.is_empty() {
                    writeln!(out, "      *data = static_cast<{name}>(value);")?;
                    writeln!(out, "      return true;")?;
                }
                writeln!(out, "    default:")?;
                writeln!(out, "      return false;")?;
                writeln!(out, "  }}")?;
            }
            CppTypeKind::Union(members) => write_union_decoder(members, out)?,
            CppTypeKind::Alias(target) => {
                decode_value(out, target, "(*data)", "it", 1, 0)?;
                writeln!(out, "  return true;")?;
            }
        }
        writeln!(out, "}}")?;
        writeln!(out)?;
    }

    if ctx.table.has_keyed_types() {
        write_message_decoders(ctx, out)?;
    }
    Ok(())
}

fn write_struct_decoder(def: &CppStruct, out: &mut dyn Write) -> fmt::Result {
    match def.encoding {
        StructEncoding::Map => write_map_decoder(def, out)?,
        StructEncoding::Array => {
            write_guard(out, "  ", "!cbor_value_is_array(it)")?;
            writeln!(out, "  size_t length = 0;")?;
            writeln!(
                out,
                "  CBOR_RETURN_IF_ERROR(cbor_value_get_array_length(it, &length));"
            )?;
            write_guard(out, "  ", &format!("length != {}", def.fields.len()))?;
            writeln!(out, "  CborValue array;")?;
            writeln!(
                out,
                "  CBOR_RETURN_IF_ERROR(cbor_value_enter_container(it, &array));"
            )?;
            for field in &def.fields {
                let target = format!("data->{}", field.name);
                decode_value(out, &field.ty, &target, "&array", 1, 0)?;
            }
            writeln!(
                out,
                "  CBOR_RETURN_IF_ERROR(cbor_value_leave_container(it, &array));"
            )?;
        }
    }
    writeln!(out, "  return true;")
}

fn write_map_decoder(def: &CppStruct, out: &mut dyn Write) -> fmt::Result {
    let required: Vec<_> = def.fields.iter().filter(|f| !f.optional).collect();
    let total = def.fields.len();

    write_guard(out, "  ", "!cbor_value_is_map(it)")?;
    writeln!(out, "  size_t length = 0;")?;
    writeln!(
        out,
        "  CBOR_RETURN_IF_ERROR(cbor_value_get_map_length(it, &length));"
    )?;
    if required.len() == total {
        write_guard(out, "  ", &format!("length != {total}"))?;
    } else if required.is_empty() {
        write_guard(out, "  ", &format!("length > {total}"))?;
    } else {
        write_guard(
            out,
            "  ",
            &format!("length < {} || length > {total}", required.len()),
        )?;
    }
    writeln!(out, "  CborValue map;")?;
    writeln!(
        out,
        "  CBOR_RETURN_IF_ERROR(cbor_value_enter_container(it, &map));"
    )?;
    for field in &def.fields {
        if field.optional {
            writeln!(out, "  data->{} = false;", field.presence_flag())?;
        } else {
            writeln!(out, "  bool seen_{} = false;", field.name)?;
        }
    }

    writeln!(out, "  while (!cbor_value_at_end(&map)) {{")?;
    let int_fields: Vec<_> = def
        .fields
        .iter()
        .filter_map(|f| match &f.key {
            FieldKey::Int(key) => Some((key.to_string(), f)),
            _ => None,
        })
        .collect();
    let text_fields: Vec<_> = def
        .fields
        .iter()
        .filter_map(|f| match &f.key {
            FieldKey::Text(key) => Some((string_literal(key), f)),
            _ => None,
        })
        .collect();

    if !int_fields.is_empty() {
        writeln!(out, "    if (cbor_value_is_unsigned_integer(&map)) {{")?;
        writeln!(out, "      uint64_t key = 0;")?;
        write_guard(out, "      ", "!DecodeUint(&map, &key)")?;
        for (key, field) in &int_fields {
            writeln!(out, "      if (key == {key}) {{")?;
            write_map_field(out, field)?;
            writeln!(out, "      }}")?;
        }
        writeln!(out, "      return false;")?;
        writeln!(out, "    }}")?;
    }
    if !text_fields.is_empty() {
        writeln!(out, "    if (cbor_value_is_text_string(&map)) {{")?;
        writeln!(out, "      std::string key;")?;
        write_guard(out, "      ", "!DecodeText(&map, &key)")?;
        for (key, field) in &text_fields {
            writeln!(out, "      if (key == {key}) {{")?;
            write_map_field(out, field)?;
            writeln!(out, "      }}")?;
        }
        writeln!(out, "      return false;")?;
        writeln!(out, "    }}")?;
    }
    writeln!(out, "    return false;")?;
    writeln!(out, "  }}")?;

    if !required.is_empty() {
        let missing: Vec<_> = required
            .iter()
            .map(|f| format!("!seen_{}", f.name))
            .collect();
        write_guard(out, "  ", &missing.join(" || "))?;
    }
    writeln!(
        out,
        "  CBOR_RETURN_IF_ERROR(cbor_value_leave_container(it, &map));"
    )
}

fn write_map_field(out: &mut dyn Write, field: &CppField) -> fmt::Result {
    let flag = if field.optional {
        format!("data->{}", field.presence_flag())
    } else {
        format!("seen_{}", field.name)
    };
    write_guard(out, "        ", &flag)?;
    decode_value(out, &field.ty, &format!("data->{}", field.name), "&map", 4, 0)?;
    writeln!(out, "        {flag} = true;")?;
    writeln!(out, "        continue;")
}

fn write_union_decoder(members: &[CppUnionMember], out: &mut dyn Write) -> fmt::Result {
    let tagged: Vec<_> = members
        .iter()
        .enumerate()
        .filter_map(|(i, m)| m.discriminant.map(|tag| (i, tag, m)))
        .collect();

    if !tagged.is_empty() {
        writeln!(out, "  if (cbor_value_is_tag(it)) {{")?;
        writeln!(out, "    CborTag tag = 0;")?;
        writeln!(out, "    CBOR_RETURN_IF_ERROR(cbor_value_get_tag(it, &tag));")?;
        writeln!(out, "    CBOR_RETURN_IF_ERROR(cbor_value_advance_fixed(it));")?;
        writeln!(out, "    switch (tag) {{")?;
        for (index, tag, member) in &tagged {
            writeln!(out, "      case {tag}: {{")?;
            write_union_alternative(out, *index, member, 4)?;
            writeln!(out, "      }}")?;
        }
        writeln!(out, "      default:")?;
        writeln!(out, "        return false;")?;
        writeln!(out, "    }}")?;
        writeln!(out, "  }}")?;
    }

    for (index, member) in members.iter().enumerate() {
        if member.discriminant.is_some() {
            continue;
        }
        writeln!(out, "  if ({}) {{", member.ty.wire_kind().predicate("it"))?;
        write_union_alternative(out, index, member, 2)?;
        writeln!(out, "  }}")?;
    }
    writeln!(out, "  return false;")
}

fn write_union_alternative(
    out: &mut dyn Write,
    index: usize,
    member: &CppUnionMember,
    indent: usize,
) -> fmt::Result {
    let pad = "  ".repeat(indent);
    writeln!(out, "{pad}{} value{{}};", member.ty.spelling())?;
    decode_value(out, &member.ty, "value", "it", indent, 0)?;
    writeln!(out, "{pad}data->emplace<{index}>(std::move(value));")?;
    writeln!(out, "{pad}return true;")
}

fn write_message_decoders(ctx: &EmitContext<'_>, out: &mut dyn Write) -> fmt::Result {
    writeln!(out, "namespace {{")?;
    writeln!(out)?;
    for ty in ctx.table.keyed_types() {
        let name = &ty.name;
        writeln!(out, "bool Decode{name}Frame(CborValue* it, {name}* data) {{")?;
        write_guard(out, "  ", "!cbor_value_is_array(it)")?;
        writeln!(out, "  size_t length = 0;")?;
        writeln!(
            out,
            "  CBOR_RETURN_IF_ERROR(cbor_value_get_array_length(it, &length));"
        )?;
        write_guard(out, "  ", "length != 2")?;
        writeln!(out, "  CborValue frame;")?;
        writeln!(
            out,
            "  CBOR_RETURN_IF_ERROR(cbor_value_enter_container(it, &frame));"
        )?;
        writeln!(out, "  uint64_t type_key = 0;")?;
        write_guard(out, "  ", "!DecodeUint(&frame, &type_key)")?;
        write_guard(
            out,
            "  ",
            &format!(
                "type_key != static_cast<uint64_t>({TYPE_ENUM_NAME}::{})",
                ty.type_enumerator()
            ),
        )?;
        write_guard(out, "  ", &format!("!Decode{name}(&frame, data)"))?;
        writeln!(
            out,
            "  CBOR_RETURN_IF_ERROR(cbor_value_leave_container(it, &frame));"
        )?;
        writeln!(out, "  return true;")?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }
    writeln!(out, "}}  // namespace")?;
    writeln!(out)?;

    for ty in ctx.table.keyed_types() {
        let name = &ty.name;
        writeln!(
            out,
            "int64_t Decode{name}Message(const uint8_t* buffer, size_t length, {name}* data) {{"
        )?;
        writeln!(out, "  CborParser parser;")?;
        writeln!(out, "  CborValue it;")?;
        writeln!(
            out,
            "  if (cbor_parser_init(buffer, length, 0, &parser, &it) != CborNoError) {{"
        )?;
        writeln!(out, "    return -1;")?;
        writeln!(out, "  }}")?;
        writeln!(out, "  if (!Decode{name}Frame(&it, data)) {{")?;
        writeln!(out, "    return -1;")?;
        writeln!(out, "  }}")?;
        writeln!(
            out,
            "  return static_cast<int64_t>(cbor_value_get_next_byte(&it) - buffer);"
        )?;
        writeln!(out, "}}")?;
        writeln!(out)?;
    }

    writeln!(
        out,
        "bool {PEEK_FUNCTION_NAME}(const uint8_t* buffer, size_t length, {TYPE_ENUM_NAME}* type) {{"
    )?;
    writeln!(out, "  CborParser parser;")?;
    writeln!(out, "  CborValue it;")?;
    write_guard(
        out,
        "  ",
        "cbor_parser_init(buffer, length, 0, &parser, &it) != CborNoError",
    )?;
    write_guard(out, "  ", "!cbor_value_is_array(&it)")?;
    writeln!(out, "  CborValue frame;")?;
    writeln!(
        out,
        "  CBOR_RETURN_IF_ERROR(cbor_value_enter_container(&it, &frame));"
    )?;
    writeln!(out, "  uint64_t type_key = 0;")?;
    write_guard(out, "  ", "!DecodeUint(&frame, &type_key)")?;
    writeln!(out, "  switch (type_key) {{")?;
    for ty in ctx.table.keyed_types() {
        if let Some(key) = ty.type_key {
            writeln!(out, "    case {key}:")?;
        }
    }
    writeln!(out, "      *type = static_cast<{TYPE_ENUM_NAME}>(type_key);")?;
    writeln!(out, "      return true;")?;
    writeln!(out, "    default:")?;
    writeln!(out, "      return false;")?;
    writeln!(out, "  }}")?;
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

/// Writes `operator==` and `operator!=` for every struct.
///
/// # Errors
/// Returns `CodegenError::Format` if writing fails.
pub fn write_equality_operators(
    ctx: &EmitContext<'_>,
    out: &mut dyn Write,
) -> Result<(), CodegenError> {
    for ty in ctx.table {
        if let CppTypeKind::Struct(def) = &ty.kind {
            write_equality(ty, def, out)?;
        }
    }
    Ok(())
}

fn write_equality(ty: &CppType, def: &CppStruct, out: &mut dyn Write) -> fmt::Result {
    let name = &ty.name;
    if def.fields.is_empty() {
        writeln!(out, "bool operator==(const {name}&, const {name}&) {{")?;
        writeln!(out, "  return true;")?;
    } else {
        let terms: Vec<_> = def
            .fields
            .iter()
            .map(|f| {
                if f.optional {
                    let flag = f.presence_flag();
                    format!(
                        "lhs.{flag} == rhs.{flag} && (!lhs.{flag} || lhs.{0} == rhs.{0})",
                        f.name
                    )
                } else {
                    format!("lhs.{0} == rhs.{0}", f.name)
                }
            })
            .collect();
        writeln!(
            out,
            "bool operator==(const {name}& lhs, const {name}& rhs) {{"
        )?;
        writeln!(out, "  return {};", terms.join(" &&\n         "))?;
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    writeln!(
        out,
        "bool operator!=(const {name}& lhs, const {name}& rhs) {{"
    )?;
    writeln!(out, "  return !(lhs == rhs);")?;
    writeln!(out, "}}")?;
    writeln!(out)
}

/// Undefines the helper macros and closes the namespace.
///
/// # Errors
/// Returns `CodegenError::Format` if writing fails.
pub fn write_source_epilogue(
    ctx: &EmitContext<'_>,
    out: &mut dyn Write,
) -> Result<(), CodegenError> {
    writeln!(out, "#undef CBOR_RETURN_IF_ERROR")?;
    writeln!(out, "#undef CBOR_RETURN_ON_ERROR")?;
    writeln!(out)?;
    writeln!(out, "}}  // namespace {}", ctx.namespace)?;
    Ok(())
}

// Statement builders

fn write_guard(out: &mut dyn Write, pad: &str, condition: &str) -> fmt::Result {
    writeln!(out, "{pad}if ({condition}) {{")?;
    writeln!(out, "{pad}  return false;")?;
    writeln!(out, "{pad}}}")
}

fn length_condition(length: &str, min: u64, max: Option<u64>) -> Option<String> {
    let mut parts = Vec::new();
    if min > 0 {
        parts.push(format!("{length} < {min}"));
    }
    if let Some(max) = max {
        parts.push(format!("{length} > {max}"));
    }
    (!parts.is_empty()).then(|| parts.join(" || "))
}

/// Writes statements encoding `value` (an lvalue of type `ty`) into
/// `encoder`.
fn encode_value(
    out: &mut dyn Write,
    ty: &CppFieldType,
    value: &str,
    encoder: &str,
    indent: usize,
    depth: usize,
) -> fmt::Result {
    let pad = "  ".repeat(indent);
    match ty {
        CppFieldType::Uint64 => writeln!(
            out,
            "{pad}CBOR_RETURN_ON_ERROR(cbor_encode_uint({encoder}, {value}));"
        ),
        CppFieldType::Int64 => writeln!(
            out,
            "{pad}CBOR_RETURN_ON_ERROR(cbor_encode_int({encoder}, {value}));"
        ),
        CppFieldType::NegativeInt64 => {
            write_guard(out, &pad, &format!("{value} >= 0"))?;
            writeln!(
                out,
                "{pad}CBOR_RETURN_ON_ERROR(cbor_encode_int({encoder}, {value}));"
            )
        }
        CppFieldType::Bool => writeln!(
            out,
            "{pad}CBOR_RETURN_ON_ERROR(cbor_encode_boolean({encoder}, {value}));"
        ),
        CppFieldType::Double => writeln!(
            out,
            "{pad}CBOR_RETURN_ON_ERROR(cbor_encode_double({encoder}, {value}));"
        ),
        CppFieldType::String { max_size } => {
            if let Some(condition) = length_condition(&format!("{value}.size()"), 0, *max_size) {
                write_guard(out, &pad, &condition)?;
            }
            writeln!(
                out,
                "{pad}CBOR_RETURN_ON_ERROR(cbor_encode_text_string({encoder}, {value}.data(), {value}.size()));"
            )
        }
        CppFieldType::Bytes { max_size } => {
            if let Some(condition) = length_condition(&format!("{value}.size()"), 0, *max_size) {
                write_guard(out, &pad, &condition)?;
            }
            writeln!(
                out,
                "{pad}CBOR_RETURN_ON_ERROR(cbor_encode_byte_string({encoder}, {value}.data(), {value}.size()));"
            )
        }
        CppFieldType::Vector { element, min, max } => {
            let array = format!("array{depth}");
            let item = format!("item{depth}");
            writeln!(out, "{pad}{{")?;
            if let Some(condition) = length_condition(&format!("{value}.size()"), *min, *max) {
                write_guard(out, &format!("{pad}  "), &condition)?;
            }
            writeln!(out, "{pad}  CborEncoder {array};")?;
            writeln!(
                out,
                "{pad}  CBOR_RETURN_ON_ERROR(cbor_encoder_create_array({encoder}, &{array}, {value}.size()));"
            )?;
            writeln!(out, "{pad}  for (const auto& {item} : {value}) {{")?;
            encode_value(out, element, &item, &format!("&{array}"), indent + 2, depth + 1)?;
            writeln!(out, "{pad}  }}")?;
            writeln!(
                out,
                "{pad}  CBOR_RETURN_ON_ERROR(cbor_encoder_close_container({encoder}, &{array}));"
            )?;
            writeln!(out, "{pad}}}")
        }
        CppFieldType::Named { name, .. } => {
            write_guard(out, &pad, &format!("!Encode{name}({value}, {encoder})"))
        }
    }
}

/// Writes statements decoding from `it` into `target` (an lvalue of type
/// `ty`).
fn decode_value(
    out: &mut dyn Write,
    ty: &CppFieldType,
    target: &str,
    it: &str,
    indent: usize,
    depth: usize,
) -> fmt::Result {
    let pad = "  ".repeat(indent);
    match ty {
        CppFieldType::Uint64 => write_guard(out, &pad, &format!("!DecodeUint({it}, &{target})")),
        CppFieldType::Int64 => write_guard(out, &pad, &format!("!DecodeInt({it}, &{target})")),
        CppFieldType::NegativeInt64 => write_guard(
            out,
            &pad,
            &format!("!DecodeNegativeInt({it}, &{target})"),
        ),
        CppFieldType::Bool => write_guard(out, &pad, &format!("!DecodeBool({it}, &{target})")),
        CppFieldType::Double => {
            write_guard(out, &pad, &format!("!DecodeDouble({it}, &{target})"))
        }
        CppFieldType::String { max_size } => {
            write_guard(out, &pad, &format!("!DecodeText({it}, &{target})"))?;
            match length_condition(&format!("{target}.size()"), 0, *max_size) {
                Some(condition) => write_guard(out, &pad, &condition),
                None => Ok(()),
            }
        }
        CppFieldType::Bytes { max_size } => {
            write_guard(out, &pad, &format!("!DecodeBytes({it}, &{target})"))?;
            match length_condition(&format!("{target}.size()"), 0, *max_size) {
                Some(condition) => write_guard(out, &pad, &condition),
                None => Ok(()),
            }
        }
        CppFieldType::Vector { element, min, max } => {
            let inner = format!("{pad}  ");
            let count = format!("count{depth}");
            let array = format!("array{depth}");
            let index = format!("i{depth}");
            let item = format!("item{depth}");
            writeln!(out, "{pad}{{")?;
            write_guard(out, &inner, &format!("!cbor_value_is_array({it})"))?;
            writeln!(out, "{inner}size_t {count} = 0;")?;
            writeln!(
                out,
                "{inner}CBOR_RETURN_IF_ERROR(cbor_value_get_array_length({it}, &{count}));"
            )?;
            if let Some(condition) = length_condition(&count, *min, *max) {
                write_guard(out, &inner, &condition)?;
            }
            writeln!(out, "{inner}CborValue {array};")?;
            writeln!(
                out,
                "{inner}CBOR_RETURN_IF_ERROR(cbor_value_enter_container({it}, &{array}));"
            )?;
            writeln!(out, "{inner}{target}.clear();")?;
            writeln!(
                out,
                "{inner}for (size_t {index} = 0; {index} < {count}; ++{index}) {{"
            )?;
            writeln!(out, "{inner}  {} {item}{{}};", element.spelling())?;
            decode_value(out, element, &item, &format!("&{array}"), indent + 2, depth + 1)?;
            writeln!(out, "{inner}  {target}.push_back(std::move({item}));")?;
            writeln!(out, "{inner}}}")?;
            writeln!(
                out,
                "{inner}CBOR_RETURN_IF_ERROR(cbor_value_leave_container({it}, &{array}));"
            )?;
            writeln!(out, "{pad}}}")
        }
        CppFieldType::Named { name, .. } => {
            write_guard(out, &pad, &format!("!Decode{name}({it}, &{target})"))
        }
    }
}

/// Quotes `text` as a C++ string literal.
fn string_literal(text: &str) -> String {
    let mut literal = String::with_capacity(text.len() + 2);
    literal.push('"');
    for c in text.chars() {
        match c {
            '"' => literal.push_str("\\\""),
            '\\' => literal.push_str("\\\\"),
            '\n' => literal.push_str("\\n"),
            '\t' => literal.push_str("\\t"),
            c if c.is_control() => literal.push_str(&format!("\\x{:02x}", c as u32)),
            c => literal.push(c),
        }
    }
    literal.push('"');
    literal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cpp::naming::include_guard;
    use crate::cpp::types::{CppSymbolTable, build_cpp_types};
    use cddlgen_schema::{build_symbol_table, parse_schema};

    fn table(source: &str) -> CppSymbolTable {
        let tree = parse_schema(source).expect("Failed to parse");
        let symbols = build_symbol_table(&tree).expect("Failed to build symbols");
        build_cpp_types(&symbols).expect("Failed to map types")
    }

    fn context(table: &CppSymbolTable) -> EmitContext<'_> {
        EmitContext {
            table,
            namespace: "msgs",
            header_include: "messages.h",
            header_guard: include_guard("messages.h"),
        }
    }

    fn emit(
        step: fn(&EmitContext<'_>, &mut dyn Write) -> Result<(), CodegenError>,
        source: &str,
    ) -> String {
        let table = table(source);
        let mut out = String::new();
        step(&context(&table), &mut out).expect("Failed to emit");
        out
    }

    #[test]
    fn test_prologue_includes_header() {
        let out = emit(write_source_prologue, "id = uint");
        assert!(out.contains("#include \"messages.h\"\n"));
        assert!(out.contains("#define CBOR_RETURN_ON_ERROR(stmt)"));
        assert!(out.contains("inline bool DecodeText(CborValue* it, std::string* out) {"));
        assert!(out.trim_end().ends_with("}  // namespace"));
    }

    #[test]
    fn test_helper_functions_are_defined() {
        for name in HELPER_FUNCTIONS {
            assert!(HELPERS.contains(&format!("inline bool {name}(")), "{name} missing");
        }
        assert_eq!(HELPERS.matches("inline bool ").count(), HELPER_FUNCTIONS.len());
    }

    #[test]
    fn test_map_encoder() {
        let out = emit(write_encoders, "entry = { 0: uint ; a\n ? b: text\n}");
        let expected = "\
bool EncodeEntry(const Entry& data, CborEncoder* encoder) {
  size_t count = 1;
  if (data.has_b) {
    ++count;
  }
  CborEncoder map;
  CBOR_RETURN_ON_ERROR(cbor_encoder_create_map(encoder, &map, count));
  CBOR_RETURN_ON_ERROR(cbor_encode_uint(&map, 0));
  CBOR_RETURN_ON_ERROR(cbor_encode_uint(&map, data.a));
  if (data.has_b) {
    CBOR_RETURN_ON_ERROR(cbor_encode_text_stringz(&map, \"b\"));
    CBOR_RETURN_ON_ERROR(cbor_encode_text_string(&map, data.b.data(), data.b.size()));
  }
  CBOR_RETURN_ON_ERROR(cbor_encoder_close_container(encoder, &map));
  return true;
}
";
        assert!(out.contains(expected), "unexpected output:\n{out}");
    }

    #[test]
    fn test_map_decoder_checks_required_fields() {
        let out = emit(write_decoders, "entry = { a: uint, ? b: text }");
        assert!(out.contains("  if (length < 1 || length > 2) {\n"));
        assert!(out.contains("  bool seen_a = false;\n"));
        assert!(out.contains("  data->has_b = false;\n"));
        assert!(out.contains("      if (key == \"a\") {\n"));
        assert!(out.contains("        if (!DecodeUint(&map, &data->a)) {\n"));
        assert!(out.contains("  if (!seen_a) {\n"));
        assert!(!out.contains("cbor_value_is_unsigned_integer(&map)"));
    }

    #[test]
    fn test_array_struct_round_trip_shape() {
        let encoders = emit(write_encoders, "point = [x: int, y: int]");
        assert!(encoders.contains("cbor_encoder_create_array(encoder, &array, 2)"));
        assert!(encoders.contains("cbor_encode_int(&array, data.y)"));

        let decoders = emit(write_decoders, "point = [x: int, y: int]");
        assert!(decoders.contains("  if (length != 2) {\n"));
        assert!(decoders.contains("  if (!DecodeInt(&array, &data->x)) {\n"));
    }

    #[test]
    fn test_vector_bounds() {
        let out = emit(write_encoders, "names = [1*4 text .size 16]");
        assert!(out.contains("if (data.size() < 1 || data.size() > 4) {"));
        assert!(out.contains("for (const auto& item0 : data) {"));
        assert!(out.contains("if (item0.size() > 16) {"));

        let out = emit(write_decoders, "names = [1*4 text .size 16]");
        assert!(out.contains("if (count0 < 1 || count0 > 4) {"));
        assert!(out.contains("std::string item0{};"));
        assert!(out.contains("(*data).push_back(std::move(item0));"));
    }

    #[test]
    fn test_union_encoder_writes_tags() {
        let out = emit(
            write_encoders,
            "shape = #6.1(circle) / text\ncircle = { r: float }",
        );
        assert!(out.contains("  switch (data.index()) {\n    case 0: {\n"));
        assert!(out.contains("      CBOR_RETURN_ON_ERROR(cbor_encode_tag(encoder, 1));\n"));
        assert!(out.contains("      if (!EncodeCircle(std::get<0>(data), encoder)) {\n"));
        assert!(out.contains("std::get<1>(data).data()"));
    }

    #[test]
    fn test_union_decoder_dispatch() {
        let out = emit(
            write_decoders,
            "shape = #6.1(circle) / text\ncircle = { r: float }",
        );
        assert!(out.contains("  if (cbor_value_is_tag(it)) {\n"));
        assert!(out.contains("      case 1: {\n"));
        assert!(out.contains("        data->emplace<0>(std::move(value));\n"));
        assert!(out.contains("  if (cbor_value_is_text_string(it)) {\n"));
        assert!(out.contains("    data->emplace<1>(std::move(value));\n"));
    }

    #[test]
    fn test_enum_decoder() {
        let out = emit(write_decoders, "code = &(ok: 0, bad: 3)");
        assert!(out.contains("    case 0:\n    case 3:\n      *data = static_cast<Code>(value);\n"));
    }

    #[test]
    fn test_message_entry_points() {
        let source = "; type key 7\nping = { 0: uint ; id }";
        let encoders = emit(write_encoders, source);
        assert!(encoders.contains("bool EncodePingFrame(const Ping& data, CborEncoder* encoder) {"));
        assert!(encoders.contains("static_cast<uint64_t>(Type::kPing)"));
        assert!(encoders.contains(
            "int64_t EncodePingMessage(const Ping& data, uint8_t* buffer, size_t length) {"
        ));

        let decoders = emit(write_decoders, source);
        assert!(decoders.contains(
            "int64_t DecodePingMessage(const uint8_t* buffer, size_t length, Ping* data) {"
        ));
        assert!(decoders.contains("    case 7:\n      *type = static_cast<Type>(type_key);\n"));
    }

    #[test]
    fn test_equality_operators() {
        let out = emit(write_equality_operators, "entry = { a: uint, ? b: text }\nid = uint");
        let expected = "\
bool operator==(const Entry& lhs, const Entry& rhs) {
  return lhs.a == rhs.a &&
         lhs.has_b == rhs.has_b && (!lhs.has_b || lhs.b == rhs.b);
}
";
        assert!(out.contains(expected), "unexpected output:\n{out}");
        assert!(out.contains("bool operator!=(const Entry& lhs, const Entry& rhs) {"));
        assert!(!out.contains("const Id&"));
    }

    #[test]
    fn test_empty_struct_equality() {
        let out = emit(write_equality_operators, "empty = {}");
        assert!(out.contains("bool operator==(const Empty&, const Empty&) {\n  return true;\n}"));
    }

    #[test]
    fn test_epilogue_closes_namespace() {
        let out = emit(write_source_epilogue, "id = uint");
        assert!(out.ends_with("}  // namespace msgs\n"));
    }

    #[test]
    fn test_string_literal_escaping() {
        assert_eq!(string_literal("a"), "\"a\"");
        assert_eq!(string_literal("a\"b"), "\"a\\\"b\"");
        assert_eq!(string_literal("c\\d"), "\"c\\\\d\"");
    }
}
