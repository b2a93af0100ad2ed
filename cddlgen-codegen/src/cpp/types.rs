//! C++ type model.
//!
//! Maps the resolved CDDL symbol table onto C++ declarations. The resulting
//! [`CppSymbolTable`] lists every type after the types it refers to, which
//! is the order the emitter declares them in.

use crate::cpp::naming::{enumerator_name, to_pascal_case, to_snake_case};
use crate::error::CodegenError;
use cddlgen_schema::{
    CddlSymbolTable, CddlType, FieldKey, FieldType, Primitive, StructEncoding, TypeEntry,
};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// Major CBOR shape of an encoded value, used to tell untagged union
/// members apart while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireKind {
    /// Unsigned integer (major type 0).
    UnsignedInt,
    /// Negative integer (major type 1).
    NegativeInt,
    /// Either integer major type.
    Integer,
    /// Floating point.
    Float,
    /// `true` or `false`.
    Bool,
    /// Text string.
    Text,
    /// Byte string.
    Bytes,
    /// Array.
    Array,
    /// Map.
    Map,
    /// Any of several shapes (a nested union).
    Mixed,
}

impl WireKind {
    /// Returns true if a decoder could not tell the two kinds apart.
    #[must_use]
    pub fn overlaps(self, other: Self) -> bool {
        use WireKind::{Integer, Mixed, NegativeInt, UnsignedInt};
        self == other
            || matches!(
                (self, other),
                (Mixed, _)
                    | (_, Mixed)
                    | (Integer, UnsignedInt | NegativeInt)
                    | (UnsignedInt | NegativeInt, Integer)
            )
    }

    /// Returns the tinycbor condition that detects this kind on `it`.
    #[must_use]
    pub fn predicate(self, it: &str) -> String {
        match self {
            Self::UnsignedInt => format!("cbor_value_is_unsigned_integer({it})"),
            Self::NegativeInt => format!("cbor_value_is_negative_integer({it})"),
            Self::Integer => format!("cbor_value_is_integer({it})"),
            Self::Float => format!("(cbor_value_is_double({it}) || cbor_value_is_float({it}))"),
            Self::Bool => format!("cbor_value_is_boolean({it})"),
            Self::Text => format!("cbor_value_is_text_string({it})"),
            Self::Bytes => format!("cbor_value_is_byte_string({it})"),
            Self::Array => format!("cbor_value_is_array({it})"),
            Self::Map => format!("cbor_value_is_map({it})"),
            Self::Mixed => "true".to_string(),
        }
    }
}

impl fmt::Display for WireKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnsignedInt => "unsigned integer",
            Self::NegativeInt => "negative integer",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Text => "text string",
            Self::Bytes => "byte string",
            Self::Array => "array",
            Self::Map => "map",
            Self::Mixed => "mixed",
        };
        f.write_str(name)
    }
}

/// C++ type of a field, vector element, alias target or union alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CppFieldType {
    /// `uint64_t`.
    Uint64,
    /// `int64_t`.
    Int64,
    /// `int64_t` restricted to negative values.
    NegativeInt64,
    /// `bool`.
    Bool,
    /// `double`.
    Double,
    /// `std::string`, optionally size-bounded.
    String {
        /// Maximum length in bytes.
        max_size: Option<u64>,
    },
    /// `std::vector<uint8_t>`, optionally size-bounded.
    Bytes {
        /// Maximum length in bytes.
        max_size: Option<u64>,
    },
    /// `std::vector<T>`.
    Vector {
        /// Element type.
        element: Box<CppFieldType>,
        /// Minimum element count.
        min: u64,
        /// Maximum element count.
        max: Option<u64>,
    },
    /// A generated type.
    Named {
        /// C++ identifier of the type.
        name: String,
        /// Wire kind of the referenced type.
        wire: WireKind,
    },
}

impl CppFieldType {
    /// Returns the C++ spelling of the type.
    #[must_use]
    pub fn spelling(&self) -> String {
        match self {
            Self::Uint64 => "uint64_t".to_string(),
            Self::Int64 | Self::NegativeInt64 => "int64_t".to_string(),
            Self::Bool => "bool".to_string(),
            Self::Double => "double".to_string(),
            Self::String { .. } => "std::string".to_string(),
            Self::Bytes { .. } => "std::vector<uint8_t>".to_string(),
            Self::Vector { element, .. } => format!("std::vector<{}>", element.spelling()),
            Self::Named { name, .. } => name.clone(),
        }
    }

    /// Returns the CBOR shape values of this type are encoded as.
    #[must_use]
    pub fn wire_kind(&self) -> WireKind {
        match self {
            Self::Uint64 => WireKind::UnsignedInt,
            Self::Int64 => WireKind::Integer,
            Self::NegativeInt64 => WireKind::NegativeInt,
            Self::Bool => WireKind::Bool,
            Self::Double => WireKind::Float,
            Self::String { .. } => WireKind::Text,
            Self::Bytes { .. } => WireKind::Bytes,
            Self::Vector { .. } => WireKind::Array,
            Self::Named { wire, .. } => *wire,
        }
    }
}

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppField {
    /// Name in the schema.
    pub cddl_name: String,
    /// C++ member name.
    pub name: String,
    /// Wire key.
    pub key: FieldKey,
    /// Member type.
    pub ty: CppFieldType,
    /// Whether the field has a `has_` flag.
    pub optional: bool,
}

impl CppField {
    /// Name of the presence flag for optional fields.
    #[must_use]
    pub fn presence_flag(&self) -> String {
        format!("has_{}", self.name)
    }
}

/// A struct.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppStruct {
    /// Wire layout.
    pub encoding: StructEncoding,
    /// Fields in schema order.
    pub fields: Vec<CppField>,
}

/// An enumerator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppEnumMember {
    /// Name in the schema.
    pub cddl_name: String,
    /// C++ enumerator name.
    pub name: String,
    /// Value.
    pub value: u64,
}

/// A union alternative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppUnionMember {
    /// Name in the schema.
    pub cddl_name: String,
    /// Alternative type.
    pub ty: CppFieldType,
    /// CBOR tag, if tagged.
    pub discriminant: Option<u64>,
}

/// Shape of a generated type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CppTypeKind {
    /// `struct` with named members.
    Struct(CppStruct),
    /// `enum class : uint64_t`.
    Enum(Vec<CppEnumMember>),
    /// `std::variant` alias.
    Union(Vec<CppUnionMember>),
    /// `using Name = T;`.
    Alias(CppFieldType),
}

/// A generated C++ type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CppType {
    /// Rule name in the schema.
    pub cddl_name: String,
    /// C++ identifier.
    pub name: String,
    /// Type key for whole-message framing.
    pub type_key: Option<u64>,
    /// Type shape.
    pub kind: CppTypeKind,
}

impl CppType {
    /// Returns the CBOR shape values of this type are encoded as.
    #[must_use]
    pub fn wire_kind(&self) -> WireKind {
        match &self.kind {
            CppTypeKind::Struct(s) => match s.encoding {
                StructEncoding::Map => WireKind::Map,
                StructEncoding::Array => WireKind::Array,
            },
            CppTypeKind::Enum(_) => WireKind::UnsignedInt,
            CppTypeKind::Union(_) => WireKind::Mixed,
            CppTypeKind::Alias(ty) => ty.wire_kind(),
        }
    }

    /// Name of the `Type` enumerator for keyed types.
    #[must_use]
    pub fn type_enumerator(&self) -> String {
        format!("k{}", self.name.trim_start_matches('_'))
    }

    /// Names of the functions generated for this type.
    #[must_use]
    pub fn function_names(&self) -> Vec<String> {
        let name = &self.name;
        let mut names = vec![format!("Encode{name}"), format!("Decode{name}")];
        if self.type_key.is_some() {
            for suffix in ["Frame", "Message"] {
                names.push(format!("Encode{name}{suffix}"));
                names.push(format!("Decode{name}{suffix}"));
            }
        }
        names
    }

    /// Returns a field type referring to this type.
    #[must_use]
    pub fn as_field_type(&self) -> CppFieldType {
        CppFieldType::Named {
            name: self.name.clone(),
            wire: self.wire_kind(),
        }
    }
}

/// C++ types in dependency order.
#[derive(Debug, Clone, Default)]
pub struct CppSymbolTable {
    types: Vec<CppType>,
    index: HashMap<String, usize>,
}

impl CppSymbolTable {
    fn insert(&mut self, ty: CppType) {
        self.index.insert(ty.cddl_name.clone(), self.types.len());
        self.types.push(ty);
    }

    /// Looks up a type by its schema name.
    #[must_use]
    pub fn get(&self, cddl_name: &str) -> Option<&CppType> {
        self.index.get(cddl_name).map(|&idx| &self.types[idx])
    }

    /// Iterates over the types in dependency order.
    pub fn iter(&self) -> std::slice::Iter<'_, CppType> {
        self.types.iter()
    }

    /// Iterates over the types that carry a type key.
    pub fn keyed_types(&self) -> impl Iterator<Item = &CppType> + '_ {
        self.types.iter().filter(|t| t.type_key.is_some())
    }

    /// Returns true if any type carries a type key.
    #[must_use]
    pub fn has_keyed_types(&self) -> bool {
        self.keyed_types().next().is_some()
    }

    /// Returns the number of types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the table is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

impl<'t> IntoIterator for &'t CppSymbolTable {
    type Item = &'t CppType;
    type IntoIter = std::slice::Iter<'t, CppType>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Maps every CDDL type to its C++ representation.
///
/// # Arguments
/// * `symbols` - Resolved CDDL symbol table
///
/// # Returns
/// A table with one entry per CDDL type, each after its dependencies.
///
/// # Errors
/// Returns `CodegenError` if a type has no C++ mapping.
pub fn build_cpp_types(symbols: &CddlSymbolTable) -> Result<CppSymbolTable, CodegenError> {
    let mut mapper = TypeMapper {
        symbols,
        table: CppSymbolTable::default(),
        in_progress: HashSet::new(),
    };
    for entry in symbols {
        mapper.visit(entry)?;
    }
    tracing::debug!(types = mapper.table.len(), "built C++ type table");
    Ok(mapper.table)
}

struct TypeMapper<'a> {
    symbols: &'a CddlSymbolTable,
    table: CppSymbolTable,
    in_progress: HashSet<&'a str>,
}

impl<'a> TypeMapper<'a> {
    fn visit(&mut self, entry: &'a TypeEntry) -> Result<(), CodegenError> {
        if self.table.get(&entry.name).is_some() {
            return Ok(());
        }
        if !self.in_progress.insert(entry.name.as_str()) {
            return Err(CodegenError::generation(format!(
                "reference cycle through '{}'",
                entry.name
            )));
        }

        for dependency in entry.ty.dependencies() {
            let target = self.symbols.get(dependency).ok_or_else(|| {
                CodegenError::generation(format!(
                    "'{}' refers to unknown type '{dependency}'",
                    entry.name
                ))
            })?;
            self.visit(target)?;
        }

        let mapped = self.map_entry(entry)?;
        self.in_progress.remove(entry.name.as_str());
        self.table.insert(mapped);
        Ok(())
    }

    fn map_entry(&self, entry: &TypeEntry) -> Result<CppType, CodegenError> {
        let context = entry.name.as_str();
        let kind = match &entry.ty {
            CddlType::Primitive(p) => {
                CppTypeKind::Alias(self.map_field_type(context, &FieldType::Primitive(*p))?)
            }
            CddlType::Array(array) => CppTypeKind::Alias(
                self.map_field_type(context, &FieldType::Vector(array.clone()))?,
            ),
            CddlType::Alias(target) => CppTypeKind::Alias(
                self.map_field_type(context, &FieldType::Named(target.clone()))?,
            ),
            CddlType::Struct(def) => {
                let fields = def
                    .fields
                    .iter()
                    .map(|field| {
                        Ok(CppField {
                            cddl_name: field.name.clone(),
                            name: to_snake_case(&field.name),
                            key: field.key.clone(),
                            ty: self.map_field_type(context, &field.ty)?,
                            optional: field.optional,
                        })
                    })
                    .collect::<Result<Vec<_>, CodegenError>>()?;
                CppTypeKind::Struct(CppStruct {
                    encoding: def.encoding,
                    fields,
                })
            }
            CddlType::Enum(def) => CppTypeKind::Enum(
                def.members
                    .iter()
                    .map(|m| CppEnumMember {
                        cddl_name: m.name.clone(),
                        name: enumerator_name(&m.name),
                        value: m.value,
                    })
                    .collect(),
            ),
            CddlType::Union(def) => CppTypeKind::Union(
                def.members
                    .iter()
                    .map(|m| {
                        Ok(CppUnionMember {
                            cddl_name: m.name.clone(),
                            ty: self.map_field_type(context, &m.ty)?,
                            discriminant: m.discriminant,
                        })
                    })
                    .collect::<Result<Vec<_>, CodegenError>>()?,
            ),
        };

        Ok(CppType {
            cddl_name: entry.name.clone(),
            name: to_pascal_case(&entry.name),
            type_key: entry.type_key,
            kind,
        })
    }

    fn map_field_type(&self, context: &str, ty: &FieldType) -> Result<CppFieldType, CodegenError> {
        match ty {
            FieldType::Primitive(p) => match p.kind {
                Primitive::Uint => Ok(CppFieldType::Uint64),
                Primitive::Int => Ok(CppFieldType::Int64),
                Primitive::Nint => Ok(CppFieldType::NegativeInt64),
                Primitive::Bool => Ok(CppFieldType::Bool),
                Primitive::Float => Ok(CppFieldType::Double),
                Primitive::Text => Ok(CppFieldType::String {
                    max_size: p.max_size,
                }),
                Primitive::Bytes => Ok(CppFieldType::Bytes {
                    max_size: p.max_size,
                }),
                Primitive::Any => Err(CodegenError::unsupported_type(
                    context,
                    "'any' has no C++ mapping",
                )),
            },
            FieldType::Named(name) => self
                .table
                .get(name)
                .map(CppType::as_field_type)
                .ok_or_else(|| {
                    CodegenError::generation(format!(
                        "'{context}' refers to '{name}' before it is mapped"
                    ))
                }),
            FieldType::Vector(array) => Ok(CppFieldType::Vector {
                element: Box::new(self.map_field_type(context, &array.element)?),
                min: array.min,
                max: array.max,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cddlgen_schema::{build_symbol_table, parse_schema};

    fn cpp_types(source: &str) -> Result<CppSymbolTable, CodegenError> {
        let tree = parse_schema(source)?;
        let symbols = build_symbol_table(&tree)?;
        build_cpp_types(&symbols)
    }

    #[test]
    fn test_entry_struct_mapping() {
        let table = cpp_types("entry = { a: uint, b: text }").expect("Failed to map");
        let entry = table.get("entry").expect("missing entry");
        assert_eq!(entry.name, "Entry");

        let CppTypeKind::Struct(def) = &entry.kind else {
            panic!("expected struct");
        };
        assert_eq!(def.fields[0].ty.spelling(), "uint64_t");
        assert_eq!(def.fields[0].name, "a");
        assert_eq!(def.fields[1].ty.spelling(), "std::string");
    }

    #[test]
    fn test_dependency_order() {
        let source = "outer = { 0: middle ; m }\nmiddle = { 0: [* inner] ; items }\ninner = uint\n";
        let table = cpp_types(source).expect("Failed to map");
        let names: Vec<_> = table.iter().map(|t| t.cddl_name.as_str()).collect();
        assert_eq!(names, vec!["inner", "middle", "outer"]);
    }

    #[test]
    fn test_function_names() {
        let source = "; type key 7\nping = { 0: uint ; id }\nid = uint\n";
        let table = cpp_types(source).expect("Failed to map");
        let ping = table.get("ping").expect("missing ping");
        assert_eq!(
            ping.function_names(),
            vec![
                "EncodePing",
                "DecodePing",
                "EncodePingFrame",
                "DecodePingFrame",
                "EncodePingMessage",
                "DecodePingMessage",
            ]
        );
        let id = table.get("id").expect("missing id");
        assert_eq!(id.function_names(), vec!["EncodeId", "DecodeId"]);
    }

    #[test]
    fn test_count_preserved() {
        let source = "a = uint\nb = { x: a }\nc = [* b]\nd = &(one: 1)\ne = a / text\n";
        let table = cpp_types(source).expect("Failed to map");
        assert_eq!(table.len(), 5);
    }

    #[test]
    fn test_primitive_mapping() {
        let source = "s = {\n  a: int\n  b: bool\n  c: float64\n  d: bytes\n  e: nint\n}\n";
        let table = cpp_types(source).expect("Failed to map");
        let Some(CppType {
            kind: CppTypeKind::Struct(def),
            ..
        }) = table.get("s")
        else {
            panic!("expected struct");
        };
        let spellings: Vec<_> = def.fields.iter().map(|f| f.ty.spelling()).collect();
        assert_eq!(
            spellings,
            vec!["int64_t", "bool", "double", "std::vector<uint8_t>", "int64_t"]
        );
    }

    #[test]
    fn test_any_unsupported() {
        let result = cpp_types("s = { a: any }");
        assert!(matches!(result, Err(CodegenError::UnsupportedType { .. })));
    }

    #[test]
    fn test_named_field_carries_wire_kind() {
        let table = cpp_types("p = [x: int, y: int]\ns = { at: p }").expect("Failed to map");
        let Some(CppType {
            kind: CppTypeKind::Struct(def),
            ..
        }) = table.get("s")
        else {
            panic!("expected struct");
        };
        assert_eq!(def.fields[0].ty.wire_kind(), WireKind::Array);
        assert_eq!(def.fields[0].ty.spelling(), "P");
    }

    #[test]
    fn test_vector_spelling() {
        let table = cpp_types("names = [* text]").expect("Failed to map");
        let Some(CppType {
            kind: CppTypeKind::Alias(ty),
            ..
        }) = table.get("names")
        else {
            panic!("expected alias");
        };
        assert_eq!(ty.spelling(), "std::vector<std::string>");
    }

    #[test]
    fn test_enum_members() {
        let table = cpp_types("result = &(ok: 0, not-found: 4)").expect("Failed to map");
        let Some(CppType {
            kind: CppTypeKind::Enum(members),
            ..
        }) = table.get("result")
        else {
            panic!("expected enum");
        };
        assert_eq!(members[1].name, "kNotFound");
        assert_eq!(members[1].value, 4);
    }

    #[test]
    fn test_wire_kind_overlap() {
        assert!(WireKind::Integer.overlaps(WireKind::UnsignedInt));
        assert!(WireKind::Mixed.overlaps(WireKind::Text));
        assert!(!WireKind::Map.overlaps(WireKind::Array));
        assert!(!WireKind::UnsignedInt.overlaps(WireKind::NegativeInt));
    }
}
