//! Schema type definitions.
//!
//! This module contains the resolved representation of CDDL types stored in
//! the symbol table: primitives, structs, homogeneous arrays, enums and
//! discriminated unions.

use std::fmt;

/// CDDL prelude types understood by the generator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    /// Unsigned integer (`uint`).
    Uint,
    /// Negative integer (`nint`).
    Nint,
    /// Signed integer (`int`).
    Int,
    /// Floating point (`float`, `float16`, `float32`, `float64`).
    Float,
    /// Boolean (`bool`).
    Bool,
    /// UTF-8 text (`text`, `tstr`).
    Text,
    /// Byte string (`bytes`, `bstr`).
    Bytes,
    /// Any CBOR item (`any`).
    Any,
}

impl Primitive {
    /// Looks up a prelude type by its CDDL name.
    #[must_use]
    pub fn from_cddl_name(name: &str) -> Option<Self> {
        match name {
            "uint" => Some(Self::Uint),
            "nint" => Some(Self::Nint),
            "int" => Some(Self::Int),
            "float" | "float16" | "float32" | "float64" => Some(Self::Float),
            "bool" => Some(Self::Bool),
            "text" | "tstr" => Some(Self::Text),
            "bytes" | "bstr" => Some(Self::Bytes),
            "any" => Some(Self::Any),
            _ => None,
        }
    }

    /// Returns the canonical CDDL name.
    #[must_use]
    pub const fn cddl_name(&self) -> &'static str {
        match self {
            Self::Uint => "uint",
            Self::Nint => "nint",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Text => "text",
            Self::Bytes => "bytes",
            Self::Any => "any",
        }
    }

    /// Returns true if `.size` may be applied to this type.
    #[must_use]
    pub const fn is_sizable(&self) -> bool {
        matches!(self, Self::Text | Self::Bytes)
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cddl_name())
    }
}

/// A prelude type with an optional `.size` bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PrimitiveType {
    /// Prelude type.
    pub kind: Primitive,
    /// Maximum encoded length in bytes, from `.size`.
    pub max_size: Option<u64>,
}

impl PrimitiveType {
    /// Creates an unbounded primitive type.
    #[must_use]
    pub const fn new(kind: Primitive) -> Self {
        Self {
            kind,
            max_size: None,
        }
    }

    /// Creates a size-bounded primitive type.
    #[must_use]
    pub const fn sized(kind: Primitive, max_size: u64) -> Self {
        Self {
            kind,
            max_size: Some(max_size),
        }
    }
}

/// Type of a struct field, array element or union member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldType {
    /// Prelude type.
    Primitive(PrimitiveType),
    /// Named type defined in the schema.
    Named(String),
    /// Homogeneous array (`[* T]`).
    Vector(ArrayDef),
}

impl FieldType {
    /// Returns the schema type name this field refers to, if any.
    #[must_use]
    pub fn referenced_name(&self) -> Option<&str> {
        match self {
            Self::Named(name) => Some(name),
            Self::Vector(array) => array.element.referenced_name(),
            Self::Primitive(_) => None,
        }
    }
}

/// Homogeneous array definition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArrayDef {
    /// Element type.
    pub element: Box<FieldType>,
    /// Minimum number of elements.
    pub min: u64,
    /// Maximum number of elements, `None` if unbounded.
    pub max: Option<u64>,
}

/// How a struct is laid out on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StructEncoding {
    /// CBOR map keyed by the field keys.
    Map,
    /// CBOR array in field order.
    Array,
}

/// Wire key of a struct field.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum FieldKey {
    /// Unsigned integer map key.
    Int(u64),
    /// Text map key.
    Text(String),
    /// Position in an array-encoded struct.
    Position(usize),
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "\"{text}\""),
            Self::Position(index) => write!(f, "#{index}"),
        }
    }
}

/// A struct field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructField {
    /// Field name as written in the schema.
    pub name: String,
    /// Wire key.
    pub key: FieldKey,
    /// Field type.
    pub ty: FieldType,
    /// Whether the field may be absent.
    pub optional: bool,
}

/// Struct definition (map or array with named members).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StructDef {
    /// Wire layout.
    pub encoding: StructEncoding,
    /// Fields in source order.
    pub fields: Vec<StructField>,
}

/// Enumeration member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumMember {
    /// Member name.
    pub name: String,
    /// Non-negative value.
    pub value: u64,
}

/// Enumeration definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EnumDef {
    /// Members in source order.
    pub members: Vec<EnumMember>,
}

impl EnumDef {
    /// Looks up a member by name.
    #[must_use]
    pub fn get_member(&self, name: &str) -> Option<&EnumMember> {
        self.members.iter().find(|m| m.name == name)
    }
}

/// Discriminated union member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnionMember {
    /// Member name (the referenced type name).
    pub name: String,
    /// Member type.
    pub ty: FieldType,
    /// CBOR tag distinguishing this member, if tagged.
    pub discriminant: Option<u64>,
}

/// Discriminated union definition.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UnionDef {
    /// Members in source order, which is also the decode order.
    pub members: Vec<UnionMember>,
}

/// Resolved CDDL type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CddlType {
    /// Prelude type, possibly size-bounded.
    Primitive(PrimitiveType),
    /// Struct with named fields.
    Struct(StructDef),
    /// Homogeneous array.
    Array(ArrayDef),
    /// Enumeration of unsigned values.
    Enum(EnumDef),
    /// Discriminated union.
    Union(UnionDef),
    /// Another named type.
    Alias(String),
}

impl CddlType {
    /// Returns the names of schema types this type refers to, in order.
    #[must_use]
    pub fn dependencies(&self) -> Vec<&str> {
        match self {
            Self::Primitive(_) | Self::Enum(_) => Vec::new(),
            Self::Struct(s) => s
                .fields
                .iter()
                .filter_map(|f| f.ty.referenced_name())
                .collect(),
            Self::Array(a) => a.element.referenced_name().into_iter().collect(),
            Self::Union(u) => u
                .members
                .iter()
                .filter_map(|m| m.ty.referenced_name())
                .collect(),
            Self::Alias(name) => vec![name.as_str()],
        }
    }

    /// Returns a short description of the type kind.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Primitive(_) => "primitive",
            Self::Struct(_) => "struct",
            Self::Array(_) => "array",
            Self::Enum(_) => "enum",
            Self::Union(_) => "union",
            Self::Alias(_) => "alias",
        }
    }
}

/// A named entry of the symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeEntry {
    /// Rule name.
    pub name: String,
    /// Type key from a `; type key N` annotation.
    pub type_key: Option<u64>,
    /// Resolved type.
    pub ty: CddlType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_from_cddl_name() {
        assert_eq!(Primitive::from_cddl_name("uint"), Some(Primitive::Uint));
        assert_eq!(Primitive::from_cddl_name("tstr"), Some(Primitive::Text));
        assert_eq!(Primitive::from_cddl_name("bstr"), Some(Primitive::Bytes));
        assert_eq!(Primitive::from_cddl_name("float32"), Some(Primitive::Float));
        assert_eq!(Primitive::from_cddl_name("agent-info"), None);
    }

    #[test]
    fn test_primitive_sizable() {
        assert!(Primitive::Text.is_sizable());
        assert!(Primitive::Bytes.is_sizable());
        assert!(!Primitive::Uint.is_sizable());
    }

    #[test]
    fn test_struct_dependencies() {
        let ty = CddlType::Struct(StructDef {
            encoding: StructEncoding::Map,
            fields: vec![
                StructField {
                    name: "a".into(),
                    key: FieldKey::Int(0),
                    ty: FieldType::Named("point".into()),
                    optional: false,
                },
                StructField {
                    name: "b".into(),
                    key: FieldKey::Int(1),
                    ty: FieldType::Primitive(PrimitiveType::new(Primitive::Text)),
                    optional: true,
                },
                StructField {
                    name: "c".into(),
                    key: FieldKey::Int(2),
                    ty: FieldType::Vector(ArrayDef {
                        element: Box::new(FieldType::Named("color".into())),
                        min: 0,
                        max: None,
                    }),
                    optional: false,
                },
            ],
        });
        assert_eq!(ty.dependencies(), vec!["point", "color"]);
    }

    #[test]
    fn test_alias_dependencies() {
        assert_eq!(CddlType::Alias("x".into()).dependencies(), vec!["x"]);
        assert!(CddlType::Enum(EnumDef::default()).dependencies().is_empty());
    }

    #[test]
    fn test_enum_get_member() {
        let def = EnumDef {
            members: vec![EnumMember {
                name: "ok".into(),
                value: 1,
            }],
        };
        assert_eq!(def.get_member("ok").map(|m| m.value), Some(1));
        assert!(def.get_member("missing").is_none());
    }

    #[test]
    fn test_field_key_display() {
        assert_eq!(FieldKey::Int(3).to_string(), "3");
        assert_eq!(FieldKey::Text("a".into()).to_string(), "\"a\"");
        assert_eq!(FieldKey::Position(1).to_string(), "#1");
    }
}
