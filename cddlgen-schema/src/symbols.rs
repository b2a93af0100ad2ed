//! Symbol table construction.
//!
//! Walks the parsed syntax tree, inlines group references, resolves every
//! named reference and produces a flat [`CddlSymbolTable`] with one entry
//! per type rule, in definition order.

use crate::error::SymbolError;
use crate::syntax::{Literal, MemberKey, NodeId, NodeKind, Occurrence, SyntaxTree};
use crate::types::{
    ArrayDef, CddlType, EnumDef, EnumMember, FieldKey, FieldType, Primitive, PrimitiveType,
    StructDef, StructEncoding, StructField, TypeEntry, UnionDef, UnionMember,
};
use std::collections::{HashMap, HashSet};

/// Resolved, name-indexed collection of schema types.
///
/// Immutable once built; entries keep the order in which the rules appear
/// in the source.
#[derive(Debug, Clone, Default)]
pub struct CddlSymbolTable {
    types: Vec<TypeEntry>,
    index: HashMap<String, usize>,
    groups: Vec<String>,
}

impl CddlSymbolTable {
    fn insert(&mut self, entry: TypeEntry) {
        self.index.insert(entry.name.clone(), self.types.len());
        self.types.push(entry);
    }

    /// Looks up an entry by rule name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&TypeEntry> {
        self.index.get(name).map(|&idx| &self.types[idx])
    }

    /// Looks up a type by rule name.
    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<&CddlType> {
        self.get(name).map(|entry| &entry.ty)
    }

    /// Returns true if a type with the given name exists.
    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    /// Iterates over the entries in definition order.
    pub fn iter(&self) -> std::slice::Iter<'_, TypeEntry> {
        self.types.iter()
    }

    /// Returns the number of type entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Returns true if the table has no type entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Names of the group rules that were inlined into types.
    #[must_use]
    pub fn group_names(&self) -> &[String] {
        &self.groups
    }
}

impl<'t> IntoIterator for &'t CddlSymbolTable {
    type Item = &'t TypeEntry;
    type IntoIter = std::slice::Iter<'t, TypeEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Builds the symbol table for a parsed schema.
///
/// # Errors
/// Returns the first `SymbolError` found: unresolved references, duplicate
/// names, members, keys or discriminants, unsupported constructs, and
/// reference cycles.
pub fn build_symbol_table(tree: &SyntaxTree) -> Result<CddlSymbolTable, SymbolError> {
    let table = SymbolTableBuilder::new(tree)?.build()?;
    tracing::debug!(
        types = table.len(),
        groups = table.group_names().len(),
        "built CDDL symbol table"
    );
    Ok(table)
}

#[derive(Debug, Clone, Copy)]
struct RuleInfo {
    definition: NodeId,
    is_group: bool,
    type_key: Option<u64>,
}

/// A group member after group references have been inlined.
#[derive(Debug, Clone, Copy)]
struct MemberInfo<'a> {
    key: Option<&'a MemberKey>,
    occurrence: Occurrence,
    comment: Option<&'a str>,
    ty: NodeId,
}

impl MemberInfo<'_> {
    /// Field name taken from the first word of the trailing comment.
    fn comment_name(&self) -> Option<String> {
        self.comment
            .and_then(|c| c.split_whitespace().next())
            .map(str::to_string)
    }
}

struct SymbolTableBuilder<'a> {
    tree: &'a SyntaxTree,
    rules: HashMap<&'a str, RuleInfo>,
    order: Vec<&'a str>,
}

impl<'a> SymbolTableBuilder<'a> {
    fn new(tree: &'a SyntaxTree) -> Result<Self, SymbolError> {
        let mut rules = HashMap::new();
        let mut order = Vec::new();

        for rule in tree.rules() {
            let NodeKind::Rule {
                name,
                type_key,
                is_group,
            } = tree.kind(rule)
            else {
                continue;
            };
            if Primitive::from_cddl_name(name).is_some() {
                return Err(SymbolError::unsupported(
                    name.as_str(),
                    "redefinition of a prelude type",
                ));
            }
            let definition = tree
                .first_child(rule)
                .ok_or_else(|| SymbolError::unsupported(name.as_str(), "rule without body"))?;
            let info = RuleInfo {
                definition,
                is_group: *is_group,
                type_key: *type_key,
            };
            if rules.insert(name.as_str(), info).is_some() {
                return Err(SymbolError::DuplicateName { name: name.clone() });
            }
            order.push(name.as_str());
        }

        Ok(Self { tree, rules, order })
    }

    fn build(self) -> Result<CddlSymbolTable, SymbolError> {
        let mut table = CddlSymbolTable::default();

        for &name in &self.order {
            let info = self.rules[name];
            if info.is_group {
                if info.type_key.is_some() {
                    return Err(SymbolError::unsupported(name, "type key on a group rule"));
                }
                table.groups.push(name.to_string());
                continue;
            }

            let ty = self.lower_definition(name, info.definition)?;
            if info.type_key.is_some() && !matches!(ty, CddlType::Struct(_) | CddlType::Union(_)) {
                return Err(SymbolError::unsupported(
                    name,
                    format!("type key on {} type", ty.kind_name()),
                ));
            }
            table.insert(TypeEntry {
                name: name.to_string(),
                type_key: info.type_key,
                ty,
            });
        }

        check_cycles(&table)?;
        Ok(table)
    }

    // Definitions

    fn lower_definition(&self, context: &str, node: NodeId) -> Result<CddlType, SymbolError> {
        match self.tree.kind(node) {
            NodeKind::Map => {
                let members = self.flatten_members(context, node)?;
                Ok(CddlType::Struct(self.lower_struct(
                    context,
                    &members,
                    StructEncoding::Map,
                )?))
            }
            NodeKind::Array => {
                let members = self.flatten_members(context, node)?;
                match vector_member(&members) {
                    Some(member) => Ok(CddlType::Array(self.lower_vector(context, member)?)),
                    None => Ok(CddlType::Struct(self.lower_struct(
                        context,
                        &members,
                        StructEncoding::Array,
                    )?)),
                }
            }
            NodeKind::Enumeration => Ok(CddlType::Enum(self.lower_enum(context, node)?)),
            NodeKind::Choice => Ok(CddlType::Union(self.lower_union(context, node)?)),
            NodeKind::Tagged { .. } => Ok(CddlType::Union(UnionDef {
                members: vec![self.lower_union_member(context, node)?],
            })),
            NodeKind::TypeRef(name) => match Primitive::from_cddl_name(name) {
                Some(primitive) => Ok(CddlType::Primitive(PrimitiveType::new(primitive))),
                None => {
                    self.resolve(context, name)?;
                    Ok(CddlType::Alias(name.clone()))
                }
            },
            NodeKind::Sized { .. } => Ok(CddlType::Primitive(self.lower_sized(context, node)?)),
            NodeKind::Literal(_) => Err(SymbolError::unsupported(
                context,
                "literal value used as a type",
            )),
            other => Err(SymbolError::unsupported(
                context,
                format!("unexpected {} in type position", other.describe()),
            )),
        }
    }

    fn lower_struct(
        &self,
        context: &str,
        members: &[MemberInfo<'a>],
        encoding: StructEncoding,
    ) -> Result<StructDef, SymbolError> {
        let mut fields = Vec::with_capacity(members.len());
        let mut names = HashSet::new();
        let mut keys = HashSet::new();

        for (position, member) in members.iter().enumerate() {
            let (name, key) = match (encoding, member.key) {
                (StructEncoding::Map, Some(MemberKey::Bare(name) | MemberKey::Text(name))) => {
                    (name.clone(), FieldKey::Text(name.clone()))
                }
                (StructEncoding::Map, Some(MemberKey::Int(key))) => {
                    let name = member
                        .comment_name()
                        .ok_or_else(|| SymbolError::UnnamedField {
                            type_name: context.to_string(),
                            key: key.to_string(),
                        })?;
                    (name, FieldKey::Int(*key))
                }
                (StructEncoding::Map, None) => {
                    self.lower_field_type(context, member.ty)?;
                    return Err(SymbolError::unsupported(context, "map member without key"));
                }
                (StructEncoding::Array, Some(MemberKey::Bare(name))) => {
                    (name.clone(), FieldKey::Position(position))
                }
                (StructEncoding::Array, Some(other)) => {
                    return Err(SymbolError::unsupported(
                        context,
                        format!("array member key {other}; use a bareword name"),
                    ));
                }
                (StructEncoding::Array, None) => {
                    let name = member
                        .comment_name()
                        .ok_or_else(|| SymbolError::UnnamedField {
                            type_name: context.to_string(),
                            key: format!("#{position}"),
                        })?;
                    (name, FieldKey::Position(position))
                }
            };

            let optional = if member.occurrence.is_one() {
                false
            } else if member.occurrence.is_optional() && encoding == StructEncoding::Map {
                true
            } else {
                return Err(SymbolError::unsupported(
                    context,
                    format!("occurrence '{}' on member '{name}'", member.occurrence),
                ));
            };

            let ty = self.lower_field_type(context, member.ty)?;
            if !names.insert(name.clone()) {
                return Err(SymbolError::duplicate_member(context, name));
            }
            if !keys.insert(key.clone()) {
                return Err(SymbolError::DuplicateKey {
                    type_name: context.to_string(),
                    key: key.to_string(),
                });
            }

            fields.push(StructField {
                name,
                key,
                ty,
                optional,
            });
        }

        Ok(StructDef { encoding, fields })
    }

    fn lower_vector(&self, context: &str, member: &MemberInfo<'a>) -> Result<ArrayDef, SymbolError> {
        Ok(ArrayDef {
            element: Box::new(self.lower_field_type(context, member.ty)?),
            min: member.occurrence.min,
            max: member.occurrence.max,
        })
    }

    fn lower_enum(&self, context: &str, node: NodeId) -> Result<EnumDef, SymbolError> {
        let members = self.flatten_members(context, node)?;
        let mut def = EnumDef::default();
        let mut values: HashMap<u64, &str> = HashMap::new();

        for member in &members {
            let name = match member.key {
                Some(MemberKey::Bare(name) | MemberKey::Text(name)) => name,
                _ => {
                    return Err(SymbolError::unsupported(
                        context,
                        "enumeration member without a name key",
                    ));
                }
            };
            if !member.occurrence.is_one() {
                return Err(SymbolError::unsupported(
                    context,
                    format!("occurrence on enumeration member '{name}'"),
                ));
            }

            let value = match self.tree.kind(member.ty) {
                NodeKind::Literal(Literal::Uint(value)) => *value,
                NodeKind::Literal(Literal::Nint(value)) => {
                    return Err(SymbolError::NegativeDiscriminant {
                        type_name: context.to_string(),
                        member: name.clone(),
                        value: *value,
                    });
                }
                _ => {
                    return Err(SymbolError::unsupported(
                        context,
                        format!("enumeration member '{name}' is not an unsigned integer"),
                    ));
                }
            };

            if def.get_member(name).is_some() {
                return Err(SymbolError::duplicate_member(context, name.as_str()));
            }
            if let Some(first) = values.insert(value, name.as_str()) {
                return Err(SymbolError::DuplicateDiscriminant {
                    type_name: context.to_string(),
                    value,
                    first: first.to_string(),
                    second: name.clone(),
                });
            }
            def.members.push(EnumMember {
                name: name.clone(),
                value,
            });
        }

        Ok(def)
    }

    fn lower_union(&self, context: &str, node: NodeId) -> Result<UnionDef, SymbolError> {
        let mut def = UnionDef::default();
        let mut names = HashSet::new();
        let mut tags: HashMap<u64, String> = HashMap::new();

        for &alternative in self.tree.children(node) {
            let member = self.lower_union_member(context, alternative)?;
            if !names.insert(member.name.clone()) {
                return Err(SymbolError::duplicate_member(context, member.name));
            }
            if let Some(tag) = member.discriminant {
                if let Some(first) = tags.insert(tag, member.name.clone()) {
                    return Err(SymbolError::DuplicateDiscriminant {
                        type_name: context.to_string(),
                        value: tag,
                        first,
                        second: member.name,
                    });
                }
            }
            def.members.push(member);
        }

        Ok(def)
    }

    fn lower_union_member(&self, context: &str, node: NodeId) -> Result<UnionMember, SymbolError> {
        let (inner, discriminant) = match self.tree.kind(node) {
            NodeKind::Tagged { tag } => {
                let inner = self
                    .tree
                    .first_child(node)
                    .ok_or_else(|| SymbolError::unsupported(context, "empty tag"))?;
                (inner, Some(*tag))
            }
            _ => (node, None),
        };

        let name = match self.tree.kind(inner) {
            NodeKind::TypeRef(name) => name.clone(),
            NodeKind::Sized { .. } => self.lower_sized(context, inner)?.kind.cddl_name().to_string(),
            NodeKind::Tagged { .. } => {
                return Err(SymbolError::unsupported(context, "nested tags in type choice"));
            }
            NodeKind::Literal(_) => {
                return Err(SymbolError::unsupported(context, "literal value in type choice"));
            }
            other => {
                return Err(SymbolError::unsupported(
                    context,
                    format!(
                        "anonymous {} in type choice; define it as a named rule",
                        other.describe()
                    ),
                ));
            }
        };

        Ok(UnionMember {
            name,
            ty: self.lower_field_type(context, inner)?,
            discriminant,
        })
    }

    // Field types

    fn lower_field_type(&self, context: &str, node: NodeId) -> Result<FieldType, SymbolError> {
        match self.tree.kind(node) {
            NodeKind::TypeRef(name) => match Primitive::from_cddl_name(name) {
                Some(primitive) => Ok(FieldType::Primitive(PrimitiveType::new(primitive))),
                None => {
                    self.resolve(context, name)?;
                    Ok(FieldType::Named(name.clone()))
                }
            },
            NodeKind::Sized { .. } => Ok(FieldType::Primitive(self.lower_sized(context, node)?)),
            NodeKind::Array => {
                let members = self.flatten_members(context, node)?;
                match vector_member(&members) {
                    Some(member) => Ok(FieldType::Vector(self.lower_vector(context, member)?)),
                    None => Err(SymbolError::unsupported(
                        context,
                        "anonymous array struct; define it as a named rule",
                    )),
                }
            }
            NodeKind::Literal(_) => Err(SymbolError::unsupported(
                context,
                "literal value in type position",
            )),
            other => Err(SymbolError::unsupported(
                context,
                format!("anonymous {}; define it as a named rule", other.describe()),
            )),
        }
    }

    fn lower_sized(&self, context: &str, node: NodeId) -> Result<PrimitiveType, SymbolError> {
        let NodeKind::Sized { size } = self.tree.kind(node) else {
            return Err(SymbolError::unsupported(context, "expected sized type"));
        };
        let inner = self.tree.first_child(node).map(|id| self.tree.kind(id));
        match inner {
            Some(NodeKind::TypeRef(name)) => match Primitive::from_cddl_name(name) {
                Some(primitive) if primitive.is_sizable() => {
                    Ok(PrimitiveType::sized(primitive, *size))
                }
                _ => Err(SymbolError::unsupported(
                    context,
                    format!("'.size' on '{name}'; only text and bytes are sizable"),
                )),
            },
            _ => Err(SymbolError::unsupported(
                context,
                "'.size' applies only to text or bytes",
            )),
        }
    }

    fn resolve(&self, context: &str, name: &str) -> Result<(), SymbolError> {
        match self.rules.get(name) {
            None => Err(SymbolError::unresolved(name, context)),
            Some(info) if info.is_group => Err(SymbolError::GroupAsType {
                name: name.to_string(),
                context: context.to_string(),
            }),
            Some(_) => Ok(()),
        }
    }

    // Groups

    fn flatten_members(
        &self,
        context: &str,
        container: NodeId,
    ) -> Result<Vec<MemberInfo<'a>>, SymbolError> {
        let mut members = Vec::new();
        let mut visiting = vec![context];
        self.flatten_into(container, &mut visiting, &mut members)?;
        Ok(members)
    }

    fn flatten_into<'v>(
        &self,
        container: NodeId,
        visiting: &mut Vec<&'v str>,
        out: &mut Vec<MemberInfo<'a>>,
    ) -> Result<(), SymbolError>
    where
        'a: 'v,
    {
        let tree: &'a SyntaxTree = self.tree;
        for &child in tree.children(container) {
            let NodeKind::Member {
                key,
                occurrence,
                comment,
            } = tree.kind(child)
            else {
                return Err(SymbolError::unsupported(
                    visiting[0],
                    format!("unexpected {} in group", tree.kind(child).describe()),
                ));
            };
            let ty = tree
                .first_child(child)
                .ok_or_else(|| SymbolError::unsupported(visiting[0], "member without type"))?;

            if let (None, NodeKind::TypeRef(name)) = (key, tree.kind(ty)) {
                if let Some(info) = self.rules.get(name.as_str()).filter(|info| info.is_group) {
                    if !occurrence.is_one() {
                        return Err(SymbolError::unsupported(
                            visiting[0],
                            format!("occurrence '{occurrence}' on group reference '{name}'"),
                        ));
                    }
                    if visiting[1..].contains(&name.as_str()) {
                        let mut path: Vec<&str> = visiting[1..].to_vec();
                        path.push(name);
                        return Err(SymbolError::CircularReference {
                            path: path.join(" -> "),
                        });
                    }
                    visiting.push(name);
                    self.flatten_into(info.definition, visiting, out)?;
                    visiting.pop();
                    continue;
                }
            }

            out.push(MemberInfo {
                key: key.as_ref(),
                occurrence: *occurrence,
                comment: comment.as_deref(),
                ty,
            });
        }
        Ok(())
    }
}

/// Returns the single member of a `[* T]` style array, if the members have
/// that shape.
fn vector_member<'m, 'a>(members: &'m [MemberInfo<'a>]) -> Option<&'m MemberInfo<'a>> {
    match members {
        [member] if member.key.is_none() && !member.occurrence.is_one() => Some(member),
        _ => None,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Visit {
    InProgress,
    Done,
}

/// Rejects reference cycles between named types.
fn check_cycles(table: &CddlSymbolTable) -> Result<(), SymbolError> {
    fn visit<'t>(
        table: &'t CddlSymbolTable,
        name: &'t str,
        state: &mut HashMap<&'t str, Visit>,
        path: &mut Vec<&'t str>,
    ) -> Result<(), SymbolError> {
        match state.get(name) {
            Some(Visit::Done) => return Ok(()),
            Some(Visit::InProgress) => {
                let start = path.iter().position(|&n| n == name).unwrap_or(0);
                let mut cycle = path[start..].to_vec();
                cycle.push(name);
                return Err(SymbolError::CircularReference {
                    path: cycle.join(" -> "),
                });
            }
            None => {}
        }

        state.insert(name, Visit::InProgress);
        path.push(name);
        if let Some(ty) = table.get_type(name) {
            for dependency in ty.dependencies() {
                visit(table, dependency, state, path)?;
            }
        }
        path.pop();
        state.insert(name, Visit::Done);
        Ok(())
    }

    let mut state = HashMap::new();
    let mut path = Vec::new();
    for entry in table {
        visit(table, &entry.name, &mut state, &mut path)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_schema;

    fn build(source: &str) -> Result<CddlSymbolTable, SymbolError> {
        let tree = parse_schema(source).expect("Failed to parse");
        build_symbol_table(&tree)
    }

    fn struct_def<'t>(table: &'t CddlSymbolTable, name: &str) -> &'t StructDef {
        match table.get_type(name) {
            Some(CddlType::Struct(def)) => def,
            other => panic!("expected struct for {name}, got {other:?}"),
        }
    }

    #[test]
    fn test_entry_struct_with_two_fields() {
        let table = build("entry = { a: uint, b: text }").expect("Failed to build");
        assert_eq!(table.len(), 1);

        let def = struct_def(&table, "entry");
        assert_eq!(def.encoding, StructEncoding::Map);
        let names: Vec<_> = def.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b"]);
        assert_eq!(
            def.fields[0].ty,
            FieldType::Primitive(PrimitiveType::new(Primitive::Uint))
        );
        assert_eq!(
            def.fields[1].ty,
            FieldType::Primitive(PrimitiveType::new(Primitive::Text))
        );
        assert_eq!(def.fields[1].key, FieldKey::Text("b".into()));
    }

    #[test]
    fn test_integer_keys_named_by_comment() {
        let table = build(
            "agent-info = {\n  0: text ; display-name\n  ? 1: [* text] ; locales\n}\n",
        )
        .expect("Failed to build");
        let def = struct_def(&table, "agent-info");
        assert_eq!(def.fields[0].name, "display-name");
        assert_eq!(def.fields[0].key, FieldKey::Int(0));
        assert!(!def.fields[0].optional);
        assert_eq!(def.fields[1].name, "locales");
        assert!(def.fields[1].optional);
        assert!(matches!(def.fields[1].ty, FieldType::Vector(ArrayDef { min: 0, max: None, .. })));
    }

    #[test]
    fn test_one_entry_per_named_type() {
        let source = "a = { 0: b ; b }\nb = { 0: c ; c }\nc = uint\nd = [* a]\n";
        let table = build(source).expect("Failed to build");
        assert_eq!(table.len(), 4);
        let names: Vec<_> = table.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d"]);
    }

    #[test]
    fn test_forward_reference_resolves() {
        let table = build("outer = { inner: inner }\ninner = { x: uint }").expect("Failed to build");
        let def = struct_def(&table, "outer");
        assert_eq!(def.fields[0].ty, FieldType::Named("inner".into()));
    }

    #[test]
    fn test_unresolved_reference() {
        let result = build("entry = { a: foo }");
        assert!(matches!(
            result,
            Err(SymbolError::UnresolvedReference { ref name, ref context })
                if name == "foo" && context == "entry"
        ));
    }

    #[test]
    fn test_unnamed_integer_field() {
        assert!(matches!(
            build("entry = { 0: uint }"),
            Err(SymbolError::UnnamedField { .. })
        ));
    }

    #[test]
    fn test_duplicate_field_name() {
        assert!(matches!(
            build("entry = { 0: uint ; id\n 1: uint ; id\n}"),
            Err(SymbolError::DuplicateMember { .. })
        ));
    }

    #[test]
    fn test_duplicate_map_key() {
        assert!(matches!(
            build("entry = { 0: uint ; a\n 0: uint ; b\n}"),
            Err(SymbolError::DuplicateKey { .. })
        ));
    }

    #[test]
    fn test_group_inlined_into_map() {
        let source = "request = (\n  0: uint ; request-id\n)\nping = {\n  request\n  1: text ; payload\n}\n";
        let table = build(source).expect("Failed to build");
        assert_eq!(table.len(), 1);
        assert_eq!(table.group_names(), ["request".to_string()]);

        let def = struct_def(&table, "ping");
        let names: Vec<_> = def.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["request-id", "payload"]);
    }

    #[test]
    fn test_group_cycle() {
        let source = "a = (x: uint, b)\nb = (y: uint, a)\nroot = { a }\n";
        assert!(matches!(
            build(source),
            Err(SymbolError::CircularReference { .. })
        ));
    }

    #[test]
    fn test_group_used_as_type() {
        let source = "g = (x: uint, y: uint)\nroot = { 0: g ; value }\n";
        assert!(matches!(
            build(source),
            Err(SymbolError::GroupAsType { .. })
        ));
    }

    #[test]
    fn test_type_cycle() {
        let source = "a = { 0: b ; b }\nb = { 0: a ; a }\n";
        let result = build(source);
        assert!(matches!(
            result,
            Err(SymbolError::CircularReference { ref path }) if path == "a -> b -> a"
        ));
    }

    #[test]
    fn test_enum_values() {
        let table = build("result = &(\n  success: 1\n  failure: 2\n)").expect("Failed to build");
        let Some(CddlType::Enum(def)) = table.get_type("result") else {
            panic!("expected enum");
        };
        assert_eq!(def.members.len(), 2);
        assert_eq!(def.get_member("failure").map(|m| m.value), Some(2));
    }

    #[test]
    fn test_enum_from_group() {
        let table = build("codes = (a: 1, b: 2)\ncode = &codes").expect("Failed to build");
        let Some(CddlType::Enum(def)) = table.get_type("code") else {
            panic!("expected enum");
        };
        assert_eq!(def.members.len(), 2);
    }

    #[test]
    fn test_enum_duplicate_value() {
        assert!(matches!(
            build("result = &(a: 1, b: 1)"),
            Err(SymbolError::DuplicateDiscriminant { value: 1, .. })
        ));
    }

    #[test]
    fn test_enum_negative_value() {
        assert!(matches!(
            build("result = &(a: -1)"),
            Err(SymbolError::NegativeDiscriminant { value: -1, .. })
        ));
    }

    #[test]
    fn test_union_members_in_order() {
        let table = build("shape = #6.1(circle) / square\ncircle = { r: uint }\nsquare = { s: uint }")
            .expect("Failed to build");
        let Some(CddlType::Union(def)) = table.get_type("shape") else {
            panic!("expected union");
        };
        assert_eq!(def.members[0].name, "circle");
        assert_eq!(def.members[0].discriminant, Some(1));
        assert_eq!(def.members[1].name, "square");
        assert_eq!(def.members[1].discriminant, None);
    }

    #[test]
    fn test_union_duplicate_discriminant() {
        let source = "shape = #6.3(circle) / #6.3(square)\ncircle = { r: uint }\nsquare = { s: uint }";
        let result = build(source);
        assert!(matches!(
            result,
            Err(SymbolError::DuplicateDiscriminant { value: 3, ref first, ref second, .. })
                if first == "circle" && second == "square"
        ));
    }

    #[test]
    fn test_union_of_primitives() {
        let table = build("id = uint / text").expect("Failed to build");
        let Some(CddlType::Union(def)) = table.get_type("id") else {
            panic!("expected union");
        };
        assert_eq!(def.members[0].name, "uint");
        assert_eq!(def.members[1].name, "text");
    }

    #[test]
    fn test_alias_and_sized_primitive() {
        let table = build("id = uint\ndigest = bytes .size 32\nmy-id = id").expect("Failed to build");
        assert_eq!(
            table.get_type("id"),
            Some(&CddlType::Primitive(PrimitiveType::new(Primitive::Uint)))
        );
        assert_eq!(
            table.get_type("digest"),
            Some(&CddlType::Primitive(PrimitiveType::sized(Primitive::Bytes, 32)))
        );
        assert_eq!(table.get_type("my-id"), Some(&CddlType::Alias("id".into())));
    }

    #[test]
    fn test_size_on_uint_unsupported() {
        assert!(matches!(
            build("n = uint .size 4"),
            Err(SymbolError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_array_struct() {
        let table = build("point = [x: int, y: int]").expect("Failed to build");
        let def = struct_def(&table, "point");
        assert_eq!(def.encoding, StructEncoding::Array);
        assert_eq!(def.fields[1].key, FieldKey::Position(1));
    }

    #[test]
    fn test_homogeneous_array_type() {
        let table = build("names = [+ text]").expect("Failed to build");
        assert!(matches!(
            table.get_type("names"),
            Some(CddlType::Array(ArrayDef { min: 1, max: None, .. }))
        ));
    }

    #[test]
    fn test_type_key_recorded() {
        let table = build("; type key 10\nping = { 0: uint ; id }").expect("Failed to build");
        assert_eq!(table.get("ping").and_then(|e| e.type_key), Some(10));
    }

    #[test]
    fn test_type_key_on_enum_unsupported() {
        assert!(matches!(
            build("; type key 10\ncode = &(a: 1)"),
            Err(SymbolError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_anonymous_map_field_unsupported() {
        assert!(matches!(
            build("outer = { inner: { x: uint } }"),
            Err(SymbolError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_repeated_map_member_unsupported() {
        assert!(matches!(
            build("outer = { * 0: uint ; x }"),
            Err(SymbolError::Unsupported { .. })
        ));
    }

    #[test]
    fn test_prelude_redefinition_unsupported() {
        assert!(matches!(
            build("uint = text"),
            Err(SymbolError::Unsupported { .. })
        ));
    }
}
