//! Syntax tree produced by the CDDL parser.
//!
//! Nodes live in a single arena owned by [`SyntaxTree`] and refer to each
//! other through [`NodeId`] indices. Named references are kept as names and
//! resolved later by the symbol table builder, so the arena never contains
//! cycles.

use std::fmt;

/// Source position of a token or node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    /// Line (1-based).
    pub line: usize,
    /// Column (1-based).
    pub column: usize,
    /// Byte offset of the first character.
    pub start: usize,
    /// Byte offset one past the last character.
    pub end: usize,
}

/// Index of a node inside a [`SyntaxTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Returns the arena index.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Occurrence indicator of a group member.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occurrence {
    /// Minimum number of occurrences.
    pub min: u64,
    /// Maximum number of occurrences, `None` if unbounded.
    pub max: Option<u64>,
}

impl Occurrence {
    /// Exactly one occurrence (no indicator written).
    pub const ONE: Self = Self {
        min: 1,
        max: Some(1),
    };

    /// Zero or one occurrence (`?`).
    pub const OPTIONAL: Self = Self {
        min: 0,
        max: Some(1),
    };

    /// Returns true if this is the implicit exactly-once occurrence.
    #[must_use]
    pub fn is_one(&self) -> bool {
        *self == Self::ONE
    }

    /// Returns true if this is `?`.
    #[must_use]
    pub fn is_optional(&self) -> bool {
        *self == Self::OPTIONAL
    }
}

impl Default for Occurrence {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.min, self.max) {
            (1, Some(1)) => Ok(()),
            (0, Some(1)) => write!(f, "?"),
            (0, None) => write!(f, "*"),
            (1, None) => write!(f, "+"),
            (min, None) => write!(f, "{min}*"),
            (min, Some(max)) => write!(f, "{min}*{max}"),
        }
    }
}

/// Key of a group member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MemberKey {
    /// Bareword key (`name:`).
    Bare(String),
    /// Unsigned integer key (`0:` or `0 =>`).
    Int(u64),
    /// Text key (`"name":` or `"name" =>`).
    Text(String),
}

impl fmt::Display for MemberKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bare(name) => write!(f, "{name}"),
            Self::Int(value) => write!(f, "{value}"),
            Self::Text(text) => write!(f, "\"{text}\""),
        }
    }
}

/// Literal value in type position.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    /// Unsigned integer.
    Uint(u64),
    /// Negative integer.
    Nint(i64),
    /// Text string.
    Text(String),
}

/// Kind of a syntax node, with its payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    /// Root of the tree; children are `Rule` nodes in source order.
    Root,
    /// Rule definition; one child, the definition.
    Rule {
        /// Defined name.
        name: String,
        /// Type key from a `; type key N` comment.
        type_key: Option<u64>,
        /// Whether the rule defines a group rather than a type.
        is_group: bool,
    },
    /// Type choice (`a / b`); children are the alternatives.
    Choice,
    /// Map (`{ ... }`); children are `Member` nodes.
    Map,
    /// Array (`[ ... ]`); children are `Member` nodes.
    Array,
    /// Group (`( ... )`); children are `Member` nodes.
    Group,
    /// Enumeration (`&( ... )` or `&name`); children are `Member` nodes.
    Enumeration,
    /// Group member; one child, the member type.
    Member {
        /// Member key.
        key: Option<MemberKey>,
        /// Occurrence indicator.
        occurrence: Occurrence,
        /// Trailing comment on the member's line.
        comment: Option<String>,
    },
    /// Reference to a named type, group or prelude type.
    TypeRef(String),
    /// Literal value.
    Literal(Literal),
    /// CBOR tag (`#6.N(type)`); one child.
    Tagged {
        /// Tag number.
        tag: u64,
    },
    /// Size control (`type .size N`); one child.
    Sized {
        /// Size bound in bytes.
        size: u64,
    },
}

impl NodeKind {
    /// Returns a short human readable description of the node kind.
    #[must_use]
    pub fn describe(&self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Rule { .. } => "rule",
            Self::Choice => "type choice",
            Self::Map => "map",
            Self::Array => "array",
            Self::Group => "group",
            Self::Enumeration => "enumeration",
            Self::Member { .. } => "member",
            Self::TypeRef(_) => "type reference",
            Self::Literal(_) => "literal",
            Self::Tagged { .. } => "tagged type",
            Self::Sized { .. } => "sized type",
        }
    }
}

/// A node in the syntax tree.
#[derive(Debug, Clone, PartialEq)]
pub struct SyntaxNode {
    /// Node kind and payload.
    pub kind: NodeKind,
    /// Child nodes, owned by this node.
    pub children: Vec<NodeId>,
    /// Source position.
    pub span: Span,
}

/// Parsed CDDL document.
#[derive(Debug, Clone)]
pub struct SyntaxTree {
    nodes: Vec<SyntaxNode>,
}

impl SyntaxTree {
    /// Creates a tree containing only the root node.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![SyntaxNode {
                kind: NodeKind::Root,
                children: Vec::new(),
                span: Span::default(),
            }],
        }
    }

    /// Returns the root node id.
    #[must_use]
    pub const fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Returns the node with the given id.
    ///
    /// # Panics
    /// Panics if `id` was not produced by this tree.
    #[must_use]
    pub fn node(&self, id: NodeId) -> &SyntaxNode {
        &self.nodes[id.index()]
    }

    /// Returns the kind of the node with the given id.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.node(id).kind
    }

    /// Returns the children of the node with the given id.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.node(id).children
    }

    /// Returns the first child of a node, if any.
    #[must_use]
    pub fn first_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).first().copied()
    }

    /// Returns the rule nodes in source order.
    pub fn rules(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.children(self.root()).iter().copied()
    }

    /// Returns the number of rules.
    #[must_use]
    pub fn rule_count(&self) -> usize {
        self.children(self.root()).len()
    }

    /// Returns the total number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns true if the tree holds no rules.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rule_count() == 0
    }

    /// Adds a node whose children already exist.
    pub(crate) fn push(&mut self, kind: NodeKind, span: Span, children: Vec<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(SyntaxNode {
            kind,
            children,
            span,
        });
        id
    }

    /// Appends a rule node to the root.
    pub(crate) fn push_rule(&mut self, rule: NodeId) {
        self.nodes[0].children.push(rule);
    }
}

impl Default for SyntaxTree {
    fn default() -> Self {
        Self::new()
    }
}
