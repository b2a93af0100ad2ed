//! CDDL schema parser.
//!
//! Recursive descent over the token stream produced by [`crate::lexer`].
//! The supported subset covers type and group rules, maps, arrays, type
//! choices, enumerations (`&( ... )`), CBOR tags (`#6.N`), the `.size`
//! control and occurrence indicators.

use crate::error::ParseError;
use crate::lexer::{Lexed, Token, TokenKind, tokenize};
use crate::syntax::{Literal, MemberKey, NodeId, NodeKind, Occurrence, Span, SyntaxTree};
use std::collections::{BTreeMap, HashSet};

/// Parses a CDDL schema from a string.
///
/// # Arguments
/// * `source` - CDDL schema content
///
/// # Returns
/// Parsed syntax tree or parse error.
///
/// # Errors
/// Returns `ParseError` on any syntax violation. No partial tree is returned.
pub fn parse_schema(source: &str) -> Result<SyntaxTree, ParseError> {
    let lexed = tokenize(source)?;
    let tree = Parser::new(lexed).parse()?;
    tracing::debug!(
        rules = tree.rule_count(),
        nodes = tree.len(),
        "parsed CDDL schema"
    );
    Ok(tree)
}

struct Parser {
    tokens: Vec<Token>,
    comments: BTreeMap<usize, String>,
    pos: usize,
    tree: SyntaxTree,
    names: HashSet<String>,
    last_rule_line: usize,
}

/// Leading words of the comment that assigns a type key to the following
/// rule.
const TYPE_KEY_WORDS: [&str; 2] = ["type", "key"];

impl Parser {
    fn new(lexed: Lexed) -> Self {
        Self {
            tokens: lexed.tokens,
            comments: lexed.comments,
            pos: 0,
            tree: SyntaxTree::new(),
            names: HashSet::new(),
            last_rule_line: 0,
        }
    }

    fn parse(mut self) -> Result<SyntaxTree, ParseError> {
        while !self.at(&TokenKind::Eof) {
            let rule = self.parse_rule()?;
            self.tree.push_rule(rule);
        }
        Ok(self.tree)
    }

    // Token helpers

    fn peek(&self) -> &Token {
        // The stream always ends with Eof and the cursor never passes it.
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek_kind_at(&self, ahead: usize) -> &TokenKind {
        let index = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn at(&self, kind: &TokenKind) -> bool {
        self.peek().kind == *kind
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn previous_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .map_or_else(|| self.peek().span, |index| self.tokens[index].span)
    }

    fn eat(&mut self, kind: &TokenKind) -> bool {
        if self.at(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<Token, ParseError> {
        if self.at(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_here(kind.to_string()))
        }
    }

    fn error_here(&self, expected: impl Into<String>) -> ParseError {
        let token = self.peek();
        ParseError::unexpected(
            expected,
            token.kind.to_string(),
            token.span.line,
            token.span.column,
        )
    }

    // Rules

    fn parse_rule(&mut self) -> Result<NodeId, ParseError> {
        let name_token = self.advance();
        let name = match name_token.kind {
            TokenKind::Ident(name) => name,
            other => {
                return Err(ParseError::unexpected(
                    "rule name",
                    other.to_string(),
                    name_token.span.line,
                    name_token.span.column,
                ));
            }
        };
        let span = name_token.span;

        if matches!(self.peek().kind, TokenKind::Slash | TokenKind::DoubleSlash)
            && *self.peek_kind_at(1) == TokenKind::Assign
        {
            let token = self.peek();
            return Err(ParseError::unsupported(
                "choice extension ('/=' or '//=')",
                token.span.line,
                token.span.column,
            ));
        }
        if !self.names.insert(name.clone()) {
            return Err(ParseError::DuplicateRule {
                name,
                line: span.line,
                column: span.column,
            });
        }
        self.expect(&TokenKind::Assign)?;

        let type_key = self.type_key_before(span.line)?;
        let is_group = self.at(&TokenKind::LParen) && self.parenthesized_group_ahead();
        let definition = if is_group {
            let open = self.advance();
            let members = self.parse_members(&TokenKind::RParen)?;
            self.tree.push(NodeKind::Group, open.span, members)
        } else {
            self.parse_type()?
        };

        self.last_rule_line = self.previous_span().line;
        Ok(self.tree.push(
            NodeKind::Rule {
                name,
                type_key,
                is_group,
            },
            span,
            vec![definition],
        ))
    }

    /// Reads a `; type key N` comment between the previous rule and this one.
    fn type_key_before(&self, rule_line: usize) -> Result<Option<u64>, ParseError> {
        if rule_line <= self.last_rule_line + 1 {
            return Ok(None);
        }
        let mut key = None;
        for (&line, text) in self.comments.range(self.last_rule_line + 1..rule_line) {
            let mut words = text.split_whitespace();
            if !TYPE_KEY_WORDS.iter().all(|&word| words.next() == Some(word)) {
                continue;
            }
            let rest = words.collect::<Vec<_>>().join(" ");
            let value = rest.parse().map_err(|_| ParseError::InvalidNumber {
                text: rest.clone(),
                line,
                column: 1,
            })?;
            key = Some(value);
        }
        Ok(key)
    }

    /// Decides whether the parenthesized rule body ahead is a group.
    ///
    /// A body is a group when its top level holds a member key, an
    /// occurrence indicator or a comma. Otherwise it is a parenthesized type.
    fn parenthesized_group_ahead(&self) -> bool {
        let mut depth = 0usize;
        for token in &self.tokens[self.pos..] {
            match token.kind {
                TokenKind::LParen | TokenKind::LBrace | TokenKind::LBracket => depth += 1,
                TokenKind::RParen | TokenKind::RBrace | TokenKind::RBracket => {
                    depth = depth.saturating_sub(1);
                    if depth == 0 {
                        return false;
                    }
                }
                TokenKind::Colon
                | TokenKind::Arrow
                | TokenKind::Comma
                | TokenKind::Question
                | TokenKind::Star
                | TokenKind::Plus
                    if depth == 1 =>
                {
                    return true;
                }
                TokenKind::Eof => return false,
                _ => {}
            }
        }
        false
    }

    // Types

    fn parse_type(&mut self) -> Result<NodeId, ParseError> {
        let first = self.parse_type1()?;
        if !self.at(&TokenKind::Slash) {
            return Ok(first);
        }

        let span = self.tree.node(first).span;
        let mut alternatives = vec![first];
        while self.eat(&TokenKind::Slash) {
            alternatives.push(self.parse_type1()?);
        }
        Ok(self.tree.push(NodeKind::Choice, span, alternatives))
    }

    fn parse_type1(&mut self) -> Result<NodeId, ParseError> {
        let inner = self.parse_type2()?;
        let token = self.peek().clone();
        let TokenKind::Control(name) = token.kind else {
            return Ok(inner);
        };

        if name != "size" {
            return Err(ParseError::unsupported(
                format!("control operator '.{name}'"),
                token.span.line,
                token.span.column,
            ));
        }
        self.advance();

        let size = match self.advance() {
            Token {
                kind: TokenKind::Uint(size),
                ..
            } => size,
            other => {
                return Err(ParseError::unexpected(
                    "size bound",
                    other.kind.to_string(),
                    other.span.line,
                    other.span.column,
                ));
            }
        };
        Ok(self
            .tree
            .push(NodeKind::Sized { size }, token.span, vec![inner]))
    }

    fn parse_type2(&mut self) -> Result<NodeId, ParseError> {
        let token = self.advance();
        let span = token.span;
        match token.kind {
            TokenKind::Uint(value) => {
                Ok(self
                    .tree
                    .push(NodeKind::Literal(Literal::Uint(value)), span, vec![]))
            }
            TokenKind::Minus => {
                let number = self.advance();
                let TokenKind::Uint(value) = number.kind else {
                    return Err(ParseError::unexpected(
                        "number",
                        number.kind.to_string(),
                        number.span.line,
                        number.span.column,
                    ));
                };
                let value = i64::try_from(value)
                    .map(|v| -v)
                    .map_err(|_| ParseError::InvalidNumber {
                        text: format!("-{value}"),
                        line: span.line,
                        column: span.column,
                    })?;
                Ok(self
                    .tree
                    .push(NodeKind::Literal(Literal::Nint(value)), span, vec![]))
            }
            TokenKind::Text(text) => {
                Ok(self
                    .tree
                    .push(NodeKind::Literal(Literal::Text(text)), span, vec![]))
            }
            TokenKind::Ident(name) => Ok(self.tree.push(NodeKind::TypeRef(name), span, vec![])),
            TokenKind::LBrace => {
                let members = self.parse_members(&TokenKind::RBrace)?;
                Ok(self.tree.push(NodeKind::Map, span, members))
            }
            TokenKind::LBracket => {
                let members = self.parse_members(&TokenKind::RBracket)?;
                Ok(self.tree.push(NodeKind::Array, span, members))
            }
            TokenKind::LParen => {
                let inner = self.parse_type()?;
                self.expect(&TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::Ampersand => self.parse_enumeration(span),
            TokenKind::Tag(tag) => {
                self.expect(&TokenKind::LParen)?;
                let inner = self.parse_type()?;
                self.expect(&TokenKind::RParen)?;
                Ok(self.tree.push(NodeKind::Tagged { tag }, span, vec![inner]))
            }
            other => Err(ParseError::unexpected(
                "type",
                other.to_string(),
                span.line,
                span.column,
            )),
        }
    }

    fn parse_enumeration(&mut self, span: Span) -> Result<NodeId, ParseError> {
        if self.eat(&TokenKind::LParen) {
            let members = self.parse_members(&TokenKind::RParen)?;
            return Ok(self.tree.push(NodeKind::Enumeration, span, members));
        }

        // `&name` enumerates the members of a named group.
        let token = self.advance();
        let TokenKind::Ident(name) = token.kind else {
            return Err(ParseError::unexpected(
                "'(' or group name after '&'",
                token.kind.to_string(),
                token.span.line,
                token.span.column,
            ));
        };
        let reference = self.tree.push(NodeKind::TypeRef(name), token.span, vec![]);
        let member = self.tree.push(
            NodeKind::Member {
                key: None,
                occurrence: Occurrence::ONE,
                comment: None,
            },
            token.span,
            vec![reference],
        );
        Ok(self.tree.push(NodeKind::Enumeration, span, vec![member]))
    }

    // Groups

    fn parse_members(&mut self, close: &TokenKind) -> Result<Vec<NodeId>, ParseError> {
        let mut members = Vec::new();
        loop {
            while self.eat(&TokenKind::Comma) {}
            if self.eat(close) {
                return Ok(members);
            }
            if self.at(&TokenKind::DoubleSlash) {
                let token = self.peek();
                return Err(ParseError::unsupported(
                    "group choice ('//')",
                    token.span.line,
                    token.span.column,
                ));
            }
            if self.at(&TokenKind::Eof) {
                return Err(self.error_here(close.to_string()));
            }
            members.push(self.parse_member()?);
        }
    }

    fn parse_member(&mut self) -> Result<NodeId, ParseError> {
        let span = self.peek().span;
        let occurrence = self.parse_occurrence()?;
        let key = self.parse_member_key();
        let ty = self.parse_type()?;
        let comment = self.comments.get(&self.previous_span().line).cloned();

        Ok(self.tree.push(
            NodeKind::Member {
                key,
                occurrence,
                comment,
            },
            span,
            vec![ty],
        ))
    }

    fn parse_occurrence(&mut self) -> Result<Occurrence, ParseError> {
        let kind = self.peek().kind.clone();
        match kind {
            TokenKind::Question => {
                self.advance();
                Ok(Occurrence::OPTIONAL)
            }
            TokenKind::Plus => {
                self.advance();
                Ok(Occurrence { min: 1, max: None })
            }
            TokenKind::Star => {
                self.advance();
                Ok(Occurrence {
                    min: 0,
                    max: self.adjacent_max(),
                })
            }
            TokenKind::Uint(min) if *self.peek_kind_at(1) == TokenKind::Star => {
                self.advance();
                self.advance();
                let max = self.adjacent_max();
                if max.is_some_and(|max| max < min) {
                    let span = self.previous_span();
                    return Err(ParseError::unsupported(
                        format!("occurrence with max below min ({min}*)"),
                        span.line,
                        span.column,
                    ));
                }
                Ok(Occurrence { min, max })
            }
            _ => Ok(Occurrence::ONE),
        }
    }

    /// Consumes an upper occurrence bound written directly after `*`.
    fn adjacent_max(&mut self) -> Option<u64> {
        let star = self.previous_span();
        let token = self.peek();
        let TokenKind::Uint(max) = token.kind else {
            return None;
        };
        if token.span.start != star.end {
            return None;
        }
        self.advance();
        Some(max)
    }

    fn parse_member_key(&mut self) -> Option<MemberKey> {
        let separator = self.peek_kind_at(1).clone();
        let key = match (&self.peek().kind, &separator) {
            (TokenKind::Ident(name), TokenKind::Colon) => MemberKey::Bare(name.clone()),
            (TokenKind::Uint(value), TokenKind::Colon | TokenKind::Arrow) => MemberKey::Int(*value),
            (TokenKind::Text(text), TokenKind::Colon | TokenKind::Arrow) => {
                MemberKey::Text(text.clone())
            }
            _ => return None,
        };
        self.advance();
        self.advance();
        Some(key)
    }
}
