//! Tokenizer for the supported CDDL subset.
//!
//! Comments are not tokens. They are collected per line so the parser can
//! attach trailing comments to members and read `; type key N` annotations.

use crate::error::ParseError;
use crate::syntax::Span;
use logos::{Lexer, Logos, Skip};
use std::collections::BTreeMap;
use std::fmt;

/// Lexer state carried between tokens.
#[derive(Debug, Default)]
pub struct LineState {
    /// Newlines seen so far.
    newlines: usize,
    /// Byte offset of the first character on the current line.
    line_start: usize,
    /// Comment text by 1-based line.
    comments: BTreeMap<usize, String>,
}

impl LineState {
    fn line(&self) -> usize {
        self.newlines + 1
    }

    /// 1-based line and column of `offset`, which must lie on the current
    /// line.
    fn position(&self, source: &str, offset: usize) -> (usize, usize) {
        let column = source
            .get(self.line_start..offset)
            .map_or(0, |prefix| prefix.chars().count());
        (self.line(), column + 1)
    }
}

/// Reasons a token could not be produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum LexError {
    /// No token starts here.
    #[default]
    UnexpectedChar,
    /// Number does not fit in 64 bits.
    InvalidNumber,
    /// Text literal runs into the end of the line.
    UnterminatedText,
    /// `#` followed by anything but `6.N`.
    UnsupportedMajorType,
}

impl LexError {
    fn into_parse_error(self, slice: &str, line: usize, column: usize) -> ParseError {
        match self {
            Self::UnexpectedChar => ParseError::UnexpectedChar {
                ch: slice.chars().next().unwrap_or('\0'),
                line,
                column,
            },
            Self::InvalidNumber => ParseError::InvalidNumber {
                text: slice.to_string(),
                line,
                column,
            },
            Self::UnterminatedText => ParseError::UnterminatedText { line, column },
            Self::UnsupportedMajorType => {
                ParseError::unsupported("major type other than '#6.' tag", line, column)
            }
        }
    }
}

fn newline_callback(lex: &mut Lexer<TokenKind>) -> Skip {
    lex.extras.newlines += 1;
    lex.extras.line_start = lex.span().end;
    Skip
}

fn comment_callback(lex: &mut Lexer<TokenKind>) -> Skip {
    let line = lex.extras.line();
    let text = lex.slice()[1..].trim().to_string();
    lex.extras.comments.insert(line, text);
    Skip
}

fn decimal(lex: &mut Lexer<TokenKind>) -> Result<u64, LexError> {
    lex.slice().parse().map_err(|_| LexError::InvalidNumber)
}

fn prefixed(lex: &mut Lexer<TokenKind>, radix: u32) -> Result<u64, LexError> {
    u64::from_str_radix(&lex.slice()[2..], radix).map_err(|_| LexError::InvalidNumber)
}

fn text_callback(lex: &mut Lexer<TokenKind>) -> String {
    let slice = lex.slice();
    let mut text = String::with_capacity(slice.len());
    let mut chars = slice[1..slice.len() - 1].chars();
    while let Some(c) = chars.next() {
        match c {
            '\\' => text.extend(chars.next()),
            c => text.push(c),
        }
    }
    text
}

fn tag_callback(lex: &mut Lexer<TokenKind>) -> Result<u64, LexError> {
    lex.slice()[3..].parse().map_err(|_| LexError::InvalidNumber)
}

fn unterminated_text_callback(_: &mut Lexer<TokenKind>) -> Result<String, LexError> {
    Err(LexError::UnterminatedText)
}

fn unsupported_major_type_callback(_: &mut Lexer<TokenKind>) -> Result<u64, LexError> {
    Err(LexError::UnsupportedMajorType)
}

/// Token kinds.
#[derive(Logos, Debug, Clone, PartialEq, Eq)]
#[logos(extras = LineState)]
#[logos(error = LexError)]
#[logos(skip r"[ \t\r\f]+")]
pub enum TokenKind {
    /// Identifier (rule or prelude name, bareword key).
    #[regex(r"[A-Za-z@_$]([-.]*[A-Za-z0-9@_$])*", |lex| lex.slice().to_string())]
    Ident(String),
    /// Unsigned integer literal.
    #[regex(r"[0-9]+", decimal)]
    #[regex(r"0[xX][0-9a-fA-F]+", |lex| prefixed(lex, 16))]
    #[regex(r"0[bB][01]+", |lex| prefixed(lex, 2))]
    Uint(u64),
    /// Text literal.
    #[regex(r#""([^"\\\n]|\\.)*""#, text_callback)]
    #[regex(r#""([^"\\\n]|\\.)*\\?"#, unterminated_text_callback)]
    Text(String),
    /// Control operator such as `.size`, without the dot.
    #[regex(r"\.[A-Za-z]+", |lex| lex.slice()[1..].to_string())]
    Control(String),
    /// CBOR tag prefix `#6.N`.
    #[regex(r"#6\.[0-9]+", tag_callback)]
    #[regex(r"#[0-9]?", unsupported_major_type_callback)]
    Tag(u64),
    /// `=`
    #[token("=")]
    Assign,
    /// `=>`
    #[token("=>")]
    Arrow,
    /// `/`
    #[token("/")]
    Slash,
    /// `//`
    #[token("//")]
    DoubleSlash,
    /// `:`
    #[token(":")]
    Colon,
    /// `,`
    #[token(",")]
    Comma,
    /// `?`
    #[token("?")]
    Question,
    /// `*`
    #[token("*")]
    Star,
    /// `+`
    #[token("+")]
    Plus,
    /// `-`
    #[token("-")]
    Minus,
    /// `&`
    #[token("&")]
    Ampersand,
    /// `{`
    #[token("{")]
    LBrace,
    /// `}`
    #[token("}")]
    RBrace,
    /// `[`
    #[token("[")]
    LBracket,
    /// `]`
    #[token("]")]
    RBracket,
    /// `(`
    #[token("(")]
    LParen,
    /// `)`
    #[token(")")]
    RParen,
    /// Line break. Skipped after updating the line count.
    #[token("\n", newline_callback)]
    Newline,
    /// `;` comment. Skipped after recording its text.
    #[regex(r";[^\n]*", comment_callback)]
    Comment,
    /// End of input.
    Eof,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ident(name) => write!(f, "identifier '{name}'"),
            Self::Uint(value) => write!(f, "number {value}"),
            Self::Text(text) => write!(f, "text \"{text}\""),
            Self::Control(name) => write!(f, "control operator '.{name}'"),
            Self::Tag(tag) => write!(f, "tag '#6.{tag}'"),
            Self::Assign => write!(f, "'='"),
            Self::Arrow => write!(f, "'=>'"),
            Self::Slash => write!(f, "'/'"),
            Self::DoubleSlash => write!(f, "'//'"),
            Self::Colon => write!(f, "':'"),
            Self::Comma => write!(f, "','"),
            Self::Question => write!(f, "'?'"),
            Self::Star => write!(f, "'*'"),
            Self::Plus => write!(f, "'+'"),
            Self::Minus => write!(f, "'-'"),
            Self::Ampersand => write!(f, "'&'"),
            Self::LBrace => write!(f, "'{{'"),
            Self::RBrace => write!(f, "'}}'"),
            Self::LBracket => write!(f, "'['"),
            Self::RBracket => write!(f, "']'"),
            Self::LParen => write!(f, "'('"),
            Self::RParen => write!(f, "')'"),
            Self::Newline => write!(f, "line break"),
            Self::Comment => write!(f, "comment"),
            Self::Eof => write!(f, "end of input"),
        }
    }
}

/// A token with its source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// Token kind.
    pub kind: TokenKind,
    /// Source position.
    pub span: Span,
}

/// Lexer output: tokens ending in `Eof`, plus comments keyed by line.
#[derive(Debug, Clone, Default)]
pub struct Lexed {
    /// Tokens in source order, terminated by an `Eof` token.
    pub tokens: Vec<Token>,
    /// Comment text (without the leading `;`, trimmed) by line.
    pub comments: BTreeMap<usize, String>,
}

/// Tokenizes CDDL source text.
///
/// # Errors
/// Returns `ParseError` on characters outside the supported subset,
/// unterminated text literals and malformed numbers.
pub fn tokenize(source: &str) -> Result<Lexed, ParseError> {
    let mut lexer = TokenKind::lexer(source);
    let mut tokens = Vec::new();

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let (line, column) = lexer.extras.position(source, range.start);
        let kind = result.map_err(|err| err.into_parse_error(lexer.slice(), line, column))?;
        tokens.push(Token {
            kind,
            span: Span {
                line,
                column,
                start: range.start,
                end: range.end,
            },
        });
    }

    let end = source.len();
    let (line, column) = lexer.extras.position(source, end);
    tokens.push(Token {
        kind: TokenKind::Eof,
        span: Span {
            line,
            column,
            start: end,
            end,
        },
    });

    Ok(Lexed {
        tokens,
        comments: std::mem::take(&mut lexer.extras.comments),
    })
}
