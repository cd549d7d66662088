//! Token definitions shared by the lexer and the parser.
//!
//! Every token carries the `(column, line)` cursor position of its first
//! character. Tokens are immutable once produced by the lexer.

use std::fmt;

use serde::Serialize;

/// Cursor position inside a source file, both components are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct CursorPos {
    pub column: u32,
    pub line: u32,
}

impl CursorPos {
    pub fn new(column: u32, line: u32) -> Self {
        Self { column, line }
    }
}

impl fmt::Display for CursorPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Discriminant of a [`TokenKind`] without its payload.
///
/// Used by the parser to describe what it expected when reporting
/// an unexpected symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum TokenType {
    Eof,
    Namespace,
    Identifier,
    Enum,
    Class,
    Struct,
    Public,
    Protected,
    Private,
    Virtual,
    Override,
    Final,
    Template,
    Colon,
    OpenBrace,
    CloseBrace,
    Semicolon,
    Assign,
    Comma,
    Less,
    Greater,
    EnumMeta,
    ClassMeta,
    BeginIgnoreSection,
    EndIgnoreSection,
    Number,
    Unknown,
}

impl TokenType {
    /// Human readable name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Eof => "EOF",
            TokenType::Namespace => "NAMESPACE",
            TokenType::Identifier => "ID",
            TokenType::Enum => "ENUM",
            TokenType::Class => "CLASS",
            TokenType::Struct => "STRUCT",
            TokenType::Public => "PUBLIC",
            TokenType::Protected => "PROTECTED",
            TokenType::Private => "PRIVATE",
            TokenType::Virtual => "VIRTUAL",
            TokenType::Override => "OVERRIDE",
            TokenType::Final => "FINAL",
            TokenType::Template => "TEMPLATE",
            TokenType::Colon => "COLON",
            TokenType::OpenBrace => "OPEN_BRACE",
            TokenType::CloseBrace => "CLOSE_BRACE",
            TokenType::Semicolon => "SEMICOLON",
            TokenType::Assign => "ASSIGN",
            TokenType::Comma => "COMMA",
            TokenType::Less => "LESS",
            TokenType::Greater => "GREATER",
            TokenType::EnumMeta => "ENUM_META",
            TokenType::ClassMeta => "CLASS_META",
            TokenType::BeginIgnoreSection => "BEGIN_IGNORE_SECTION",
            TokenType::EndIgnoreSection => "END_IGNORE_SECTION",
            TokenType::Number => "NUMBER",
            TokenType::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum TokenKind {
    Eof,

    // Keywords
    Namespace,
    Enum,
    Class,
    Struct,
    Public,
    Protected,
    Private,
    Virtual,
    Override,
    Final,
    Template,

    // Attribute markers
    EnumMeta,
    ClassMeta,
    BeginIgnoreSection,
    EndIgnoreSection,

    // Symbols
    Colon,
    OpenBrace,
    CloseBrace,
    Semicolon,
    Assign,
    Comma,
    Less,
    Greater,

    Identifier(String),
    Number(String),

    /// Anything the lexer could not classify, including string and character
    /// literals which are kept whole.
    Unknown(String),
}

impl TokenKind {
    pub fn token_type(&self) -> TokenType {
        match self {
            TokenKind::Eof => TokenType::Eof,
            TokenKind::Namespace => TokenType::Namespace,
            TokenKind::Enum => TokenType::Enum,
            TokenKind::Class => TokenType::Class,
            TokenKind::Struct => TokenType::Struct,
            TokenKind::Public => TokenType::Public,
            TokenKind::Protected => TokenType::Protected,
            TokenKind::Private => TokenType::Private,
            TokenKind::Virtual => TokenType::Virtual,
            TokenKind::Override => TokenType::Override,
            TokenKind::Final => TokenType::Final,
            TokenKind::Template => TokenType::Template,
            TokenKind::EnumMeta => TokenType::EnumMeta,
            TokenKind::ClassMeta => TokenType::ClassMeta,
            TokenKind::BeginIgnoreSection => TokenType::BeginIgnoreSection,
            TokenKind::EndIgnoreSection => TokenType::EndIgnoreSection,
            TokenKind::Colon => TokenType::Colon,
            TokenKind::OpenBrace => TokenType::OpenBrace,
            TokenKind::CloseBrace => TokenType::CloseBrace,
            TokenKind::Semicolon => TokenType::Semicolon,
            TokenKind::Assign => TokenType::Assign,
            TokenKind::Comma => TokenType::Comma,
            TokenKind::Less => TokenType::Less,
            TokenKind::Greater => TokenType::Greater,
            TokenKind::Identifier(_) => TokenType::Identifier,
            TokenKind::Number(_) => TokenType::Number,
            TokenKind::Unknown(_) => TokenType::Unknown,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(id) => write!(f, "identifier '{}'", id),
            TokenKind::Number(value) => write!(f, "number '{}'", value),
            TokenKind::Unknown(text) => write!(f, "unknown '{}'", text),
            other => f.write_str(other.token_type().as_str()),
        }
    }
}

/// A single lexeme together with its position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: CursorPos,
}

impl Token {
    pub fn new(kind: TokenKind, pos: CursorPos) -> Self {
        Self { kind, pos }
    }

    pub fn token_type(&self) -> TokenType {
        self.kind.token_type()
    }

    pub fn is(&self, token_type: TokenType) -> bool {
        self.kind.token_type() == token_type
    }

    pub fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Identifier text, if this token is an identifier.
    pub fn identifier(&self) -> Option<&str> {
        match &self.kind {
            TokenKind::Identifier(id) => Some(id),
            _ => None,
        }
    }
}

/// Reserved words and symbols, exact and case-sensitive.
pub(crate) const RESERVED_TOKENS: &[(&str, TokenKind)] = &[
    ("namespace", TokenKind::Namespace),
    ("enum", TokenKind::Enum),
    ("class", TokenKind::Class),
    ("struct", TokenKind::Struct),
    ("public", TokenKind::Public),
    ("protected", TokenKind::Protected),
    ("private", TokenKind::Private),
    ("virtual", TokenKind::Virtual),
    ("override", TokenKind::Override),
    ("final", TokenKind::Final),
    ("template", TokenKind::Template),
    ("ENUM_META", TokenKind::EnumMeta),
    ("CLASS_META", TokenKind::ClassMeta),
    ("BEGIN_IGNORE_META_SECTION", TokenKind::BeginIgnoreSection),
    ("END_IGNORE_META_SECTION", TokenKind::EndIgnoreSection),
    ("{", TokenKind::OpenBrace),
    ("}", TokenKind::CloseBrace),
    (":", TokenKind::Colon),
    (";", TokenKind::Semicolon),
    ("=", TokenKind::Assign),
    (",", TokenKind::Comma),
    ("<", TokenKind::Less),
    (">", TokenKind::Greater),
];

/// Look up a reserved word or symbol.
pub(crate) fn lookup_reserved(text: &str) -> Option<TokenKind> {
    RESERVED_TOKENS
        .iter()
        .find(|(word, _)| *word == text)
        .map(|(_, kind)| kind.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_reserved_is_case_sensitive() {
        assert_eq!(lookup_reserved("enum"), Some(TokenKind::Enum));
        assert_eq!(lookup_reserved("Enum"), None);
        assert_eq!(lookup_reserved("ENUM_META"), Some(TokenKind::EnumMeta));
        assert_eq!(lookup_reserved("::"), None);
    }

    #[test]
    fn test_token_display() {
        let token = Token::new(TokenKind::Identifier("Foo".into()), CursorPos::new(3, 2));
        assert_eq!(token.kind.to_string(), "identifier 'Foo'");
        assert_eq!(token.pos.to_string(), "2:3");
        assert_eq!(TokenKind::OpenBrace.to_string(), "OPEN_BRACE");
    }
}
