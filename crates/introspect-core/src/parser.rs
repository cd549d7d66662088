//! Recursive-descent parser for the reflected header subset.
//!
//! The parser consumes tokens from a [`Lexer`] and builds scopes and type
//! descriptors in a [`SymTable`] as it goes. Only namespaces, enums and
//! classes are reflected; function bodies, members and everything else are
//! skipped token by token.
//!
//! Diagnostics are delivered through a callback and never stop the parse:
//! every loop consumes at least one token or returns, so parsing always
//! terminates, even on malformed input.

use std::fmt;

use serde::Serialize;
use thiserror::Error;
use tracing::debug;

use crate::lexer::Lexer;
use crate::source::{SourceReader, StringSource};
use crate::symtable::{ScopeId, SymTable, SymTableError};
use crate::token::{CursorPos, Token, TokenKind, TokenType};
use crate::types::{AccessModifier, BaseClassInfo, ClassType, EnumType, Type, TypeInfo, TypeKind};

// ============================================================================
// Diagnostics
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ParserErrorCode {
    UnexpectedSymbol,
    DuplicateScope,
    Unknown,
}

impl ParserErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ParserErrorCode::UnexpectedSymbol => "UNEXPECTED_SYMBOL",
            ParserErrorCode::DuplicateScope => "DUPLICATE_SCOPE",
            ParserErrorCode::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ParserErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single parse diagnostic.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{pos}: error[{code}]: {message}")]
pub struct ParserError {
    pub code: ParserErrorCode,
    pub pos: CursorPos,
    /// Token the parser was looking for, for unexpected symbols.
    pub expected: Option<TokenType>,
    /// Token actually found, for unexpected symbols.
    pub actual: Option<TokenKind>,
    pub message: String,
}

impl ParserError {
    pub fn unexpected_symbol(expected: Option<TokenType>, actual: &Token) -> Self {
        let message = match expected {
            Some(expected) => format!("expected {}, found {}", expected, actual.kind),
            None => format!("unexpected {}", actual.kind),
        };
        Self {
            code: ParserErrorCode::UnexpectedSymbol,
            pos: actual.pos,
            expected,
            actual: Some(actual.kind.clone()),
            message,
        }
    }

    pub fn duplicate_scope(name: &str, existing: Option<TypeKind>, pos: CursorPos) -> Self {
        let message = match existing {
            Some(kind) => format!("'{}' is already declared as a {} in this scope", name, kind),
            None => format!("'{}' is already declared in this scope", name),
        };
        Self {
            code: ParserErrorCode::DuplicateScope,
            pos,
            expected: None,
            actual: None,
            message,
        }
    }

    pub fn unknown(message: impl Into<String>, pos: CursorPos) -> Self {
        Self {
            code: ParserErrorCode::Unknown,
            pos,
            expected: None,
            actual: None,
            message: message.into(),
        }
    }
}

/// Callback receiving every diagnostic.
pub type ErrorCallback<'a> = Box<dyn FnMut(&ParserError) + 'a>;

// ============================================================================
// Parser
// ============================================================================

pub struct Parser<'a, R: SourceReader> {
    lexer: &'a mut Lexer<R>,
    table: &'a mut SymTable,
    on_error: ErrorCallback<'a>,
    error_count: usize,
    /// Attribute marker seen before the next declaration.
    pending_marker: Option<TokenType>,
}

impl<'a, R: SourceReader> Parser<'a, R> {
    pub fn new(
        lexer: &'a mut Lexer<R>,
        table: &'a mut SymTable,
        on_error: impl FnMut(&ParserError) + 'a,
    ) -> Self {
        Self {
            lexer,
            table,
            on_error: Box::new(on_error),
            error_count: 0,
            pending_marker: None,
        }
    }

    /// Parse the whole input. Returns the number of reported diagnostics.
    pub fn parse(&mut self) -> usize {
        loop {
            self.parse_declaration_sequence();

            let token = self.current();
            match token.kind {
                TokenKind::Eof => break,
                _ => {
                    self.report(ParserError::unexpected_symbol(None, &token));
                    self.advance();
                }
            }
        }

        self.table.reset_cursor();
        debug!(
            "Parsed {} ({} scopes, {} diagnostics)",
            self.lexer.source_name(),
            self.table.scope_count(),
            self.error_count
        );
        self.error_count
    }

    // ========================================================================
    // Token helpers
    // ========================================================================

    fn current(&mut self) -> Token {
        self.lexer.current_token().clone()
    }

    fn current_type(&mut self) -> TokenType {
        self.lexer.current_token().token_type()
    }

    fn current_is(&mut self, token_type: TokenType) -> bool {
        self.current_type() == token_type
    }

    fn current_is_unknown(&mut self, text: &str) -> bool {
        matches!(&self.lexer.current_token().kind, TokenKind::Unknown(t) if t == text)
    }

    fn peek_type(&mut self, offset: usize) -> TokenType {
        self.lexer.peek_token(offset).token_type()
    }

    fn advance(&mut self) {
        self.lexer.next_token();
    }

    fn report(&mut self, error: ParserError) {
        self.error_count += 1;
        debug!("{}: {}", self.lexer.source_name(), error);
        (self.on_error)(&error);
    }

    /// Check the current token and report a mismatch. Does not consume.
    fn expect(&mut self, expected: TokenType) -> bool {
        let token = self.current();
        if token.is(expected) {
            return true;
        }
        self.report(ParserError::unexpected_symbol(Some(expected), &token));
        false
    }

    /// Check and consume the current token.
    fn eat(&mut self, expected: TokenType) -> bool {
        if !self.expect(expected) {
            return false;
        }
        self.advance();
        true
    }

    fn take_marker(&mut self, marker: TokenType) -> bool {
        self.pending_marker.take() == Some(marker)
    }

    // ========================================================================
    // Declaration sequences
    // ========================================================================

    /// Parse declarations until `}` or the end of input. Neither is consumed.
    fn parse_declaration_sequence(&mut self) {
        loop {
            match self.current_type() {
                TokenType::Eof | TokenType::CloseBrace => return,
                TokenType::Namespace => {
                    self.pending_marker = None;
                    self.parse_namespace_definition();
                }
                TokenType::Template => {
                    self.parse_template_declaration(AccessModifier::Public);
                }
                TokenType::Enum => {
                    let marked = self.take_marker(TokenType::EnumMeta);
                    self.parse_enum_declaration(AccessModifier::Public, marked);
                }
                TokenType::Class | TokenType::Struct => {
                    let marked = self.take_marker(TokenType::ClassMeta);
                    self.parse_class_declaration(AccessModifier::Public, false, marked);
                }
                TokenType::EnumMeta | TokenType::ClassMeta => self.parse_marker(),
                TokenType::OpenBrace => {
                    self.pending_marker = None;
                    self.skip_compound_statement();
                }
                _ => {
                    self.pending_marker = None;
                    self.advance();
                }
            }
        }
    }

    /// Consume `ENUM_META` / `CLASS_META` and an optional argument list.
    fn parse_marker(&mut self) {
        let marker = self.current_type();
        self.advance();
        self.skip_parenthesized();
        self.pending_marker = Some(marker);
    }

    fn skip_parenthesized(&mut self) {
        self.skip_balanced("(", ")");
    }

    /// Skip a balanced `open ... close` group starting at the current token.
    fn skip_balanced(&mut self, open: &str, close: &str) {
        if !self.current_is_unknown(open) {
            return;
        }

        let mut depth = 0usize;
        loop {
            if self.current_is(TokenType::Eof) {
                let token = self.current();
                self.report(ParserError::unexpected_symbol(None, &token));
                return;
            }
            if self.current_is_unknown(open) {
                depth += 1;
            } else if self.current_is_unknown(close) {
                depth -= 1;
                if depth == 0 {
                    self.advance();
                    return;
                }
            }
            self.advance();
        }
    }

    /// Skip one `[[...]]` or `alignas(...)` attribute, if present.
    fn skip_attribute(&mut self) -> bool {
        if self.current_is_unknown("[") {
            self.skip_balanced("[", "]");
            return true;
        }

        let is_alignas = self.current().identifier() == Some("alignas")
            && matches!(&self.lexer.peek_token(1).kind, TokenKind::Unknown(t) if t == "(");
        if is_alignas {
            self.advance();
            self.skip_parenthesized();
        }
        is_alignas
    }

    // ========================================================================
    // Namespaces
    // ========================================================================

    fn parse_namespace_definition(&mut self) -> bool {
        self.advance();

        if self.current_is(TokenType::Identifier) {
            self.parse_named_namespace_definition()
        } else {
            self.parse_anonymous_namespace_definition()
        }
    }

    fn parse_named_namespace_definition(&mut self) -> bool {
        let mut names = Vec::new();
        let start = self.current().pos;

        while let Some(name) = self.current().identifier().map(str::to_string) {
            names.push(name);
            self.advance();

            let nested = self.current_is(TokenType::Colon)
                && self.peek_type(1) == TokenType::Colon
                && self.peek_type(2) == TokenType::Identifier;
            if !nested {
                break;
            }
            self.advance();
            self.advance();
        }

        // namespace alias
        if self.current_is(TokenType::Assign) {
            self.skip_declaration();
            return true;
        }

        if !self.expect(TokenType::OpenBrace) {
            return false;
        }

        let mut opened = 0;
        for name in &names {
            if self.open_named_scope(name, TypeKind::Namespace, start).is_none() {
                break;
            }
            if self.table.current_scope_type().is_none() {
                let mangled_id = self.table.mangled_name_of(self.table.current_scope_id(), name);
                self.table
                    .set_current_scope_type(Type::Namespace(TypeInfo::new(name.clone(), mangled_id)));
            }
            opened += 1;
        }

        if opened < names.len() {
            for _ in 0..opened {
                self.table.exit_scope();
            }
            self.skip_compound_statement();
            return false;
        }

        let result = self.parse_namespace_body();
        for _ in 0..opened {
            self.table.exit_scope();
        }
        result
    }

    fn parse_anonymous_namespace_definition(&mut self) -> bool {
        if !self.expect(TokenType::OpenBrace) {
            return false;
        }

        if let Err(e) = self.table.create_scope("") {
            let pos = self.current().pos;
            self.report(ParserError::unknown(e.to_string(), pos));
            self.skip_compound_statement();
            return false;
        }

        let result = self.parse_namespace_body();
        self.table.exit_scope();
        result
    }

    /// `{ declaration-sequence }` with the current token on `{`.
    fn parse_namespace_body(&mut self) -> bool {
        self.advance();
        self.parse_declaration_sequence();
        self.eat(TokenType::CloseBrace)
    }

    /// Create the named scope, or re-enter it when it already exists with a
    /// compatible kind. Reports a duplicate and returns `None` otherwise.
    fn open_named_scope(&mut self, name: &str, kind: TypeKind, pos: CursorPos) -> Option<ScopeId> {
        match self.table.create_scope(name) {
            Ok(id) => Some(id),
            Err(SymTableError::DuplicateScope { .. }) => {
                let existing = self
                    .table
                    .current_scope()
                    .named()
                    .get(name)
                    .and_then(|id| self.table.scope(*id).ty())
                    .map(Type::kind);

                if existing.is_some_and(|existing| existing != kind) {
                    self.report(ParserError::duplicate_scope(name, existing, pos));
                    return None;
                }

                match self.table.enter_scope(name) {
                    Ok(id) => Some(id),
                    Err(e) => {
                        self.report(ParserError::unknown(e.to_string(), pos));
                        None
                    }
                }
            }
            Err(e) => {
                self.report(ParserError::unknown(e.to_string(), pos));
                None
            }
        }
    }

    // ========================================================================
    // Templates
    // ========================================================================

    /// `template < ... >` followed by exactly one declaration.
    fn parse_template_declaration(&mut self, access: AccessModifier) -> bool {
        self.advance();

        if self.current_is(TokenType::Less) && !self.skip_angle_brackets() {
            return false;
        }

        loop {
            match self.current_type() {
                TokenType::Template => return self.parse_template_declaration(access),
                TokenType::Class | TokenType::Struct => {
                    let marked = self.take_marker(TokenType::ClassMeta);
                    return self.parse_class_declaration(access, true, marked);
                }
                TokenType::EnumMeta | TokenType::ClassMeta => self.parse_marker(),
                _ => {
                    self.pending_marker = None;
                    self.skip_declaration();
                    return true;
                }
            }
        }
    }

    /// Skip a balanced `< ... >` list with the current token on `<`.
    fn skip_angle_brackets(&mut self) -> bool {
        self.collect_angle_brackets().is_some()
    }

    /// Consume a balanced `< ... >` list and return its compact text.
    fn collect_angle_brackets(&mut self) -> Option<String> {
        let mut text = String::new();
        let mut depth = 0usize;
        let mut parens = 0usize;

        loop {
            let token = self.current();
            match &token.kind {
                TokenKind::Eof
                | TokenKind::Semicolon
                | TokenKind::OpenBrace
                | TokenKind::CloseBrace => {
                    self.report(ParserError::unexpected_symbol(Some(TokenType::Greater), &token));
                    return None;
                }
                TokenKind::Less if parens == 0 => depth += 1,
                TokenKind::Greater if parens == 0 => {
                    depth -= 1;
                    if depth == 0 {
                        text.push('>');
                        self.advance();
                        return Some(text);
                    }
                }
                TokenKind::Unknown(t) if t == "(" => parens += 1,
                TokenKind::Unknown(t) if t == ")" => parens = parens.saturating_sub(1),
                _ => {}
            }

            push_token_text(&mut text, &token.kind);
            self.advance();
        }
    }

    // ========================================================================
    // Enums
    // ========================================================================

    fn parse_enum_declaration(&mut self, access: AccessModifier, mut marked: bool) -> bool {
        self.advance();

        let mut strongly_typed = false;
        if matches!(self.current_type(), TokenType::Class | TokenType::Struct) {
            strongly_typed = true;
            self.advance();
        }

        loop {
            match self.current_type() {
                TokenType::EnumMeta | TokenType::ClassMeta => {
                    marked |= self.current_is(TokenType::EnumMeta);
                    self.advance();
                    self.skip_parenthesized();
                }
                _ if self.skip_attribute() => {}
                _ => break,
            }
        }

        let token = self.current();
        let Some(name) = token.identifier().map(str::to_string) else {
            if matches!(token.token_type(), TokenType::OpenBrace | TokenType::Colon) {
                // anonymous enum, nothing to reflect
                self.skip_declaration();
                return true;
            }
            self.report(ParserError::unexpected_symbol(Some(TokenType::Identifier), &token));
            return false;
        };
        self.advance();

        let mut underlying_type = None;
        if self.current_is(TokenType::Colon) {
            self.advance();
            underlying_type = Some(self.collect_underlying_type());
        }

        if !matches!(
            self.current_type(),
            TokenType::OpenBrace | TokenType::Semicolon
        ) {
            // elaborated type use such as `enum E value;`
            self.skip_declaration();
            return true;
        }

        let Some(scope_id) = self.open_named_scope(&name, TypeKind::Enum, token.pos) else {
            self.skip_declaration();
            return false;
        };

        let mut enumerators = Vec::new();
        let has_body = self.current_is(TokenType::OpenBrace);
        let mut result = true;
        if has_body {
            result = self.parse_enum_body(&mut enumerators);
        }

        let mangled_id = self.table.mangled_name_of(scope_id, &name);
        let introspectable = self.table.is_reachable_by_name(scope_id);

        match self.table.current_scope_type_mut().and_then(Type::as_enum_mut) {
            Some(existing) => {
                if has_body {
                    existing.is_forward_declaration = false;
                    existing.enumerators = enumerators;
                    existing.is_strongly_typed = strongly_typed;
                    existing.access_modifier = access;
                    if let Some(underlying) = underlying_type {
                        existing.underlying_type = underlying;
                    }
                }
                existing.is_marked_with_attribute |= marked;
            }
            None => {
                let mut ty = EnumType::new(name, mangled_id);
                ty.is_strongly_typed = strongly_typed;
                ty.is_introspectable = introspectable;
                ty.is_forward_declaration = !has_body;
                ty.enumerators = enumerators;
                ty.is_marked_with_attribute = marked;
                ty.access_modifier = access;
                if let Some(underlying) = underlying_type {
                    ty.underlying_type = underlying;
                }
                self.table.set_current_scope_type(Type::Enum(ty));
            }
        }

        self.table.exit_scope();
        self.expect_declaration_end() && result
    }

    /// Text of an underlying type clause, e.g. `unsigned int` or
    /// `std::uint8_t`. Stops before `{` or `;`.
    fn collect_underlying_type(&mut self) -> String {
        let mut text = String::new();
        let mut after_identifier = false;

        loop {
            let token = self.current();
            match &token.kind {
                TokenKind::Eof | TokenKind::OpenBrace | TokenKind::Semicolon => break,
                TokenKind::Identifier(id) => {
                    if after_identifier {
                        text.push(' ');
                    }
                    text.push_str(id);
                    after_identifier = true;
                }
                TokenKind::Colon => {
                    text.push(':');
                    after_identifier = false;
                }
                _ => after_identifier = false,
            }
            self.advance();
        }
        text
    }

    /// `{ A, B = value, ... }` with the current token on `{`.
    fn parse_enum_body(&mut self, enumerators: &mut Vec<String>) -> bool {
        self.advance();

        loop {
            let token = self.current();
            match &token.kind {
                TokenKind::Eof => {
                    self.report(ParserError::unexpected_symbol(Some(TokenType::CloseBrace), &token));
                    return false;
                }
                TokenKind::CloseBrace => {
                    self.advance();
                    return true;
                }
                TokenKind::Identifier(id) => {
                    enumerators.push(id.clone());
                    self.advance();
                }
                TokenKind::Assign => {
                    self.advance();
                    if !self.skip_enumerator_value() {
                        return false;
                    }
                }
                _ => self.advance(),
            }
        }
    }

    /// Skip an enumerator initializer up to the next `,` or `}`.
    fn skip_enumerator_value(&mut self) -> bool {
        let mut parens = 0usize;
        let mut braces = 0usize;

        loop {
            let token = self.current();
            match &token.kind {
                TokenKind::Eof => {
                    self.report(ParserError::unknown(
                        "enumerator value truncated by end of input",
                        token.pos,
                    ));
                    return false;
                }
                TokenKind::Comma | TokenKind::CloseBrace if parens == 0 && braces == 0 => return true,
                TokenKind::OpenBrace => braces += 1,
                TokenKind::CloseBrace => braces = braces.saturating_sub(1),
                TokenKind::Unknown(t) if t == "(" => parens += 1,
                TokenKind::Unknown(t) if t == ")" => parens = parens.saturating_sub(1),
                _ => {}
            }
            self.advance();
        }
    }

    // ========================================================================
    // Classes
    // ========================================================================

    fn parse_class_declaration(&mut self, access: AccessModifier, is_template: bool, mut marked: bool) -> bool {
        let is_struct = self.current_is(TokenType::Struct);
        self.advance();

        loop {
            match self.current_type() {
                TokenType::EnumMeta | TokenType::ClassMeta => {
                    marked |= self.current_is(TokenType::ClassMeta);
                    self.advance();
                    self.skip_parenthesized();
                }
                _ if self.skip_attribute() => {}
                // export macros such as `class API_EXPORT Name {`, but not
                // elaborated uses such as `struct stat buf;`
                TokenType::Identifier
                    if self.peek_type(1) == TokenType::Identifier
                        && matches!(
                            self.peek_type(2),
                            TokenType::OpenBrace | TokenType::Colon | TokenType::Final | TokenType::Less
                        ) =>
                {
                    self.advance()
                }
                _ => break,
            }
        }

        let token = self.current();
        let Some(name) = token.identifier().map(str::to_string) else {
            if token.is(TokenType::OpenBrace) {
                // anonymous class or struct
                self.skip_declaration();
                return true;
            }
            self.report(ParserError::unexpected_symbol(Some(TokenType::Identifier), &token));
            return false;
        };
        self.advance();

        let mut is_template = is_template;
        if self.current_is(TokenType::Less) {
            if !self.skip_angle_brackets() {
                return false;
            }
            is_template = true;
        }

        if !matches!(
            self.current_type(),
            TokenType::Final | TokenType::Colon | TokenType::OpenBrace | TokenType::Semicolon
        ) {
            // elaborated type use such as `class Foo* member;`
            self.skip_declaration();
            return true;
        }

        let Some(scope_id) = self.open_named_scope(&name, TypeKind::Class, token.pos) else {
            self.skip_declaration();
            return false;
        };

        let mut is_final = false;
        if self.current_is(TokenType::Final) {
            is_final = true;
            self.advance();
        }

        let default_access = if is_struct {
            AccessModifier::Public
        } else {
            AccessModifier::Private
        };

        let mut base_classes = Vec::new();
        let mut result = true;
        if self.current_is(TokenType::Colon) {
            self.advance();
            result = self.parse_base_clause(default_access, &mut base_classes);
        }

        let has_body = self.current_is(TokenType::OpenBrace);
        let mangled_id = self.table.mangled_name_of(scope_id, &name);

        match self.table.current_scope_type_mut().and_then(Type::as_class_mut) {
            Some(existing) => {
                if has_body {
                    existing.is_forward_declaration = false;
                    existing.is_final = is_final;
                    existing.is_struct = is_struct;
                    existing.is_template = is_template;
                    existing.base_classes = base_classes;
                    existing.access_modifier = access;
                }
                existing.is_marked_with_attribute |= marked;
            }
            None => {
                let mut ty = ClassType::new(name, mangled_id);
                ty.is_final = is_final;
                ty.is_forward_declaration = !has_body;
                ty.is_struct = is_struct;
                ty.is_template = is_template;
                ty.base_classes = base_classes;
                ty.is_marked_with_attribute = marked;
                ty.access_modifier = access;
                self.table.set_current_scope_type(Type::Class(ty));
            }
        }

        if has_body {
            result &= self.parse_class_body(default_access);
        }

        self.table.exit_scope();
        self.expect_declaration_end() && result
    }

    /// Base list after `:`, up to `{` or `;`.
    fn parse_base_clause(&mut self, default_access: AccessModifier, bases: &mut Vec<BaseClassInfo>) -> bool {
        loop {
            let mut access = default_access;
            let mut is_virtual = false;

            loop {
                match self.current_type() {
                    TokenType::Public => access = AccessModifier::Public,
                    TokenType::Protected => access = AccessModifier::Protected,
                    TokenType::Private => access = AccessModifier::Private,
                    TokenType::Virtual => is_virtual = true,
                    _ => break,
                }
                self.advance();
            }

            let Some(full_name) = self.parse_qualified_name() else {
                return false;
            };
            bases.push(BaseClassInfo {
                full_name,
                is_virtual_inherited: is_virtual,
                access,
            });

            if !self.current_is(TokenType::Comma) {
                return true;
            }
            self.advance();
        }
    }

    /// `[::]Name[<args>](::Name[<args>])*` as compact text.
    fn parse_qualified_name(&mut self) -> Option<String> {
        let mut text = String::new();

        if self.current_is(TokenType::Colon) && self.peek_type(1) == TokenType::Colon {
            text.push_str("::");
            self.advance();
            self.advance();
        }

        loop {
            let token = self.current();
            let Some(id) = token.identifier() else {
                self.report(ParserError::unexpected_symbol(Some(TokenType::Identifier), &token));
                return None;
            };
            text.push_str(id);
            self.advance();

            if self.current_is(TokenType::Less) {
                text.push_str(&self.collect_angle_brackets()?);
            }

            let nested = self.current_is(TokenType::Colon) && self.peek_type(1) == TokenType::Colon;
            if !nested {
                return Some(text);
            }
            text.push_str("::");
            self.advance();
            self.advance();
        }
    }

    /// `{ members }` with the current token on `{`. Nested types are parsed,
    /// everything else is skipped.
    fn parse_class_body(&mut self, default_access: AccessModifier) -> bool {
        self.advance();
        let mut access = default_access;
        let mut result = true;

        loop {
            let token = self.current();
            match token.token_type() {
                TokenType::Eof => {
                    self.report(ParserError::unexpected_symbol(Some(TokenType::CloseBrace), &token));
                    return false;
                }
                TokenType::CloseBrace => {
                    self.advance();
                    return result;
                }
                TokenType::Public | TokenType::Protected | TokenType::Private => {
                    access = match token.token_type() {
                        TokenType::Public => AccessModifier::Public,
                        TokenType::Protected => AccessModifier::Protected,
                        _ => AccessModifier::Private,
                    };
                    self.advance();
                    if self.current_is(TokenType::Colon) {
                        self.advance();
                    }
                }
                TokenType::Enum => {
                    let marked = self.take_marker(TokenType::EnumMeta);
                    result &= self.parse_enum_declaration(access, marked);
                }
                TokenType::Class | TokenType::Struct => {
                    let marked = self.take_marker(TokenType::ClassMeta);
                    result &= self.parse_class_declaration(access, false, marked);
                }
                TokenType::Template => {
                    result &= self.parse_template_declaration(access);
                }
                TokenType::EnumMeta | TokenType::ClassMeta => self.parse_marker(),
                TokenType::OpenBrace => {
                    self.pending_marker = None;
                    result &= self.skip_compound_statement();
                }
                TokenType::Identifier if token.identifier() == Some("friend") => {
                    self.pending_marker = None;
                    self.skip_declaration();
                }
                _ => {
                    self.pending_marker = None;
                    self.advance();
                }
            }
        }
    }

    // ========================================================================
    // Skipping
    // ========================================================================

    /// Skip a balanced `{ ... }` block with the current token on `{`.
    fn skip_compound_statement(&mut self) -> bool {
        self.advance();
        let mut depth = 1usize;

        loop {
            let token = self.current();
            match token.kind {
                TokenKind::Eof => {
                    self.report(ParserError::unexpected_symbol(Some(TokenType::CloseBrace), &token));
                    return false;
                }
                TokenKind::OpenBrace => depth += 1,
                TokenKind::CloseBrace => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return true;
                    }
                }
                _ => {}
            }
            self.advance();
        }
    }

    /// Skip to the end of the current declaration: through `;`, or through a
    /// `{ ... }` body and an optional `;`. Stops before `}`.
    fn skip_declaration(&mut self) {
        loop {
            match self.current_type() {
                TokenType::Eof | TokenType::CloseBrace => return,
                TokenType::Semicolon => {
                    self.advance();
                    return;
                }
                TokenType::OpenBrace => {
                    self.skip_compound_statement();
                    self.expect_declaration_end_quietly();
                    return;
                }
                _ => self.advance(),
            }
        }
    }

    /// Consume an optional declarator list and the trailing `;`.
    fn expect_declaration_end(&mut self) -> bool {
        self.skip_declarators();
        self.eat(TokenType::Semicolon)
    }

    fn expect_declaration_end_quietly(&mut self) {
        self.skip_declarators();
        if self.current_is(TokenType::Semicolon) {
            self.advance();
        }
    }

    /// Skip declarator tokens such as `value`, `*ptr = nullptr`, `arr[4]`.
    fn skip_declarators(&mut self) {
        while matches!(
            self.current_type(),
            TokenType::Identifier
                | TokenType::Unknown
                | TokenType::Number
                | TokenType::Comma
                | TokenType::Assign
                | TokenType::Less
                | TokenType::Greater
        ) {
            self.advance();
        }
    }
}

/// Append a token's text to a compact type name.
fn push_token_text(text: &mut String, kind: &TokenKind) {
    match kind {
        TokenKind::Identifier(s) | TokenKind::Number(s) | TokenKind::Unknown(s) => {
            if text.ends_with(|c: char| c.is_alphanumeric() || c == '_')
                && s.starts_with(|c: char| c.is_alphanumeric() || c == '_')
            {
                text.push(' ');
            }
            text.push_str(s);
        }
        TokenKind::Colon => text.push(':'),
        TokenKind::Comma => text.push(','),
        TokenKind::Less => text.push('<'),
        TokenKind::Greater => text.push('>'),
        TokenKind::Assign => text.push('='),
        TokenKind::Class => push_keyword(text, "class"),
        TokenKind::Struct => push_keyword(text, "struct"),
        TokenKind::Enum => push_keyword(text, "enum"),
        _ => {}
    }
}

fn push_keyword(text: &mut String, keyword: &str) {
    if text.ends_with(|c: char| c.is_alphanumeric() || c == '_') {
        text.push(' ');
    }
    text.push_str(keyword);
}

// ============================================================================
// Convenience entry points
// ============================================================================

/// Parse everything `lexer` yields into `table`, collecting diagnostics.
pub fn parse_into<R: SourceReader>(lexer: &mut Lexer<R>, table: &mut SymTable) -> Vec<ParserError> {
    let mut errors = Vec::new();
    Parser::new(lexer, table, |error: &ParserError| errors.push(error.clone())).parse();
    errors
}

/// Parse in-memory text into a fresh table.
pub fn parse_str(name: &str, text: &str) -> (SymTable, Vec<ParserError>) {
    let mut source = StringSource::with_name(name, text);
    // In-memory sources always open.
    let _ = source.open();

    let mut lexer = Lexer::new(source);
    let mut table = SymTable::with_source_filename(name);
    let errors = parse_into(&mut lexer, &mut table);
    (table, errors)
}
