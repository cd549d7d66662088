//! Incremental tokenizer for the reflected header subset.
//!
//! The lexer pulls physical lines from a [`SourceReader`] on demand and turns
//! them into [`Token`]s. Whitespace, comments, preprocessor directives and
//! `BEGIN_IGNORE_META_SECTION` / `END_IGNORE_META_SECTION` blocks never reach
//! the parser. Lexing never fails: anything unrecognized becomes
//! [`TokenKind::Unknown`] so the parser can skip it.

use std::collections::VecDeque;
use std::io;

use tracing::trace;

use crate::source::{SourceReader, StringSource};
use crate::token::{lookup_reserved, CursorPos, Token, TokenKind};

static EOF_TOKEN: Token = Token {
    kind: TokenKind::Eof,
    pos: CursorPos { column: 1, line: 1 },
};

/// Tokenizer with an unbounded lookahead queue.
pub struct Lexer<R: SourceReader> {
    source: R,
    /// Characters of the physical line being scanned.
    line_buf: Vec<char>,
    /// Index of the next character inside `line_buf`. `line_buf.len()` is the
    /// virtual newline that terminates the line.
    offset: usize,
    line: u32,
    /// False once the source has been exhausted.
    has_line: bool,
    started_reading: bool,
    current: Option<Token>,
    lookahead: VecDeque<Token>,
    last_pos: CursorPos,
}

impl<R: SourceReader> Lexer<R> {
    /// Create a lexer over an already opened source.
    pub fn new(source: R) -> Self {
        Self {
            source,
            line_buf: Vec::new(),
            offset: 0,
            line: 0,
            has_line: false,
            started_reading: false,
            current: None,
            lookahead: VecDeque::new(),
            last_pos: CursorPos::new(1, 1),
        }
    }

    /// Open `source` and create a lexer over it.
    pub fn open(mut source: R) -> io::Result<Self> {
        source.open()?;
        Ok(Self::new(source))
    }

    /// Name of the underlying source.
    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Give the source back, e.g. to close it.
    pub fn into_source(self) -> R {
        self.source
    }

    /// Most recently produced token. Scans the first token on first use.
    pub fn current_token(&mut self) -> &Token {
        if self.current.is_none() {
            let token = self.produce();
            self.current = Some(token);
        }
        self.current_ref()
    }

    /// Advance and return the new current token.
    ///
    /// Once the end of input is reached every further call keeps returning
    /// [`TokenKind::Eof`].
    pub fn next_token(&mut self) -> &Token {
        let token = match self.lookahead.pop_front() {
            Some(token) => token,
            None => self.produce(),
        };
        self.current = Some(token);
        self.current_ref()
    }

    /// Inspect a token without consuming it. Offset 0 is the current token,
    /// offset 1 the token `next_token` would return, and so on. Peeking scans
    /// the current token first if nothing has been scanned yet.
    pub fn peek_token(&mut self, offset: usize) -> &Token {
        if offset == 0 || self.current.is_none() {
            self.current_token();
            if offset == 0 {
                return self.current_ref();
            }
        }

        while self.lookahead.len() < offset {
            let token = self.produce();
            self.lookahead.push_back(token);
        }
        &self.lookahead[offset - 1]
    }

    fn current_ref(&self) -> &Token {
        self.current.as_ref().unwrap_or(&EOF_TOKEN)
    }

    // ========================================================================
    // Ignore sections
    // ========================================================================

    /// Scan the next token visible to the parser, dropping ignore sections.
    fn produce(&mut self) -> Token {
        loop {
            let token = self.scan_token();
            if token.kind != TokenKind::BeginIgnoreSection {
                return token;
            }

            trace!("Entering ignore section at {}", token.pos);
            loop {
                let skipped = self.scan_token();
                match skipped.kind {
                    TokenKind::EndIgnoreSection => break,
                    TokenKind::Eof => return skipped,
                    _ => {}
                }
            }
        }
    }

    // ========================================================================
    // Character stream
    // ========================================================================

    fn ensure_started(&mut self) {
        if !self.started_reading {
            self.started_reading = true;
            self.load_next_line();
        }
    }

    fn load_next_line(&mut self) {
        match self.source.read_line() {
            Some(line) => {
                self.line_buf = line.chars().collect();
                self.offset = 0;
                self.line += 1;
                self.has_line = true;
            }
            None => {
                self.line_buf.clear();
                self.offset = 0;
                self.has_line = false;
            }
        }
    }

    fn cursor(&self) -> CursorPos {
        CursorPos::new(self.offset as u32 + 1, self.line.max(1))
    }

    fn peek_char(&self) -> Option<char> {
        self.peek_char_at(0)
    }

    /// Character `n` positions ahead on the current line, where the line end
    /// reads as `'\n'`. Lookahead never crosses into the next line.
    fn peek_char_at(&self, n: usize) -> Option<char> {
        if !self.has_line {
            return None;
        }

        let index = self.offset + n;
        match index.cmp(&self.line_buf.len()) {
            std::cmp::Ordering::Less => Some(self.line_buf[index]),
            std::cmp::Ordering::Equal => Some('\n'),
            std::cmp::Ordering::Greater => None,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.peek_char()?;
        if self.offset < self.line_buf.len() {
            self.offset += 1;
        } else {
            self.load_next_line();
        }
        Some(ch)
    }

    // ========================================================================
    // Scanning
    // ========================================================================

    fn scan_token(&mut self) -> Token {
        self.ensure_started();

        loop {
            while matches!(self.peek_char(), Some(ch) if ch.is_whitespace()) {
                self.advance();
            }

            let Some(ch) = self.peek_char() else {
                return Token::new(TokenKind::Eof, self.last_pos);
            };

            let start = self.cursor();
            self.last_pos = start;

            match ch {
                '/' if self.peek_char_at(1) == Some('/') => {
                    self.skip_line_comment();
                }
                '/' if self.peek_char_at(1) == Some('*') => {
                    if !self.skip_block_comment() {
                        trace!("Unterminated block comment at {}", start);
                        return Token::new(TokenKind::Unknown("/*".to_string()), start);
                    }
                }
                '#' => self.skip_directive(),
                '"' | '\'' => {
                    let literal = self.scan_literal(ch);
                    return Token::new(TokenKind::Unknown(literal), start);
                }
                c if c.is_ascii_digit() => {
                    let number = self.scan_number();
                    return Token::new(TokenKind::Number(number), start);
                }
                c if c.is_alphabetic() || c == '_' => {
                    return Token::new(self.scan_identifier(), start);
                }
                c => {
                    self.advance();
                    let text = c.to_string();
                    let kind = lookup_reserved(&text).unwrap_or(TokenKind::Unknown(text));
                    return Token::new(kind, start);
                }
            }
        }
    }

    fn skip_line_comment(&mut self) {
        while let Some(ch) = self.peek_char() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    /// Skip a possibly nested block comment. Returns false if input ended
    /// before the comment was closed.
    fn skip_block_comment(&mut self) -> bool {
        let mut depth = 0usize;

        loop {
            match (self.peek_char(), self.peek_char_at(1)) {
                (None, _) => return false,
                (Some('/'), Some('*')) => {
                    self.advance();
                    self.advance();
                    depth += 1;
                }
                (Some('*'), Some('/')) => {
                    self.advance();
                    self.advance();
                    depth -= 1;
                    if depth == 0 {
                        return true;
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    /// Skip a preprocessor directive up to the end of its logical line.
    fn skip_directive(&mut self) {
        self.advance();

        while let Some(ch) = self.peek_char() {
            match ch {
                '\n' => break,
                '\\' => {
                    let mut n = 1;
                    while matches!(self.peek_char_at(n), Some(' ') | Some('\t')) {
                        n += 1;
                    }
                    let continues = self.peek_char_at(n) == Some('\n');
                    for _ in 0..n {
                        self.advance();
                    }
                    if continues {
                        self.advance();
                    }
                }
                _ => {
                    self.advance();
                }
            }
        }
    }

    fn scan_literal(&mut self, quote: char) -> String {
        let mut text = String::new();
        if let Some(ch) = self.advance() {
            text.push(ch);
        }

        while let Some(ch) = self.peek_char() {
            match ch {
                '\n' => break,
                '\\' => {
                    text.push(ch);
                    self.advance();
                    if let Some(escaped) = self.peek_char().filter(|c| *c != '\n') {
                        text.push(escaped);
                        self.advance();
                    }
                }
                c => {
                    text.push(c);
                    self.advance();
                    if c == quote {
                        break;
                    }
                }
            }
        }
        text
    }

    fn scan_number(&mut self) -> String {
        let mut text = String::new();
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' || ch == '.' || ch == '\'' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        text
    }

    fn scan_identifier(&mut self) -> TokenKind {
        let mut text = String::new();
        while let Some(ch) = self.peek_char() {
            if ch.is_alphanumeric() || ch == '_' {
                text.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        lookup_reserved(&text).unwrap_or(TokenKind::Identifier(text))
    }
}

impl Lexer<StringSource> {
    /// Lexer over in-memory text.
    pub fn from_text(text: &str) -> Self {
        let mut source = StringSource::new(text);
        // In-memory sources always open.
        let _ = source.open();
        Self::new(source)
    }
}

/// Yields tokens until the end of input; the terminal `Eof` is not yielded.
impl<R: SourceReader> Iterator for Lexer<R> {
    type Item = Token;

    fn next(&mut self) -> Option<Token> {
        let token = self.next_token().clone();
        if token.is_eof() {
            None
        } else {
            Some(token)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(text: &str) -> Vec<TokenKind> {
        Lexer::from_text(text).map(|token| token.kind).collect()
    }

    fn ident(name: &str) -> TokenKind {
        TokenKind::Identifier(name.to_string())
    }

    #[test]
    fn test_empty_input_yields_eof() {
        let mut lexer = Lexer::from_text("");
        assert!(lexer.next_token().is_eof());
        assert!(lexer.current_token().is_eof());
    }

    #[test]
    fn test_keywords_and_identifiers() {
        assert_eq!(
            kinds("namespace Foo_1 enum Class"),
            vec![TokenKind::Namespace, ident("Foo_1"), TokenKind::Enum, ident("Class")]
        );
    }

    #[test]
    fn test_positions_point_at_first_character() {
        let tokens: Vec<Token> = Lexer::from_text("  enum Foo\n{").collect();
        assert_eq!(tokens[0].pos, CursorPos::new(3, 1));
        assert_eq!(tokens[1].pos, CursorPos::new(8, 1));
        assert_eq!(tokens[2].pos, CursorPos::new(1, 2));
    }

    #[test]
    fn test_numbers_are_kept_verbatim() {
        assert_eq!(
            kinds("0x42 1'000 3.5f"),
            vec![
                TokenKind::Number("0x42".into()),
                TokenKind::Number("1'000".into()),
                TokenKind::Number("3.5f".into()),
            ]
        );
    }

    #[test]
    fn test_string_literal_hides_braces() {
        assert_eq!(
            kinds(r#"x = "{ \" }" ; '}'"#),
            vec![
                ident("x"),
                TokenKind::Assign,
                TokenKind::Unknown(r#""{ \" }""#.into()),
                TokenKind::Semicolon,
                TokenKind::Unknown("'}'".into()),
            ]
        );
    }

    #[test]
    fn test_unknown_characters() {
        assert_eq!(
            kinds("a ( ) b"),
            vec![
                ident("a"),
                TokenKind::Unknown("(".into()),
                TokenKind::Unknown(")".into()),
                ident("b"),
            ]
        );
    }

    #[test]
    fn test_unterminated_block_comment() {
        let mut lexer = Lexer::from_text("a /* never\nclosed");
        assert_eq!(lexer.next_token().kind, ident("a"));
        let unknown = lexer.next_token().clone();
        assert_eq!(unknown.kind, TokenKind::Unknown("/*".into()));
        assert_eq!(unknown.pos, CursorPos::new(3, 1));
        assert!(lexer.next_token().is_eof());
    }

    #[test]
    fn test_comment_between_tokens() {
        assert_eq!(
            kinds("a /* x */ b // trailing\nc"),
            vec![ident("a"), ident("b"), ident("c")]
        );
    }

    #[test]
    fn test_directive_without_continuation_ends_at_newline() {
        assert_eq!(kinds("#include <vector>\nfoo"), vec![ident("foo")]);
        assert_eq!(kinds("#define A \\   \n  B\nfoo"), vec![ident("foo")]);
    }

    #[test]
    fn test_peek_arbitrary_offsets() {
        let mut lexer = Lexer::from_text("a b c d");
        assert_eq!(lexer.current_token().kind, ident("a"));
        assert_eq!(lexer.peek_token(3).kind, ident("d"));
        assert_eq!(lexer.peek_token(1).kind, ident("b"));
        assert_eq!(lexer.peek_token(5).kind, TokenKind::Eof);

        assert_eq!(lexer.next_token().kind, ident("b"));
        assert_eq!(lexer.peek_token(1).kind, ident("c"));
        assert_eq!(lexer.next_token().kind, ident("c"));
        assert_eq!(lexer.next_token().kind, ident("d"));
        assert!(lexer.next_token().is_eof());
    }

    #[test]
    fn test_peek_before_current_keeps_order() {
        let mut lexer = Lexer::from_text("a b c");
        assert_eq!(lexer.peek_token(1).kind, ident("b"));
        assert_eq!(lexer.current_token().kind, ident("a"));
        assert_eq!(lexer.next_token().kind, ident("b"));
        assert_eq!(lexer.next_token().kind, ident("c"));
        assert!(lexer.next_token().is_eof());
    }

    #[test]
    fn test_ignore_section_is_dropped() {
        assert_eq!(
            kinds("a BEGIN_IGNORE_META_SECTION enum X {}; END_IGNORE_META_SECTION b"),
            vec![ident("a"), ident("b")]
        );
    }

    #[test]
    fn test_unclosed_ignore_section_drops_rest() {
        assert_eq!(kinds("a BEGIN_IGNORE_META_SECTION b c"), vec![ident("a")]);
    }

    #[test]
    fn test_stray_end_marker_is_surfaced() {
        assert_eq!(
            kinds("END_IGNORE_META_SECTION a"),
            vec![TokenKind::EndIgnoreSection, ident("a")]
        );
    }
}
