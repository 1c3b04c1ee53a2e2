use baa_foundation::{
    arabic,
    errors::Category,
    span::{SourceLocation, Span},
};
use tracing::trace;

use crate::token::{LexError, Token, TokenKind};

/// How many characters of surrounding source an error token captures on
/// each side of the error point.
const ERROR_CONTEXT_CHARS: usize = 30;

/// A position the lexer can rewind to: a source location plus the byte
/// offset backing it.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Cursor {
    pub location: SourceLocation,
    pub byte: usize,
}

#[derive(Debug)]
pub struct Lexer<'a> {
    pub(crate) input: &'a str,
    pub(crate) filename: &'a str,

    pub(crate) position: usize,
    pub(crate) line: u32,
    pub(crate) column: u32,
    pub(crate) char_offset: u32,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str, filename: &'a str) -> Self {
        Self {
            input,
            filename,
            position: 0,
            line: 1,
            column: 1,
            char_offset: 0,
        }
    }

    pub fn filename(&self) -> &str {
        self.filename
    }

    pub(crate) fn rest(&self) -> &'a str {
        &self.input[self.position..]
    }

    pub(crate) fn current_char(&self) -> Option<char> {
        self.rest().chars().next()
    }

    pub(crate) fn peek_next(&self) -> Option<char> {
        let mut chars = self.rest().chars();
        chars.next();
        chars.next()
    }

    pub(crate) fn advance_char(&mut self) -> Option<char> {
        let c = self.current_char()?;
        self.position += c.len_utf8();
        self.char_offset += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    pub(crate) fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.line,
            column: self.column,
            offset: self.char_offset,
        }
    }

    pub(crate) fn cursor(&self) -> Cursor {
        Cursor {
            location: self.location(),
            byte: self.position,
        }
    }

    fn span_from(&self, start: &Cursor) -> Span {
        Span::new(start.location, self.location())
    }

    /// A token whose lexeme is the raw source consumed since `start`.
    pub(crate) fn token_from_source(&self, kind: TokenKind, start: &Cursor) -> Token {
        Token {
            kind,
            lexeme: self.input[start.byte..self.position].to_owned(),
            span: self.span_from(start),
            error: None,
        }
    }

    /// A token with an explicitly built lexeme (processed literal content).
    pub(crate) fn token_with_lexeme(
        &self,
        kind: TokenKind,
        start: &Cursor,
        lexeme: String,
    ) -> Token {
        Token {
            kind,
            lexeme,
            span: self.span_from(start),
            error: None,
        }
    }

    /// Builds a specific-error token: the lexeme carries the Arabic
    /// description, the payload carries the code, category, suggestion, and
    /// short context snippets around the error point.
    pub(crate) fn error_token(
        &self,
        kind: TokenKind,
        code: u32,
        category: Category,
        start: &Cursor,
        message: String,
        suggestion: Option<&str>,
    ) -> Token {
        let before: String = self.input[..self.position]
            .chars()
            .rev()
            .take(ERROR_CONTEXT_CHARS)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();
        let after: String = self.rest().chars().take(ERROR_CONTEXT_CHARS).collect();
        trace!(code, %message, "error token");
        Token {
            kind,
            lexeme: message,
            span: self.span_from(start),
            error: Some(Box::new(LexError {
                code,
                category,
                suggestion: suggestion.map(str::to_owned),
                before,
                after,
            })),
        }
    }

    /// Advances to a position a fresh token can start from. Called after an
    /// error token has been produced so that scanning yields something
    /// meaningful afterwards.
    pub(crate) fn synchronize(&mut self) {
        while let Some(c) = self.current_char() {
            if c.is_whitespace()
                || matches!(
                    c,
                    '(' | ')' | '{' | '}' | '[' | ']' | ',' | '.' | ';' | ':' | '"' | '\''
                )
            {
                break;
            }
            self.advance_char();
        }
    }

    fn single_char_token(&mut self, kind: TokenKind) -> Token {
        let start = self.cursor();
        self.advance_char();
        self.token_from_source(kind, &start)
    }

    fn single_or_double_char_token(
        &mut self,
        kind: TokenKind,
        second: char,
        second_kind: TokenKind,
    ) -> Token {
        let start = self.cursor();
        self.advance_char();
        if self.current_char() == Some(second) {
            self.advance_char();
            self.token_from_source(second_kind, &start)
        } else {
            self.token_from_source(kind, &start)
        }
    }

    /// `+` is one of `+`, `++`, `+=` - and similarly for the other
    /// arithmetic operators.
    fn arithmetic_operator(
        &mut self,
        kind: TokenKind,
        doubled: Option<TokenKind>,
        assign_kind: TokenKind,
    ) -> Token {
        let start = self.cursor();
        let first = self.current_char();
        self.advance_char();
        match (self.current_char(), doubled) {
            (Some('='), _) => {
                self.advance_char();
                self.token_from_source(assign_kind, &start)
            }
            (repeated, Some(doubled_kind)) if repeated == first => {
                self.advance_char();
                self.token_from_source(doubled_kind, &start)
            }
            _ => self.token_from_source(kind, &start),
        }
    }

    fn whitespace(&mut self) -> Token {
        let start = self.cursor();
        while let Some(' ' | '\t' | '\r') = self.current_char() {
            self.advance_char();
        }
        self.token_from_source(TokenKind::Whitespace, &start)
    }

    fn comment_or_slash(&mut self) -> Token {
        let start = self.cursor();
        self.advance_char(); // /
        match self.current_char() {
            Some('/') => {
                self.advance_char();
                let content_start = self.position;
                while !matches!(self.current_char(), None | Some('\n')) {
                    self.advance_char();
                }
                let content = self.input[content_start..self.position].to_owned();
                self.token_with_lexeme(TokenKind::LineComment, &start, content)
            }
            Some('*') => {
                self.advance_char();
                let is_doc = self.current_char() == Some('*') && self.peek_next() != Some('/');
                if is_doc {
                    self.advance_char();
                }
                let content_start = self.position;
                loop {
                    if self.rest().starts_with("*/") {
                        let content = self.input[content_start..self.position].to_owned();
                        self.advance_char();
                        self.advance_char();
                        let kind = if is_doc {
                            TokenKind::DocComment
                        } else {
                            TokenKind::BlockComment
                        };
                        return self.token_with_lexeme(kind, &start, content);
                    }
                    if self.advance_char().is_none() {
                        return self.error_token(
                            TokenKind::UnterminatedComment,
                            1007,
                            Category::Comment,
                            &start,
                            format!(
                                "تعليق غير منته: لا يوجد '*/' مطابق (بدأ في السطر {}، العمود {}).",
                                start.location.line, start.location.column
                            ),
                            Some("أغلق التعليق بـ '*/'"),
                        );
                    }
                }
            }
            Some('=') => {
                self.advance_char();
                self.token_from_source(TokenKind::SlashAssign, &start)
            }
            _ => self.token_from_source(TokenKind::Slash, &start),
        }
    }

    /// Scans and returns the next token, advancing past it. Never fails:
    /// scanning problems surface as error tokens followed by
    /// resynchronisation.
    pub fn next_token(&mut self) -> Token {
        let start = self.cursor();
        let Some(c) = self.current_char() else {
            return self.token_with_lexeme(TokenKind::Eof, &start, String::new());
        };

        match c {
            ' ' | '\t' | '\r' => self.whitespace(),
            '\n' => self.single_char_token(TokenKind::Newline),
            '/' => self.comment_or_slash(),
            '"' => {
                if self.rest().starts_with("\"\"\"") {
                    self.scan_multiline_string(start)
                } else {
                    self.scan_string(start)
                }
            }
            '\'' => self.scan_char_literal(start),
            'خ' if self.peek_next() == Some('"') => self.scan_raw_string(start),
            c if arabic::is_baa_digit(c) => self.scan_number(start),
            '.' | arabic::ARABIC_DECIMAL_SEPARATOR
                if self.peek_next().is_some_and(arabic::is_baa_digit) =>
            {
                self.scan_number(start)
            }
            c if arabic::is_ident_start(c) => self.scan_identifier(start),
            '+' => self.arithmetic_operator(
                TokenKind::Plus,
                Some(TokenKind::Increment),
                TokenKind::PlusAssign,
            ),
            '-' => self.arithmetic_operator(
                TokenKind::Minus,
                Some(TokenKind::Decrement),
                TokenKind::MinusAssign,
            ),
            '*' => self.arithmetic_operator(TokenKind::Star, None, TokenKind::StarAssign),
            '%' => self.arithmetic_operator(TokenKind::Percent, None, TokenKind::PercentAssign),
            '=' => self.single_or_double_char_token(TokenKind::Assign, '=', TokenKind::EqualEqual),
            '!' => self.single_or_double_char_token(TokenKind::Bang, '=', TokenKind::BangEqual),
            '<' => self.single_or_double_char_token(TokenKind::Less, '=', TokenKind::LessEqual),
            '>' => {
                self.single_or_double_char_token(TokenKind::Greater, '=', TokenKind::GreaterEqual)
            }
            '&' => {
                if self.peek_next() == Some('&') {
                    self.advance_char();
                    self.advance_char();
                    self.token_from_source(TokenKind::AndAnd, &start)
                } else {
                    self.stray_character(start, c)
                }
            }
            '|' => {
                if self.peek_next() == Some('|') {
                    self.advance_char();
                    self.advance_char();
                    self.token_from_source(TokenKind::OrOr, &start)
                } else {
                    self.stray_character(start, c)
                }
            }
            '(' => self.single_char_token(TokenKind::LParen),
            ')' => self.single_char_token(TokenKind::RParen),
            '{' => self.single_char_token(TokenKind::LBrace),
            '}' => self.single_char_token(TokenKind::RBrace),
            '[' => self.single_char_token(TokenKind::LBracket),
            ']' => self.single_char_token(TokenKind::RBracket),
            ',' => self.single_char_token(TokenKind::Comma),
            '.' => self.single_char_token(TokenKind::Dot),
            ';' => self.single_char_token(TokenKind::Semi),
            ':' => self.single_char_token(TokenKind::Colon),
            c => self.stray_character(start, c),
        }
    }

    fn stray_character(&mut self, start: Cursor, c: char) -> Token {
        self.advance_char();
        let message = if arabic::is_arabic_punctuation(c) {
            format!(
                "علامة ترقيم عربية غير مدعومة '{}' (السطر {}، العمود {}).",
                c, start.location.line, start.location.column
            )
        } else {
            format!(
                "حرف غير متوقع '{}' (السطر {}، العمود {}).",
                c, start.location.line, start.location.column
            )
        };
        let token = self.error_token(
            TokenKind::InvalidCharacter,
            1009,
            Category::Lexical,
            &start,
            message,
            None,
        );
        self.synchronize();
        token
    }
}
