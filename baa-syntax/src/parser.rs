//! The recursive-descent parser.
//!
//! Single-token lookahead over the lexer, Pratt precedence climbing for
//! expressions, and panic-mode recovery: the first error on a line of
//! attack sets `panic_mode`, further reports are suppressed until
//! `synchronize` finds a plausible statement boundary.

mod decl;
mod expr;
mod stmt;

use baa_foundation::{
    errors::{Category, Diagnostic},
    span::Span,
};
use baa_lexer::{Lexer, Token, TokenKind};
use tracing::trace;

use crate::{
    ast::{Node, NodeKind},
    types::TypeRegistry,
};

pub(crate) const SYNTAX_ERROR: u32 = 3001;
pub(crate) const LEXICAL_ERROR: u32 = 3002;

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    pub(crate) current: Token,
    pub(crate) previous: Token,
    had_error: bool,
    panic_mode: bool,
    filename: String,
    pub(crate) registry: &'a TypeRegistry,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Parser<'a> {
    /// Builds a parser and primes it so `current` holds the first real
    /// token; lexical errors encountered while priming are reported and
    /// skipped.
    pub fn new(lexer: Lexer<'a>, registry: &'a TypeRegistry) -> Self {
        let filename = lexer.filename().to_owned();
        let placeholder = Token {
            kind: TokenKind::Eof,
            lexeme: String::new(),
            span: Span::EMPTY,
            error: None,
        };
        let mut parser = Self {
            lexer,
            current: placeholder.clone(),
            previous: placeholder,
            had_error: false,
            panic_mode: false,
            filename,
            registry,
            diagnostics: vec![],
        };
        parser.advance();
        parser
    }

    /// True once any syntax error has been reported. Sticky: the parser
    /// never un-errors itself. Callers should treat this as "do not run
    /// later stages".
    pub fn had_error(&self) -> bool {
        self.had_error
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn into_diagnostics(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    /// Moves to the next code token. The evicted previous token's lexeme is
    /// dropped here; error tokens from the lexer are reported and skipped.
    pub(crate) fn advance(&mut self) {
        let next = loop {
            let token = self.lexer.next_token();
            if token.kind.is_trivia() {
                continue;
            }
            if token.kind.is_error() {
                trace!(kind = ?token.kind, "lexical error token");
                self.report(
                    LEXICAL_ERROR,
                    Category::Lexical,
                    token.span,
                    format!("خطأ معجمي: {}", token.lexeme),
                );
                continue;
            }
            break token;
        };
        self.previous = std::mem::replace(&mut self.current, next);
    }

    pub(crate) fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    /// Consumes the current token when it matches.
    pub(crate) fn match_token(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Consumes a token of the expected kind or reports `message` at the
    /// current token without advancing.
    pub(crate) fn consume(&mut self, kind: TokenKind, message: &str) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            self.error_at_current(message);
            false
        }
    }

    pub(crate) fn error_at_current(&mut self, message: impl Into<String>) {
        let span = self.current.span;
        self.error_at(span, message);
    }

    /// Reports a syntax error and enters panic mode; reports while already
    /// panicking are suppressed.
    pub(crate) fn error_at(&mut self, span: Span, message: impl Into<String>) {
        self.report(SYNTAX_ERROR, Category::Syntax, span, message);
    }

    fn report(&mut self, code: u32, category: Category, span: Span, message: impl Into<String>) {
        if self.panic_mode {
            self.had_error = true;
            return;
        }
        self.panic_mode = true;
        self.had_error = true;
        self.diagnostics.push(Diagnostic::error(
            code,
            category,
            &self.filename,
            span.start,
            message.into(),
        ));
    }

    /// Discards tokens until a plausible statement boundary: just after a
    /// statement terminator, or at a keyword that can begin a declaration
    /// or statement.
    pub(crate) fn synchronize(&mut self) {
        while !self.check(TokenKind::Eof) {
            if self.previous.kind == TokenKind::Dot {
                self.panic_mode = false;
                return;
            }
            match self.current.kind {
                TokenKind::TypeInt
                | TokenKind::TypeFloat
                | TokenKind::TypeChar
                | TokenKind::TypeVoid
                | TokenKind::TypeBool
                | TokenKind::Const
                | TokenKind::If
                | TokenKind::While
                | TokenKind::For
                | TokenKind::Return
                | TokenKind::Switch => {
                    self.panic_mode = false;
                    return;
                }
                _ => (),
            }
            self.advance();
        }
        self.panic_mode = false;
    }

    /// The span from `start` through the most recently consumed token.
    pub(crate) fn span_from(&self, start: Span) -> Span {
        start.join(&self.previous.span)
    }

    /// Parses the whole translation unit into a program node. Always
    /// returns a node; syntax errors are reflected in
    /// [`Parser::had_error`] and the collected diagnostics.
    pub fn parse_program(&mut self) -> Node {
        let start = self.current.span;
        let mut declarations = vec![];
        while !self.check(TokenKind::Eof) {
            let position_before = self.current.span;
            match self.parse_declaration_or_statement() {
                Some(declaration) => declarations.push(declaration),
                None => {
                    if self.panic_mode {
                        self.synchronize();
                    }
                    // A failed production that consumed nothing would loop
                    // forever; force progress.
                    if self.current.span == position_before && !self.check(TokenKind::Eof) {
                        self.advance();
                    }
                }
            }
        }
        let span = self.span_from(start);
        Node::new(NodeKind::Program { declarations }, span)
    }
}
