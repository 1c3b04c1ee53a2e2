//! Declarations: the top-level dispatcher, variable declarations, function
//! definitions, and type specifiers.

use baa_foundation::span::Span;
use baa_lexer::TokenKind;

use crate::{
    ast::{Modifiers, Node, NodeKind},
    parser::Parser,
    types::TypeId,
};

impl Parser<'_> {
    /// Top-level dispatch: modifiers or a type keyword open a declaration;
    /// after `modifiers type identifier`, a `(` selects a function
    /// definition and anything else a variable declaration. All other
    /// tokens fall through to statement parsing.
    pub(crate) fn parse_declaration_or_statement(&mut self) -> Option<Node> {
        if self.current.kind.is_modifier_keyword() || self.current.kind.is_type_keyword() {
            self.parse_typed_declaration(true)
        } else {
            self.parse_statement()
        }
    }

    fn parse_modifiers(&mut self) -> Modifiers {
        let mut modifiers = Modifiers::empty();
        loop {
            let modifier = match self.current.kind {
                TokenKind::Const => Modifiers::CONST,
                TokenKind::Inline => Modifiers::INLINE,
                TokenKind::Restrict => Modifiers::RESTRICT,
                _ => break,
            };
            modifiers |= modifier;
            self.advance();
        }
        modifiers
    }

    /// `modifiers type identifier …` - shared head of variable declarations
    /// and function definitions.
    pub(crate) fn parse_typed_declaration(&mut self, allow_function: bool) -> Option<Node> {
        let start = self.current.span;
        let modifiers = self.parse_modifiers();
        if !self.current.kind.is_type_keyword() {
            self.error_at_current("متوقع نوع بعد محددات الإعلان.");
            return None;
        }
        let type_spec = self.parse_type_specifier()?;

        if !self.check(TokenKind::Ident) {
            self.error_at_current("متوقع اسم بعد النوع.");
            return None;
        }
        let name = self.current.lexeme.clone();
        self.advance();

        if self.check(TokenKind::LParen) {
            if allow_function {
                return self.parse_function_definition(start, modifiers, type_spec, name);
            }
            self.error_at_current("تعريف الدوال غير مسموح داخل الكتل.");
            return None;
        }

        let initializer = if self.match_token(TokenKind::Assign) {
            Some(Box::new(self.parse_expression()?))
        } else {
            None
        };
        self.consume(TokenKind::Dot, "متوقع '.' في نهاية إعلان المتغير.");
        Some(Node::new(
            NodeKind::VarDecl {
                name,
                modifiers,
                type_spec: Box::new(type_spec),
                initializer,
            },
            self.span_from(start),
        ))
    }

    fn parse_function_definition(
        &mut self,
        start: Span,
        modifiers: Modifiers,
        return_type: Node,
        name: String,
    ) -> Option<Node> {
        self.advance(); // (
        let mut parameters = vec![];
        if !self.check(TokenKind::RParen) {
            loop {
                parameters.push(self.parse_parameter()?);
                if !self.match_token(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RParen, "متوقع ')' بعد قائمة المعاملات.");

        if !self.check(TokenKind::LBrace) {
            self.error_at_current("متوقع '{' لبدء جسم الدالة.");
            return None;
        }
        let body = self.parse_block()?;

        Some(Node::new(
            NodeKind::FunctionDef {
                name,
                modifiers,
                return_type: Box::new(return_type),
                parameters,
                body: Box::new(body),
            },
            self.span_from(start),
        ))
    }

    fn parse_parameter(&mut self) -> Option<Node> {
        let start = self.current.span;
        if !self.current.kind.is_type_keyword() {
            self.error_at_current("متوقع نوع المعامل.");
            return None;
        }
        let type_spec = self.parse_type_specifier()?;
        if !self.check(TokenKind::Ident) {
            self.error_at_current("متوقع اسم المعامل.");
            return None;
        }
        let name = self.current.lexeme.clone();
        self.advance();
        Some(Node::new(
            NodeKind::Parameter {
                name,
                type_spec: Box::new(type_spec),
            },
            self.span_from(start),
        ))
    }

    fn primitive_for(&self, kind: TokenKind) -> Option<TypeId> {
        Some(match kind {
            TokenKind::TypeInt => self.registry.int(),
            TokenKind::TypeFloat => self.registry.float(),
            TokenKind::TypeChar => self.registry.char_type(),
            TokenKind::TypeVoid => self.registry.void(),
            TokenKind::TypeBool => self.registry.bool(),
            _ => return None,
        })
    }

    /// A primitive-type keyword, optionally `[ (expr)? ]` forming an array
    /// type. The size is a full re-entrant expression.
    pub(crate) fn parse_type_specifier(&mut self) -> Option<Node> {
        let start = self.current.span;
        let Some(resolved) = self.primitive_for(self.current.kind) else {
            self.error_at_current("متوقع اسم نوع.");
            return None;
        };
        let name = self.current.lexeme.clone();
        self.advance();

        let mut is_array = false;
        let mut array_size = None;
        if self.match_token(TokenKind::LBracket) {
            is_array = true;
            if !self.check(TokenKind::RBracket) {
                array_size = Some(Box::new(self.parse_expression()?));
            }
            self.consume(TokenKind::RBracket, "متوقع ']' بعد حجم المصفوفة.");
        }

        Some(Node::new(
            NodeKind::TypeSpec {
                name,
                resolved,
                is_array,
                array_size,
            },
            self.span_from(start),
        ))
    }
}
