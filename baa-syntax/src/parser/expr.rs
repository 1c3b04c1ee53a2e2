//! Expression parsing by precedence climbing.

use baa_lexer::TokenKind;

use crate::{
    ast::{BinaryOp, LiteralValue, Node, NodeKind, UnaryOp},
    parser::Parser,
};

/// The binary operator table, tightest binding first. All levels are
/// left-associative.
fn binary_operator(kind: TokenKind) -> Option<(u8, BinaryOp)> {
    Some(match kind {
        TokenKind::Star => (60, BinaryOp::Mul),
        TokenKind::Slash => (60, BinaryOp::Div),
        TokenKind::Percent => (60, BinaryOp::Rem),
        TokenKind::Plus => (50, BinaryOp::Add),
        TokenKind::Minus => (50, BinaryOp::Sub),
        TokenKind::Less => (40, BinaryOp::Less),
        TokenKind::LessEqual => (40, BinaryOp::LessEqual),
        TokenKind::Greater => (40, BinaryOp::Greater),
        TokenKind::GreaterEqual => (40, BinaryOp::GreaterEqual),
        TokenKind::EqualEqual => (30, BinaryOp::Equal),
        TokenKind::BangEqual => (30, BinaryOp::NotEqual),
        TokenKind::AndAnd => (20, BinaryOp::And),
        TokenKind::OrOr => (10, BinaryOp::Or),
        _ => return None,
    })
}

impl Parser<'_> {
    pub(crate) fn parse_expression(&mut self) -> Option<Node> {
        self.parse_precedence(0)
    }

    fn parse_precedence(&mut self, min_precedence: u8) -> Option<Node> {
        let mut left = self.parse_unary()?;
        while let Some((precedence, op)) = binary_operator(self.current.kind) {
            if precedence < min_precedence {
                break;
            }
            self.advance();
            // Left associativity: the right operand climbs one level higher.
            let right = self.parse_precedence(precedence + 1)?;
            let span = left.span.join(&right.span);
            left = Node::new(
                NodeKind::Binary {
                    op,
                    left: Box::new(left),
                    right: Box::new(right),
                },
                span,
            );
        }
        Some(left)
    }

    fn parse_unary(&mut self) -> Option<Node> {
        let op = match self.current.kind {
            TokenKind::Plus => UnaryOp::Plus,
            TokenKind::Minus => UnaryOp::Minus,
            TokenKind::Bang => UnaryOp::Not,
            _ => {
                let primary = self.parse_primary()?;
                return self.parse_postfix(primary);
            }
        };
        let start = self.current.span;
        self.advance();
        let operand = self.parse_unary()?;
        let span = start.join(&operand.span);
        Some(Node::new(
            NodeKind::Unary {
                op,
                operand: Box::new(operand),
            },
            span,
        ))
    }

    /// The postfix loop: calls now, indexing and member access reserved.
    fn parse_postfix(&mut self, mut expr: Node) -> Option<Node> {
        while self.check(TokenKind::LParen) {
            self.advance();
            let mut arguments = vec![];
            if !self.check(TokenKind::RParen) {
                loop {
                    arguments.push(self.parse_expression()?);
                    if !self.match_token(TokenKind::Comma) {
                        break;
                    }
                }
            }
            self.consume(TokenKind::RParen, "متوقع ')' بعد وسائط الاستدعاء.");
            let span = self.span_from(expr.span);
            expr = Node::new(
                NodeKind::Call {
                    callee: Box::new(expr),
                    arguments,
                },
                span,
            );
        }
        Some(expr)
    }

    fn parse_primary(&mut self) -> Option<Node> {
        let span = self.current.span;
        let kind = self.current.kind;
        match kind {
            TokenKind::IntLit => {
                let lexeme = self.current.lexeme.clone();
                self.advance();
                Some(Node::new(
                    NodeKind::Literal {
                        value: LiteralValue::Int(lexeme),
                        type_id: self.registry.int(),
                    },
                    span,
                ))
            }
            TokenKind::FloatLit => {
                let lexeme = self.current.lexeme.clone();
                self.advance();
                Some(Node::new(
                    NodeKind::Literal {
                        value: LiteralValue::Float(lexeme),
                        type_id: self.registry.float(),
                    },
                    span,
                ))
            }
            TokenKind::StringLit => {
                let lexeme = self.current.lexeme.clone();
                self.advance();
                Some(Node::new(
                    NodeKind::Literal {
                        value: LiteralValue::String(lexeme),
                        type_id: self.registry.string(),
                    },
                    span,
                ))
            }
            TokenKind::CharLit => {
                let value = self.current.lexeme.chars().next().unwrap_or('\0');
                self.advance();
                Some(Node::new(
                    NodeKind::Literal {
                        value: LiteralValue::Char(value),
                        type_id: self.registry.char_type(),
                    },
                    span,
                ))
            }
            TokenKind::BoolLit => {
                let value = self.current.lexeme == "صحيح";
                self.advance();
                Some(Node::new(
                    NodeKind::Literal {
                        value: LiteralValue::Bool(value),
                        type_id: self.registry.bool(),
                    },
                    span,
                ))
            }
            TokenKind::Ident => {
                let name = self.current.lexeme.clone();
                self.advance();
                Some(Node::new(NodeKind::Identifier { name }, span))
            }
            TokenKind::LParen => {
                self.advance();
                let mut inner = self.parse_expression()?;
                self.consume(TokenKind::RParen, "متوقع ')' بعد التعبير المقوس.");
                inner.span = self.span_from(span);
                Some(inner)
            }
            _ => {
                self.error_at_current("متوقع تعبير.");
                None
            }
        }
    }
}
