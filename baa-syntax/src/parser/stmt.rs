//! Statement parsing. The statement terminator is `.`, not `;`.

use baa_lexer::TokenKind;

use crate::{
    ast::{Node, NodeKind},
    parser::Parser,
};

impl Parser<'_> {
    pub(crate) fn parse_statement(&mut self) -> Option<Node> {
        match self.current.kind {
            TokenKind::LBrace => self.parse_block(),
            TokenKind::If => self.parse_if(),
            TokenKind::While => self.parse_while(),
            TokenKind::For => self.parse_for(),
            TokenKind::Return => self.parse_return(),
            TokenKind::Break => self.parse_jump(NodeKind::Break, "متوقع '.' بعد 'توقف'."),
            TokenKind::Continue => self.parse_jump(NodeKind::Continue, "متوقع '.' بعد 'أكمل'."),
            kind if kind.is_modifier_keyword() || kind.is_type_keyword() => {
                // Local declarations; function definitions live at the top
                // level only.
                self.parse_typed_declaration(false)
            }
            TokenKind::Switch | TokenKind::Do | TokenKind::Case => {
                let message = format!("التركيب '{}' غير مدعوم بعد.", self.current.lexeme);
                self.error_at_current(message);
                None
            }
            _ => self.parse_expression_statement(),
        }
    }

    pub(crate) fn parse_block(&mut self) -> Option<Node> {
        let start = self.current.span;
        self.advance(); // {
        let mut statements = vec![];
        while !self.check(TokenKind::RBrace) && !self.check(TokenKind::Eof) {
            let position_before = self.current.span;
            match self.parse_statement() {
                Some(statement) => statements.push(statement),
                None => {
                    if self.panic_mode {
                        self.synchronize();
                    }
                    if self.current.span == position_before
                        && !self.check(TokenKind::RBrace)
                        && !self.check(TokenKind::Eof)
                    {
                        self.advance();
                    }
                }
            }
        }
        self.consume(TokenKind::RBrace, "متوقع '}' لإغلاق الكتلة.");
        Some(Node::new(
            NodeKind::Block { statements },
            self.span_from(start),
        ))
    }

    fn parse_if(&mut self) -> Option<Node> {
        let start = self.current.span;
        self.advance(); // إذا
        self.consume(TokenKind::LParen, "متوقع '(' بعد 'إذا'.");
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen, "متوقع ')' بعد شرط 'إذا'.");
        let then_branch = self.parse_statement()?;
        let else_branch = if self.match_token(TokenKind::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Some(Node::new(
            NodeKind::If {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch,
            },
            self.span_from(start),
        ))
    }

    fn parse_while(&mut self) -> Option<Node> {
        let start = self.current.span;
        self.advance(); // طالما
        self.consume(TokenKind::LParen, "متوقع '(' بعد 'طالما'.");
        let condition = self.parse_expression()?;
        self.consume(TokenKind::RParen, "متوقع ')' بعد شرط 'طالما'.");
        let body = self.parse_statement()?;
        Some(Node::new(
            NodeKind::While {
                condition: Box::new(condition),
                body: Box::new(body),
            },
            self.span_from(start),
        ))
    }

    /// `لكل ( [تهيئة] . [شرط] . [زيادة] ) جملة`
    fn parse_for(&mut self) -> Option<Node> {
        let start = self.current.span;
        self.advance(); // لكل
        self.consume(TokenKind::LParen, "متوقع '(' بعد 'لكل'.");

        let initializer = if self.match_token(TokenKind::Dot) {
            None
        } else if self.current.kind.is_modifier_keyword() || self.current.kind.is_type_keyword() {
            // The declaration consumes its own terminator.
            Some(Box::new(self.parse_typed_declaration(false)?))
        } else {
            let expr = self.parse_expression_statement()?;
            Some(Box::new(expr))
        };

        let condition = if self.match_token(TokenKind::Dot) {
            None
        } else {
            let expr = self.parse_expression()?;
            self.consume(TokenKind::Dot, "متوقع '.' بعد شرط 'لكل'.");
            Some(Box::new(expr))
        };

        let increment = if self.check(TokenKind::RParen) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.consume(TokenKind::RParen, "متوقع ')' بعد ترويسة 'لكل'.");

        let body = self.parse_statement()?;
        Some(Node::new(
            NodeKind::For {
                initializer,
                condition,
                increment,
                body: Box::new(body),
            },
            self.span_from(start),
        ))
    }

    fn parse_return(&mut self) -> Option<Node> {
        let start = self.current.span;
        self.advance(); // إرجع
        let value = if self.check(TokenKind::Dot) {
            None
        } else {
            Some(Box::new(self.parse_expression()?))
        };
        self.consume(TokenKind::Dot, "متوقع '.' بعد جملة الإرجاع.");
        Some(Node::new(
            NodeKind::Return { value },
            self.span_from(start),
        ))
    }

    fn parse_jump(&mut self, kind: NodeKind, terminator_message: &str) -> Option<Node> {
        let start = self.current.span;
        self.advance();
        self.consume(TokenKind::Dot, terminator_message);
        Some(Node::new(kind, self.span_from(start)))
    }

    pub(crate) fn parse_expression_statement(&mut self) -> Option<Node> {
        let start = self.current.span;
        let expr = self.parse_expression()?;
        self.consume(TokenKind::Dot, "متوقع '.' في نهاية جملة التعبير.");
        Some(Node::new(
            NodeKind::ExprStmt {
                expr: Box::new(expr),
            },
            self.span_from(start),
        ))
    }
}
