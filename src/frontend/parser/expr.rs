//! Expression parsing (Pratt parser)

use super::ast::*;
use super::state::*;
use super::super::lexer::tokens::*;
use super::ParseError;

/// What an infix token does once it is found after a complete operand
enum Infix {
    Binary(BinOp),
    Bool(BoolOp),
    Compare,
    Call,
    Attribute,
    Index,
}

impl<'a> ParserState<'a> {
    /// Parse a full expression
    pub fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.parse_expression(BP_LOWEST)
    }

    /// Parse expression with minimum binding power
    pub fn parse_expression(
        &mut self,
        min_bp: u8,
    ) -> Result<Expr, ParseError> {
        self.nested("expressions", |state| state.parse_expression_from(min_bp))
    }

    fn parse_expression_from(
        &mut self,
        min_bp: u8,
    ) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_prefix()?;

        while let Some((lbp, infix)) = self.infix_info() {
            if lbp <= min_bp {
                break;
            }
            lhs = match infix {
                Infix::Binary(op) => {
                    self.bump();
                    // `**` is right-associative
                    let rbp = if op == BinOp::Pow { lbp - 1 } else { lbp };
                    let right = self.parse_expression(rbp)?;
                    let span = self.span_from(lhs.span());
                    Expr::BinOp {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(right),
                        span,
                    }
                }
                Infix::Bool(op) => {
                    self.bump();
                    let right = self.parse_expression(lbp)?;
                    let span = self.span_from(lhs.span());
                    Expr::BoolOp {
                        op,
                        left: Box::new(lhs),
                        right: Box::new(right),
                        span,
                    }
                }
                Infix::Compare => self.parse_comparison(lhs)?,
                Infix::Call => self.parse_call(lhs)?,
                Infix::Attribute => {
                    self.bump();
                    let name = self.expect_identifier("attribute name")?;
                    let span = self.span_from(lhs.span());
                    Expr::Attribute {
                        value: Box::new(lhs),
                        name,
                        span,
                    }
                }
                Infix::Index => {
                    self.bump();
                    let index = self.parse_expr()?;
                    self.expect(TokenKind::RBracket)?;
                    let span = self.span_from(lhs.span());
                    Expr::Index {
                        value: Box::new(lhs),
                        index: Box::new(index),
                        span,
                    }
                }
            };
        }

        Ok(lhs)
    }

    fn infix_info(&self) -> Option<(u8, Infix)> {
        let info = match self.kind() {
            TokenKind::KwOr => (BP_OR, Infix::Bool(BoolOp::Or)),
            TokenKind::KwAnd => (BP_AND, Infix::Bool(BoolOp::And)),
            TokenKind::EqEq
            | TokenKind::Neq
            | TokenKind::Lt
            | TokenKind::Le
            | TokenKind::Gt
            | TokenKind::Ge
            | TokenKind::KwIn
            | TokenKind::KwIs => (BP_CMP, Infix::Compare),
            TokenKind::KwNot if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::KwIn)) => {
                (BP_CMP, Infix::Compare)
            }
            TokenKind::Plus => (BP_ADD, Infix::Binary(BinOp::Add)),
            TokenKind::Minus => (BP_ADD, Infix::Binary(BinOp::Sub)),
            TokenKind::Star => (BP_MUL, Infix::Binary(BinOp::Mul)),
            TokenKind::Slash => (BP_MUL, Infix::Binary(BinOp::Div)),
            TokenKind::DoubleSlash => (BP_MUL, Infix::Binary(BinOp::FloorDiv)),
            TokenKind::Percent => (BP_MUL, Infix::Binary(BinOp::Mod)),
            TokenKind::DoubleStar => (BP_POW, Infix::Binary(BinOp::Pow)),
            TokenKind::LParen => (BP_POSTFIX, Infix::Call),
            TokenKind::Dot => (BP_POSTFIX, Infix::Attribute),
            TokenKind::LBracket => (BP_POSTFIX, Infix::Index),
            _ => return None,
        };
        Some(info)
    }

    /// Parse prefix expression (nud)
    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        let token = self.current().clone();
        let span = token.span;
        match token.kind {
            TokenKind::IntLiteral(v) => {
                self.bump();
                Ok(Expr::Lit(Literal::Int(v), span))
            }
            TokenKind::FloatLiteral(v) => {
                self.bump();
                Ok(Expr::Lit(Literal::Float(v), span))
            }
            TokenKind::StringLiteral(s) => {
                self.bump();
                // Adjacent string literals concatenate.
                let mut text = s;
                while let TokenKind::StringLiteral(next) = self.kind() {
                    text.push_str(next);
                    self.bump();
                }
                Ok(Expr::Lit(Literal::Str(text), self.span_from(span)))
            }
            TokenKind::KwNone => {
                self.bump();
                Ok(Expr::Lit(Literal::None, span))
            }
            TokenKind::KwTrue => {
                self.bump();
                Ok(Expr::Lit(Literal::Bool(true), span))
            }
            TokenKind::KwFalse => {
                self.bump();
                Ok(Expr::Lit(Literal::Bool(false), span))
            }
            TokenKind::Identifier(name) => {
                self.bump();
                Ok(Expr::Name(name, span))
            }
            kind @ (TokenKind::Minus | TokenKind::Plus) => {
                self.bump();
                let expr = self.parse_expression(BP_UNARY)?;
                let op = if kind == TokenKind::Minus {
                    UnOp::Neg
                } else {
                    UnOp::Pos
                };
                Ok(Expr::UnOp {
                    op,
                    expr: Box::new(expr),
                    span: self.span_from(span),
                })
            }
            TokenKind::KwNot => {
                self.bump();
                let expr = self.parse_expression(BP_NOT)?;
                Ok(Expr::UnOp {
                    op: UnOp::Not,
                    expr: Box::new(expr),
                    span: self.span_from(span),
                })
            }
            TokenKind::LParen => {
                self.bump();
                let inner = self.parse_expr()?;
                self.expect(TokenKind::RParen)?;
                Ok(inner)
            }
            TokenKind::LBracket => {
                self.bump();
                let mut items = Vec::new();
                while !self.at(&TokenKind::RBracket) {
                    items.push(self.parse_expr()?);
                    if !self.skip(&TokenKind::Comma) {
                        break;
                    }
                }
                self.expect(TokenKind::RBracket)?;
                Ok(Expr::List(items, self.span_from(span)))
            }
            _ => Err(self.unexpected("an expression".to_string())),
        }
    }

    fn comparison_op(&mut self) -> Option<CmpOp> {
        let op = match self.kind() {
            TokenKind::EqEq => CmpOp::Eq,
            TokenKind::Neq => CmpOp::Ne,
            TokenKind::Lt => CmpOp::Lt,
            TokenKind::Le => CmpOp::Le,
            TokenKind::Gt => CmpOp::Gt,
            TokenKind::Ge => CmpOp::Ge,
            TokenKind::KwIn => CmpOp::In,
            TokenKind::KwIs => {
                self.bump();
                return Some(if self.skip(&TokenKind::KwNot) {
                    CmpOp::IsNot
                } else {
                    CmpOp::Is
                });
            }
            TokenKind::KwNot if matches!(self.peek().map(|t| &t.kind), Some(TokenKind::KwIn)) => {
                self.bump();
                self.bump();
                return Some(CmpOp::NotIn);
            }
            _ => return None,
        };
        self.bump();
        Some(op)
    }

    fn parse_comparison(
        &mut self,
        left: Expr,
    ) -> Result<Expr, ParseError> {
        let start = left.span();
        let mut rest = Vec::new();
        while let Some(op) = self.comparison_op() {
            let right = self.parse_expression(BP_CMP)?;
            rest.push((op, right));
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            rest,
            span: self.span_from(start),
        })
    }

    fn parse_call(
        &mut self,
        func: Expr,
    ) -> Result<Expr, ParseError> {
        self.bump(); // consume '('
        let mut args = Vec::new();
        let mut seen_keyword = false;

        while !self.at(&TokenKind::RParen) {
            let is_keyword = matches!(self.kind(), TokenKind::Identifier(_))
                && matches!(self.peek().map(|t| &t.kind), Some(TokenKind::Assign));
            if is_keyword {
                let name = self.expect_identifier("argument name")?;
                self.bump(); // consume '='
                let value = self.parse_expr()?;
                args.push(Arg::Keyword(name, value));
                seen_keyword = true;
            } else {
                let span = self.span();
                let value = self.parse_expr()?;
                if seen_keyword {
                    return Err(ParseError::PositionalAfterKeyword { span });
                }
                args.push(Arg::Positional(value));
            }
            if !self.skip(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let span = self.span_from(func.span());
        Ok(Expr::Call {
            func: Box::new(func),
            args,
            span,
        })
    }
}
