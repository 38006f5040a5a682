//! Statement parsing

use std::sync::Arc;

use super::ast::*;
use super::super::lexer::tokens::*;
use super::state::ParserState;
use super::ParseError;

impl<'a> ParserState<'a> {
    /// Parse one logical line or compound statement.
    ///
    /// Simple statements separated by `;` on one line come back together.
    pub fn parse_statement(&mut self) -> Result<Vec<Stmt>, ParseError> {
        match self.kind() {
            TokenKind::KwIf => Ok(vec![self.parse_if()?]),
            TokenKind::KwWhile => Ok(vec![self.parse_while()?]),
            TokenKind::KwFor => Ok(vec![self.parse_for()?]),
            TokenKind::KwDef => Ok(vec![self.parse_def()?]),
            TokenKind::KwTry => Ok(vec![self.parse_try()?]),
            TokenKind::Indent => Err(ParseError::UnexpectedIndent { span: self.span() }),
            _ => self.parse_simple_line(),
        }
    }

    fn parse_simple_line(&mut self) -> Result<Vec<Stmt>, ParseError> {
        let mut stmts = vec![self.parse_simple()?];
        while self.skip(&TokenKind::Semicolon) {
            if self.at(&TokenKind::Newline) {
                break;
            }
            stmts.push(self.parse_simple()?);
        }
        self.expect_line_end()?;
        Ok(stmts)
    }

    fn expect_line_end(&mut self) -> Result<(), ParseError> {
        if self.skip(&TokenKind::Newline) || self.at_end() {
            Ok(())
        } else {
            Err(self.unexpected("end of line".to_string()))
        }
    }

    fn parse_simple(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        let kind = match self.kind() {
            TokenKind::KwPass => {
                self.bump();
                StmtKind::Pass
            }
            TokenKind::KwBreak | TokenKind::KwContinue => {
                let is_break = self.at(&TokenKind::KwBreak);
                self.bump();
                if self.loop_depth == 0 {
                    return Err(ParseError::Misplaced {
                        keyword: if is_break { "break" } else { "continue" },
                        context: "loop",
                        span: start,
                    });
                }
                if is_break {
                    StmtKind::Break
                } else {
                    StmtKind::Continue
                }
            }
            TokenKind::KwReturn => {
                self.bump();
                if self.function_depth == 0 {
                    return Err(ParseError::Misplaced {
                        keyword: "return",
                        context: "function",
                        span: start,
                    });
                }
                let value = if self.can_start_expr() {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                StmtKind::Return(value)
            }
            TokenKind::KwGlobal => {
                self.bump();
                StmtKind::Global(self.parse_name_list()?)
            }
            TokenKind::KwImport => {
                self.bump();
                StmtKind::Import(self.parse_name_list()?)
            }
            TokenKind::KwDel => {
                self.bump();
                StmtKind::Del(self.parse_name_list()?)
            }
            TokenKind::KwRaise => {
                self.bump();
                let value = if self.can_start_expr() {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                StmtKind::Raise(value)
            }
            TokenKind::KwAssert => {
                self.bump();
                let test = self.parse_expr()?;
                let message = if self.skip(&TokenKind::Comma) {
                    Some(self.parse_expr()?)
                } else {
                    None
                };
                StmtKind::Assert { test, message }
            }
            _ => self.parse_expr_statement()?,
        };
        Ok(Stmt::new(kind, self.span_from(start)))
    }

    fn parse_name_list(&mut self) -> Result<Vec<String>, ParseError> {
        let mut names = vec![self.expect_identifier("a name")?];
        while self.skip(&TokenKind::Comma) {
            names.push(self.expect_identifier("a name")?);
        }
        Ok(names)
    }

    fn parse_expr_statement(&mut self) -> Result<StmtKind, ParseError> {
        let first = self.parse_expr()?;

        let aug = match self.kind() {
            TokenKind::PlusAssign => Some(BinOp::Add),
            TokenKind::MinusAssign => Some(BinOp::Sub),
            TokenKind::StarAssign => Some(BinOp::Mul),
            TokenKind::SlashAssign => Some(BinOp::Div),
            TokenKind::PercentAssign => Some(BinOp::Mod),
            _ => None,
        };
        if let Some(op) = aug {
            self.bump();
            let target = to_target(first)?;
            let value = self.parse_expr()?;
            return Ok(StmtKind::AugAssign { target, op, value });
        }

        if !self.at(&TokenKind::Assign) {
            return Ok(StmtKind::Expr(first));
        }

        // a = b = value
        let mut exprs = vec![first];
        while self.skip(&TokenKind::Assign) {
            exprs.push(self.parse_expr()?);
        }
        let value = exprs.pop().ok_or_else(|| self.unexpected("an expression".to_string()))?;
        let targets = exprs
            .into_iter()
            .map(to_target)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(StmtKind::Assign { targets, value })
    }

    /// Parse the body following a `:`
    fn parse_block(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.expect(TokenKind::Colon)?;

        if !self.skip(&TokenKind::Newline) {
            // Single-line body: `if x: y = 1`
            return self.parse_simple_line();
        }

        if !self.at(&TokenKind::Indent) {
            return Err(ParseError::ExpectedIndent {
                span: self.span(),
                at_eof: self.at_trailing_layout(),
            });
        }
        self.bump();

        self.nested("blocks", |state| {
            let mut body = Vec::new();
            while !state.at(&TokenKind::Dedent) && !state.at_end() {
                body.extend(state.parse_statement()?);
            }
            state.skip(&TokenKind::Dedent);
            Ok(body)
        })
    }

    fn parse_loop_body(&mut self) -> Result<Vec<Stmt>, ParseError> {
        self.loop_depth += 1;
        let body = self.parse_block();
        self.loop_depth -= 1;
        body
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        self.bump(); // 'if'
        let mut branches = Vec::new();
        let condition = self.parse_expr()?;
        let body = self.parse_block()?;
        branches.push((condition, body));

        let mut orelse = Vec::new();
        loop {
            if self.skip(&TokenKind::KwElif) {
                let condition = self.parse_expr()?;
                let body = self.parse_block()?;
                branches.push((condition, body));
            } else if self.skip(&TokenKind::KwElse) {
                orelse = self.parse_block()?;
                break;
            } else {
                break;
            }
        }

        Ok(Stmt::new(
            StmtKind::If { branches, orelse },
            self.span_from(start),
        ))
    }

    fn parse_while(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        self.bump(); // 'while'
        let condition = self.parse_expr()?;
        let body = self.parse_loop_body()?;
        Ok(Stmt::new(
            StmtKind::While { condition, body },
            self.span_from(start),
        ))
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        self.bump(); // 'for'
        let var = self.expect_identifier("a loop variable")?;
        self.expect(TokenKind::KwIn)?;
        let iterable = self.parse_expr()?;
        let body = self.parse_loop_body()?;
        Ok(Stmt::new(
            StmtKind::For {
                var,
                iterable,
                body,
            },
            self.span_from(start),
        ))
    }

    fn parse_def(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        self.bump(); // 'def'
        let name = self.expect_identifier("a function name")?;
        self.expect(TokenKind::LParen)?;

        let mut params: Vec<Param> = Vec::new();
        while !self.at(&TokenKind::RParen) {
            let span = self.span();
            let pname = self.expect_identifier("a parameter name")?;
            let default = if self.skip(&TokenKind::Assign) {
                Some(self.parse_expr()?)
            } else {
                None
            };
            if default.is_none() && params.iter().any(|p| p.default.is_some()) {
                return Err(ParseError::DefaultOrder { span });
            }
            if params.iter().any(|p| p.name == pname) {
                return Err(ParseError::DuplicateParam { name: pname, span });
            }
            params.push(Param {
                name: pname,
                default,
            });
            if !self.skip(&TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen)?;

        let saved_loops = std::mem::replace(&mut self.loop_depth, 0);
        self.function_depth += 1;
        let body = self.parse_block();
        self.function_depth -= 1;
        self.loop_depth = saved_loops;
        let body = body?;

        let span = self.span_from(start);
        Ok(Stmt::new(
            StmtKind::Def(Arc::new(FunctionDef {
                name,
                params,
                body,
                span,
            })),
            span,
        ))
    }

    fn parse_try(&mut self) -> Result<Stmt, ParseError> {
        let start = self.span();
        self.bump(); // 'try'
        let body = self.parse_block()?;

        let mut handlers = Vec::new();
        while self.at(&TokenKind::KwExcept) {
            let span = self.span();
            self.bump();
            let (kind, binding) = if self.at(&TokenKind::Colon) {
                (None, None)
            } else {
                let kind = self.parse_expr()?;
                let binding = if self.skip(&TokenKind::KwAs) {
                    Some(self.expect_identifier("a name")?)
                } else {
                    None
                };
                (Some(kind), binding)
            };
            let body = self.parse_block()?;
            handlers.push(Handler {
                kind,
                binding,
                body,
                span,
            });
        }

        let orelse = if !handlers.is_empty() && self.skip(&TokenKind::KwElse) {
            self.parse_block()?
        } else {
            Vec::new()
        };
        let finally = if self.skip(&TokenKind::KwFinally) {
            Some(self.parse_block()?)
        } else {
            None
        };

        if handlers.is_empty() && finally.is_none() {
            return Err(self.unexpected("'except' or 'finally'".to_string()));
        }

        Ok(Stmt::new(
            StmtKind::Try {
                body,
                handlers,
                orelse,
                finally: finally.unwrap_or_default(),
            },
            self.span_from(start),
        ))
    }
}

fn to_target(expr: Expr) -> Result<Target, ParseError> {
    match expr {
        Expr::Name(name, _) => Ok(Target::Name(name)),
        Expr::Index { value, index, .. } => Ok(Target::Index {
            value: *value,
            index: *index,
        }),
        Expr::Call { span, .. } => Err(ParseError::InvalidTarget {
            what: "function call",
            span,
        }),
        Expr::Lit(_, span) => Err(ParseError::InvalidTarget {
            what: "literal",
            span,
        }),
        Expr::Attribute { span, .. } => Err(ParseError::InvalidTarget {
            what: "attribute",
            span,
        }),
        other => Err(ParseError::InvalidTarget {
            what: "expression",
            span: other.span(),
        }),
    }
}
