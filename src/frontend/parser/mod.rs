//! Parser module
//!
//! A Pratt parser for expressions plus a recursive-descent statement parser
//! driven by the lexer's `Newline`/`Indent`/`Dedent` layout tokens.

pub mod ast;
mod expr;
mod state;
mod stmt;

pub use state::{ParserState, BP_LOWEST, MAX_NESTING};

use crate::frontend::lexer::tokens::*;
use crate::util::span::Span;
use ast::*;

/// Parse error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("invalid syntax: expected {expected}, found {found}")]
    Expected {
        expected: String,
        found: TokenKind,
        span: Span,
    },
    #[error("expected an indented block")]
    ExpectedIndent { span: Span, at_eof: bool },
    #[error("unexpected indent")]
    UnexpectedIndent { span: Span },
    #[error("cannot assign to {what}")]
    InvalidTarget { what: &'static str, span: Span },
    #[error("'{keyword}' outside {context}")]
    Misplaced {
        keyword: &'static str,
        context: &'static str,
        span: Span,
    },
    #[error("positional argument follows keyword argument")]
    PositionalAfterKeyword { span: Span },
    #[error("non-default argument follows default argument")]
    DefaultOrder { span: Span },
    #[error("duplicate argument '{name}' in function definition")]
    DuplicateParam { name: String, span: Span },
    #[error("too many nested {what}")]
    TooDeep { what: &'static str, span: Span },
}

impl ParseError {
    /// Location of the offending token
    pub fn span(&self) -> Span {
        match self {
            ParseError::Expected { span, .. }
            | ParseError::ExpectedIndent { span, .. }
            | ParseError::UnexpectedIndent { span }
            | ParseError::InvalidTarget { span, .. }
            | ParseError::Misplaced { span, .. }
            | ParseError::PositionalAfterKeyword { span }
            | ParseError::DefaultOrder { span }
            | ParseError::DuplicateParam { span, .. }
            | ParseError::TooDeep { span, .. } => *span,
        }
    }

    /// True when more input could complete the program
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            ParseError::ExpectedIndent { at_eof: true, .. }
                | ParseError::Expected {
                    found: TokenKind::Eof,
                    ..
                }
        )
    }

    /// True for indentation errors
    pub fn is_indentation(&self) -> bool {
        matches!(
            self,
            ParseError::ExpectedIndent { .. } | ParseError::UnexpectedIndent { .. }
        )
    }
}

/// Parse tokens into a statement list
pub fn parse(tokens: &[Token]) -> Result<Vec<Stmt>, ParseError> {
    let mut state = ParserState::new(tokens);
    let mut body = Vec::new();

    while !state.at_end() {
        if state.skip(&TokenKind::Newline) {
            continue;
        }
        body.extend(state.parse_statement()?);
    }

    Ok(body)
}
