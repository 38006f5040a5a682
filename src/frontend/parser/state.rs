//! Parser state and token stream management

use super::super::lexer::tokens::*;
use super::ParseError;
use crate::util::span::Span;

/// Binding power levels for the Pratt parser
pub const BP_LOWEST: u8 = 0;
pub const BP_OR: u8 = 10;
pub const BP_AND: u8 = 20;
pub const BP_NOT: u8 = 30;
pub const BP_CMP: u8 = 40;
pub const BP_ADD: u8 = 60;
pub const BP_MUL: u8 = 70;
pub const BP_UNARY: u8 = 80;
pub const BP_POW: u8 = 90;
pub const BP_POSTFIX: u8 = 100;

/// Deepest expression or block nesting the parser accepts
pub const MAX_NESTING: usize = 200;

/// Parser state for tracking position and statement context
#[derive(Debug)]
pub struct ParserState<'a> {
    /// Token stream, always terminated by `Eof`
    tokens: &'a [Token],
    /// Current position in token stream
    pos: usize,
    /// Nesting depth of `def` bodies
    pub(super) function_depth: usize,
    /// Nesting depth of loops in the innermost function
    pub(super) loop_depth: usize,
    /// Current expression and block nesting, bounded by `MAX_NESTING`
    nesting: usize,
}

impl<'a> ParserState<'a> {
    /// Create a new parser state
    #[inline]
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            function_depth: 0,
            loop_depth: 0,
            nesting: 0,
        }
    }

    /// Current token; the trailing `Eof` is returned once the stream is exhausted
    #[inline]
    pub fn current(&self) -> &Token {
        static EOF: Token = Token {
            kind: TokenKind::Eof,
            span: Span {
                start: crate::util::span::Position {
                    line: 0,
                    column: 0,
                    offset: 0,
                },
                end: crate::util::span::Position {
                    line: 0,
                    column: 0,
                    offset: 0,
                },
            },
        };
        self.tokens
            .get(self.pos)
            .or_else(|| self.tokens.last())
            .unwrap_or(&EOF)
    }

    /// Current token kind
    #[inline]
    pub fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    /// Check the current token kind
    #[inline]
    pub fn at(
        &self,
        kind: &TokenKind,
    ) -> bool {
        self.kind() == kind
    }

    /// Check if at end of token stream
    #[inline]
    pub fn at_end(&self) -> bool {
        self.at(&TokenKind::Eof)
    }

    /// True when only layout tokens remain before `Eof`
    pub fn at_trailing_layout(&self) -> bool {
        self.tokens[self.pos.min(self.tokens.len())..]
            .iter()
            .all(|t| matches!(t.kind, TokenKind::Newline | TokenKind::Dedent | TokenKind::Eof))
    }

    /// Peek at the token after the current one
    #[inline]
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos + 1)
    }

    /// Span of the current token
    #[inline]
    pub fn span(&self) -> Span {
        self.current().span
    }

    /// Span of the most recently consumed token
    #[inline]
    pub fn prev_span(&self) -> Span {
        self.pos
            .checked_sub(1)
            .and_then(|i| self.tokens.get(i))
            .map(|t| t.span)
            .unwrap_or_else(|| self.span())
    }

    /// Span from `start` to the end of the last consumed token
    #[inline]
    pub fn span_from(
        &self,
        start: Span,
    ) -> Span {
        Span::new(start.start, self.prev_span().end)
    }

    /// Advance to next token, returning the consumed one
    #[inline]
    pub fn bump(&mut self) -> Token {
        let token = self.current().clone();
        if !self.at_end() {
            self.pos += 1;
        }
        token
    }

    /// Skip a specific token
    #[inline]
    pub fn skip(
        &mut self,
        kind: &TokenKind,
    ) -> bool {
        if self.at(kind) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Expect a specific token
    pub fn expect(
        &mut self,
        kind: TokenKind,
    ) -> Result<Span, ParseError> {
        if self.at(&kind) {
            Ok(self.bump().span)
        } else {
            Err(self.unexpected(kind.to_string()))
        }
    }

    /// Expect an identifier and return its text
    pub fn expect_identifier(
        &mut self,
        what: &str,
    ) -> Result<String, ParseError> {
        match self.kind() {
            TokenKind::Identifier(name) => {
                let name = name.clone();
                self.bump();
                Ok(name)
            }
            _ => Err(self.unexpected(what.to_string())),
        }
    }

    /// Run `parse` one nesting level deeper
    pub(super) fn nested<T>(
        &mut self,
        what: &'static str,
        parse: impl FnOnce(&mut Self) -> Result<T, ParseError>,
    ) -> Result<T, ParseError> {
        if self.nesting >= MAX_NESTING {
            return Err(ParseError::TooDeep {
                what,
                span: self.span(),
            });
        }
        self.nesting += 1;
        let result = parse(self);
        self.nesting -= 1;
        result
    }

    /// Build an "expected X" error at the current token
    pub fn unexpected(
        &self,
        expected: String,
    ) -> ParseError {
        ParseError::Expected {
            expected,
            found: self.kind().clone(),
            span: self.span(),
        }
    }

    /// Check if current token can start an expression
    #[inline]
    pub fn can_start_expr(&self) -> bool {
        matches!(
            self.kind(),
            TokenKind::IntLiteral(_)
                | TokenKind::FloatLiteral(_)
                | TokenKind::StringLiteral(_)
                | TokenKind::Identifier(_)
                | TokenKind::KwNone
                | TokenKind::KwTrue
                | TokenKind::KwFalse
                | TokenKind::KwNot
                | TokenKind::Minus
                | TokenKind::Plus
                | TokenKind::LParen
                | TokenKind::LBracket
        )
    }
}
