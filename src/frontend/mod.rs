//! Frontend: normalization, lexing, parsing
//!
//! `compile` turns submitted snippet text into a [`CompiledUnit`], or a
//! [`CompileError`] carrying enough position data to render a diagnostic
//! pointing at the offending line.

pub mod lexer;
pub mod normalize;
pub mod parser;

use std::fmt::Write as _;

use crate::util::span::{line_text, Position};
use lexer::LexError;
use parser::ast::Stmt;
use parser::ParseError;

pub use normalize::normalize;

/// Name used for snippet source in diagnostics and tracebacks
pub const SNIPPET_NAME: &str = "<snippet>";

/// Result of compiling normalized snippet text
#[derive(Debug, Clone)]
pub struct CompiledUnit {
    body: Vec<Stmt>,
    source: String,
}

impl CompiledUnit {
    /// Top-level statements
    pub fn body(&self) -> &[Stmt] {
        &self.body
    }

    /// The source the unit was compiled from
    pub fn source(&self) -> &str {
        &self.source
    }

    /// True when the snippet held no executable statement
    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

/// Compile error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    #[error(transparent)]
    Lex(#[from] LexError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl CompileError {
    /// Where the error was detected
    pub fn position(&self) -> Position {
        match self {
            CompileError::Lex(e) => e.position(),
            CompileError::Parse(e) => e.span().start,
        }
    }

    /// True when appending more lines could make the source valid
    pub fn is_incomplete(&self) -> bool {
        match self {
            CompileError::Lex(e) => e.is_incomplete(),
            CompileError::Parse(e) => e.is_incomplete(),
        }
    }

    /// Guest-facing error class name
    pub fn class_name(&self) -> &'static str {
        let indentation = match self {
            CompileError::Lex(e) => e.is_indentation(),
            CompileError::Parse(e) => e.is_indentation(),
        };
        if indentation {
            "IndentationError"
        } else {
            "SyntaxError"
        }
    }

    /// Render a traceback-style diagnostic against the compiled source
    pub fn render(
        &self,
        source: &str,
    ) -> String {
        let pos = self.position();
        let mut out = String::new();
        let line = pos.line.max(1);
        let _ = writeln!(out, "  File \"{}\", line {}", SNIPPET_NAME, line);
        if let Some(text) = line_text(source, line) {
            let trimmed = text.trim_start();
            let indent = text.len() - trimmed.len();
            let _ = writeln!(out, "    {}", trimmed);
            let caret = pos.column.saturating_sub(1).saturating_sub(indent);
            let _ = writeln!(out, "    {}^", " ".repeat(caret));
        }
        let _ = write!(out, "{}: {}", self.class_name(), self);
        out
    }
}

/// Compile normalized snippet text
pub fn compile(source: &str) -> Result<CompiledUnit, CompileError> {
    let tokens = lexer::tokenize(source)?;
    let body = parser::parse(&tokens)?;
    tracing::trace!("compiled {} tokens into {} statements", tokens.len(), body.len());
    Ok(CompiledUnit {
        body,
        source: source.to_string(),
    })
}
