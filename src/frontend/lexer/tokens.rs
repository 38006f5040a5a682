//! Token types

use std::fmt;

use crate::util::span::Span;

/// Token kind
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Keywords
    KwIf,
    KwElif,
    KwElse,
    KwWhile,
    KwFor,
    KwIn,
    KwIs,
    KwDef,
    KwReturn,
    KwBreak,
    KwContinue,
    KwPass,
    KwGlobal,
    KwImport,
    KwRaise,
    KwAssert,
    KwTry,
    KwExcept,
    KwFinally,
    KwAs,
    KwDel,
    KwAnd,
    KwOr,
    KwNot,
    KwNone,
    KwTrue,
    KwFalse,

    // Identifiers
    Identifier(String),

    // Literals
    IntLiteral(i64),
    FloatLiteral(f64),
    StringLiteral(String),

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    DoubleSlash,
    Percent,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    EqEq,
    Neq,
    Lt,
    Le,
    Gt,
    Ge,

    // Delimiters
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,

    // Layout
    Newline,
    Indent,
    Dedent,
    Eof,
}

impl TokenKind {
    /// Map an identifier to its keyword, if it is one
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "if" => TokenKind::KwIf,
            "elif" => TokenKind::KwElif,
            "else" => TokenKind::KwElse,
            "while" => TokenKind::KwWhile,
            "for" => TokenKind::KwFor,
            "in" => TokenKind::KwIn,
            "is" => TokenKind::KwIs,
            "def" => TokenKind::KwDef,
            "return" => TokenKind::KwReturn,
            "break" => TokenKind::KwBreak,
            "continue" => TokenKind::KwContinue,
            "pass" => TokenKind::KwPass,
            "global" => TokenKind::KwGlobal,
            "import" => TokenKind::KwImport,
            "raise" => TokenKind::KwRaise,
            "assert" => TokenKind::KwAssert,
            "try" => TokenKind::KwTry,
            "except" => TokenKind::KwExcept,
            "finally" => TokenKind::KwFinally,
            "as" => TokenKind::KwAs,
            "del" => TokenKind::KwDel,
            "and" => TokenKind::KwAnd,
            "or" => TokenKind::KwOr,
            "not" => TokenKind::KwNot,
            "None" => TokenKind::KwNone,
            "True" => TokenKind::KwTrue,
            "False" => TokenKind::KwFalse,
            _ => return None,
        };
        Some(kind)
    }
}

impl fmt::Display for TokenKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        let text = match self {
            TokenKind::Identifier(name) => return write!(f, "name '{}'", name),
            TokenKind::IntLiteral(v) => return write!(f, "number {}", v),
            TokenKind::FloatLiteral(v) => return write!(f, "number {}", v),
            TokenKind::StringLiteral(_) => "string",
            TokenKind::KwIf => "'if'",
            TokenKind::KwElif => "'elif'",
            TokenKind::KwElse => "'else'",
            TokenKind::KwWhile => "'while'",
            TokenKind::KwFor => "'for'",
            TokenKind::KwIn => "'in'",
            TokenKind::KwIs => "'is'",
            TokenKind::KwDef => "'def'",
            TokenKind::KwReturn => "'return'",
            TokenKind::KwBreak => "'break'",
            TokenKind::KwContinue => "'continue'",
            TokenKind::KwPass => "'pass'",
            TokenKind::KwGlobal => "'global'",
            TokenKind::KwImport => "'import'",
            TokenKind::KwRaise => "'raise'",
            TokenKind::KwAssert => "'assert'",
            TokenKind::KwTry => "'try'",
            TokenKind::KwExcept => "'except'",
            TokenKind::KwFinally => "'finally'",
            TokenKind::KwAs => "'as'",
            TokenKind::KwDel => "'del'",
            TokenKind::KwAnd => "'and'",
            TokenKind::KwOr => "'or'",
            TokenKind::KwNot => "'not'",
            TokenKind::KwNone => "'None'",
            TokenKind::KwTrue => "'True'",
            TokenKind::KwFalse => "'False'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Star => "'*'",
            TokenKind::DoubleStar => "'**'",
            TokenKind::Slash => "'/'",
            TokenKind::DoubleSlash => "'//'",
            TokenKind::Percent => "'%'",
            TokenKind::Assign => "'='",
            TokenKind::PlusAssign => "'+='",
            TokenKind::MinusAssign => "'-='",
            TokenKind::StarAssign => "'*='",
            TokenKind::SlashAssign => "'/='",
            TokenKind::PercentAssign => "'%='",
            TokenKind::EqEq => "'=='",
            TokenKind::Neq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::Semicolon => "';'",
            TokenKind::Dot => "'.'",
            TokenKind::Newline => "end of line",
            TokenKind::Indent => "indent",
            TokenKind::Dedent => "dedent",
            TokenKind::Eof => "end of input",
        };
        f.write_str(text)
    }
}

/// Token
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

impl Token {
    pub fn new(
        kind: TokenKind,
        span: Span,
    ) -> Self {
        Self { kind, span }
    }
}

impl From<TokenKind> for Token {
    fn from(kind: TokenKind) -> Self {
        Token {
            kind,
            span: Span::dummy(),
        }
    }
}
