//! Lexer module
//!
//! Turns normalized snippet text into a token stream. Block structure is
//! carried by indentation, so the lexer tracks an indent stack and emits
//! `Indent`/`Dedent` tokens at logical line starts. Newlines inside brackets
//! are implicit line joins and produce no token.

pub mod tokens;

use tokens::*;

use crate::util::span::Position;

pub use tokenizer::tokenize;

/// Lexer error
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LexError {
    #[error("invalid character '{ch}'")]
    UnexpectedChar { ch: char, position: Position },
    #[error("unterminated string literal")]
    UnterminatedString { position: Position, triple: bool },
    #[error("invalid number literal '{text}'")]
    InvalidNumber { text: String, position: Position },
    #[error("unindent does not match any outer indentation level")]
    InconsistentDedent { position: Position },
    #[error("'{open}' was never closed")]
    UnclosedBracket { open: char, position: Position },
    #[error("unmatched '{close}'")]
    UnmatchedBracket { close: char, position: Position },
    #[error("unexpected character after line continuation character")]
    BadContinuation { position: Position, at_eof: bool },
}

impl LexError {
    /// Where the error was detected
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedChar { position, .. }
            | LexError::UnterminatedString { position, .. }
            | LexError::InvalidNumber { position, .. }
            | LexError::InconsistentDedent { position }
            | LexError::UnclosedBracket { position, .. }
            | LexError::UnmatchedBracket { position, .. }
            | LexError::BadContinuation { position, .. } => *position,
        }
    }

    /// True when more input could turn this into valid source
    pub fn is_incomplete(&self) -> bool {
        matches!(
            self,
            LexError::UnterminatedString { triple: true, .. }
                | LexError::UnclosedBracket { .. }
                | LexError::BadContinuation { at_eof: true, .. }
        )
    }

    /// True for indentation errors
    pub fn is_indentation(&self) -> bool {
        matches!(self, LexError::InconsistentDedent { .. })
    }
}

/// Tokenize source code
mod tokenizer {
    use super::*;
    use crate::util::span::Span;
    use std::iter::Peekable;
    use std::str::Chars;

    const TAB_WIDTH: usize = 8;

    pub fn tokenize(source: &str) -> Result<Vec<Token>, LexError> {
        let mut lexer = Lexer::new(source);
        lexer.run()?;
        Ok(lexer.tokens)
    }

    struct Lexer<'a> {
        chars: Peekable<Chars<'a>>,
        offset: usize,
        line: usize,
        column: usize,
        start: Position,
        tokens: Vec<Token>,
        indents: Vec<usize>,
        brackets: Vec<(char, Position)>,
    }

    impl<'a> Lexer<'a> {
        fn new(source: &'a str) -> Self {
            Self {
                chars: source.chars().peekable(),
                offset: 0,
                line: 1,
                column: 1,
                start: Position::with_offset(1, 1, 0),
                tokens: Vec::new(),
                indents: vec![0],
                brackets: Vec::new(),
            }
        }

        fn position(&self) -> Position {
            Position::with_offset(self.line, self.column, self.offset)
        }

        fn span(&self) -> Span {
            Span::new(self.start, self.position())
        }

        fn advance(&mut self) -> Option<char> {
            match self.chars.next() {
                Some('\n') => {
                    self.offset += 1;
                    self.line += 1;
                    self.column = 1;
                    Some('\n')
                }
                Some(c) => {
                    self.offset += c.len_utf8();
                    self.column += 1;
                    Some(c)
                }
                None => None,
            }
        }

        fn peek(&mut self) -> Option<char> {
            self.chars.peek().copied()
        }

        fn peek_next(&self) -> Option<char> {
            self.chars.clone().nth(1)
        }

        fn push(
            &mut self,
            kind: TokenKind,
        ) {
            let span = self.span();
            self.tokens.push(Token::new(kind, span));
        }

        fn push_layout(
            &mut self,
            kind: TokenKind,
        ) {
            let here = self.position();
            self.tokens.push(Token::new(kind, Span::new(here, here)));
        }

        fn last_is_line_end(&self) -> bool {
            matches!(
                self.tokens.last().map(|t| &t.kind),
                None | Some(TokenKind::Newline) | Some(TokenKind::Indent) | Some(TokenKind::Dedent)
            )
        }

        fn run(&mut self) -> Result<(), LexError> {
            let mut at_line_start = true;

            loop {
                if at_line_start && self.brackets.is_empty() {
                    match self.scan_indentation()? {
                        LineStart::Eof => break,
                        LineStart::Blank => continue,
                        LineStart::Code => at_line_start = false,
                    }
                }

                while matches!(self.peek(), Some(' ' | '\t' | '\r' | '\x0c')) {
                    self.advance();
                }

                self.start = self.position();
                let Some(c) = self.peek() else { break };

                match c {
                    '#' => self.skip_comment(),
                    '\\' => {
                        self.advance();
                        if self.peek() == Some('\r') {
                            self.advance();
                        }
                        match self.peek() {
                            Some('\n') => {
                                self.advance();
                            }
                            None => {
                                return Err(LexError::BadContinuation {
                                    position: self.start,
                                    at_eof: true,
                                })
                            }
                            Some(_) => {
                                return Err(LexError::BadContinuation {
                                    position: self.start,
                                    at_eof: false,
                                })
                            }
                        }
                    }
                    '\n' => {
                        self.advance();
                        if self.brackets.is_empty() {
                            if !self.last_is_line_end() {
                                self.tokens.push(Token::new(TokenKind::Newline, Span::new(self.start, self.start)));
                            }
                            at_line_start = true;
                        }
                    }
                    _ => self.scan_token(c)?,
                }
            }

            if let Some((open, position)) = self.brackets.last() {
                return Err(LexError::UnclosedBracket {
                    open: *open,
                    position: *position,
                });
            }

            if !self.last_is_line_end() {
                self.push_layout(TokenKind::Newline);
            }
            while self.indents.len() > 1 {
                self.indents.pop();
                self.push_layout(TokenKind::Dedent);
            }
            self.push_layout(TokenKind::Eof);
            Ok(())
        }

        /// Measure the indentation of a new logical line and emit layout tokens.
        fn scan_indentation(&mut self) -> Result<LineStart, LexError> {
            let mut width = 0;
            loop {
                match self.peek() {
                    Some(' ') => width += 1,
                    Some('\t') => width = (width / TAB_WIDTH + 1) * TAB_WIDTH,
                    Some('\x0c') => width = 0,
                    _ => break,
                }
                self.advance();
            }

            match self.peek() {
                None => return Ok(LineStart::Eof),
                Some('\n') | Some('\r') => {
                    self.advance();
                    return Ok(LineStart::Blank);
                }
                Some('#') => {
                    self.skip_comment();
                    if self.peek() == Some('\n') {
                        self.advance();
                    }
                    return Ok(LineStart::Blank);
                }
                _ => {}
            }

            let current = self.indents.last().copied().unwrap_or(0);
            if width > current {
                self.indents.push(width);
                self.push_layout(TokenKind::Indent);
            } else if width < current {
                while self.indents.last().copied().unwrap_or(0) > width {
                    self.indents.pop();
                    self.push_layout(TokenKind::Dedent);
                }
                if self.indents.last().copied().unwrap_or(0) != width {
                    return Err(LexError::InconsistentDedent {
                        position: self.position(),
                    });
                }
            }
            Ok(LineStart::Code)
        }

        fn skip_comment(&mut self) {
            while let Some(c) = self.peek() {
                if c == '\n' {
                    break;
                }
                self.advance();
            }
        }

        fn scan_token(
            &mut self,
            c: char,
        ) -> Result<(), LexError> {
            if c == '_' || unicode_ident::is_xid_start(c) {
                return self.scan_identifier();
            }
            if c.is_ascii_digit() || (c == '.' && self.peek_next().is_some_and(|n| n.is_ascii_digit())) {
                return self.scan_number();
            }
            if c == '"' || c == '\'' {
                return self.scan_string(c);
            }

            self.advance();
            let kind = match c {
                '+' => self.with_assign(TokenKind::Plus, TokenKind::PlusAssign),
                '-' => self.with_assign(TokenKind::Minus, TokenKind::MinusAssign),
                '%' => self.with_assign(TokenKind::Percent, TokenKind::PercentAssign),
                '*' => {
                    if self.peek() == Some('*') {
                        self.advance();
                        TokenKind::DoubleStar
                    } else {
                        self.with_assign(TokenKind::Star, TokenKind::StarAssign)
                    }
                }
                '/' => {
                    if self.peek() == Some('/') {
                        self.advance();
                        TokenKind::DoubleSlash
                    } else {
                        self.with_assign(TokenKind::Slash, TokenKind::SlashAssign)
                    }
                }
                '=' => self.with_assign(TokenKind::Assign, TokenKind::EqEq),
                '<' => self.with_assign(TokenKind::Lt, TokenKind::Le),
                '>' => self.with_assign(TokenKind::Gt, TokenKind::Ge),
                '!' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        TokenKind::Neq
                    } else {
                        return Err(LexError::UnexpectedChar {
                            ch: '!',
                            position: self.start,
                        });
                    }
                }
                ',' => TokenKind::Comma,
                ':' => TokenKind::Colon,
                ';' => TokenKind::Semicolon,
                '.' => TokenKind::Dot,
                '(' | '[' | '{' => {
                    self.brackets.push((c, self.start));
                    match c {
                        '(' => TokenKind::LParen,
                        '[' => TokenKind::LBracket,
                        _ => TokenKind::LBrace,
                    }
                }
                ')' | ']' | '}' => {
                    let expected = match c {
                        ')' => '(',
                        ']' => '[',
                        _ => '{',
                    };
                    match self.brackets.pop() {
                        Some((open, _)) if open == expected => {}
                        _ => {
                            return Err(LexError::UnmatchedBracket {
                                close: c,
                                position: self.start,
                            })
                        }
                    }
                    match c {
                        ')' => TokenKind::RParen,
                        ']' => TokenKind::RBracket,
                        _ => TokenKind::RBrace,
                    }
                }
                other => {
                    return Err(LexError::UnexpectedChar {
                        ch: other,
                        position: self.start,
                    })
                }
            };
            self.push(kind);
            Ok(())
        }

        fn with_assign(
            &mut self,
            plain: TokenKind,
            assign: TokenKind,
        ) -> TokenKind {
            if self.peek() == Some('=') {
                self.advance();
                assign
            } else {
                plain
            }
        }

        fn scan_identifier(&mut self) -> Result<(), LexError> {
            let mut name = String::new();
            while let Some(c) = self.peek() {
                if c == '_' || unicode_ident::is_xid_continue(c) {
                    name.push(c);
                    self.advance();
                } else {
                    break;
                }
            }
            let kind = TokenKind::keyword(&name).unwrap_or(TokenKind::Identifier(name));
            self.push(kind);
            Ok(())
        }

        fn scan_number(&mut self) -> Result<(), LexError> {
            let mut text = String::new();

            if self.peek() == Some('0') && matches!(self.peek_next(), Some('x' | 'X' | 'o' | 'O' | 'b' | 'B')) {
                self.advance();
                let radix = match self.advance() {
                    Some('x' | 'X') => 16,
                    Some('o' | 'O') => 8,
                    _ => 2,
                };
                while let Some(c) = self.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' {
                        if c != '_' {
                            text.push(c);
                        }
                        self.advance();
                    } else {
                        break;
                    }
                }
                let value = i64::from_str_radix(&text, radix).map_err(|_| LexError::InvalidNumber {
                    text: text.clone(),
                    position: self.start,
                })?;
                self.push(TokenKind::IntLiteral(value));
                return Ok(());
            }

            let mut is_float = false;
            self.take_digits(&mut text);
            if self.peek() == Some('.') && !self.peek_next().is_some_and(|c| c == '_' || unicode_ident::is_xid_start(c)) {
                is_float = true;
                text.push('.');
                self.advance();
                self.take_digits(&mut text);
            }
            if matches!(self.peek(), Some('e' | 'E')) {
                let after = self.peek_next();
                if after.is_some_and(|c| c.is_ascii_digit() || c == '+' || c == '-') {
                    is_float = true;
                    text.push('e');
                    self.advance();
                    if let Some(sign @ ('+' | '-')) = self.peek() {
                        text.push(sign);
                        self.advance();
                    }
                    self.take_digits(&mut text);
                }
            }
            if self.peek().is_some_and(|c| c == '_' || unicode_ident::is_xid_start(c)) {
                while let Some(c) = self.peek() {
                    if !unicode_ident::is_xid_continue(c) {
                        break;
                    }
                    text.push(c);
                    self.advance();
                }
                return Err(LexError::InvalidNumber {
                    text,
                    position: self.start,
                });
            }

            let invalid = |text: &str| LexError::InvalidNumber {
                text: text.to_string(),
                position: self.start,
            };
            let kind = if is_float {
                TokenKind::FloatLiteral(text.parse().map_err(|_| invalid(&text))?)
            } else {
                TokenKind::IntLiteral(text.parse().map_err(|_| invalid(&text))?)
            };
            self.push(kind);
            Ok(())
        }

        fn take_digits(
            &mut self,
            text: &mut String,
        ) {
            while let Some(c) = self.peek() {
                if c.is_ascii_digit() {
                    text.push(c);
                    self.advance();
                } else if c == '_' && self.peek_next().is_some_and(|n| n.is_ascii_digit()) {
                    self.advance();
                } else {
                    break;
                }
            }
        }

        fn scan_string(
            &mut self,
            quote: char,
        ) -> Result<(), LexError> {
            self.advance();
            let triple = self.peek() == Some(quote) && self.peek_next() == Some(quote);
            if triple {
                self.advance();
                self.advance();
            }

            let mut value = String::new();
            loop {
                let Some(c) = self.advance() else {
                    return Err(LexError::UnterminatedString {
                        position: self.start,
                        triple,
                    });
                };
                match c {
                    '\\' => match self.advance() {
                        Some('n') => value.push('\n'),
                        Some('t') => value.push('\t'),
                        Some('r') => value.push('\r'),
                        Some('0') => value.push('\0'),
                        Some('\\') => value.push('\\'),
                        Some('\'') => value.push('\''),
                        Some('"') => value.push('"'),
                        Some('\n') => {}
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                        None => {
                            return Err(LexError::UnterminatedString {
                                position: self.start,
                                triple,
                            })
                        }
                    },
                    '\n' if !triple => {
                        return Err(LexError::UnterminatedString {
                            position: self.start,
                            triple,
                        })
                    }
                    c if c == quote => {
                        if !triple {
                            break;
                        }
                        if self.peek() == Some(quote) && self.peek_next() == Some(quote) {
                            self.advance();
                            self.advance();
                            break;
                        }
                        value.push(c);
                    }
                    c => value.push(c),
                }
            }

            self.push(TokenKind::StringLiteral(value));
            Ok(())
        }
    }

    enum LineStart {
        Code,
        Blank,
        Eof,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source)
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_simple_assignment() {
        assert_eq!(
            kinds("x = 1"),
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Assign,
                TokenKind::IntLiteral(1),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_indent_dedent() {
        let toks = kinds("if x:\n    y = 1\nz = 2\n");
        assert_eq!(
            toks,
            vec![
                TokenKind::KwIf,
                TokenKind::Identifier("x".into()),
                TokenKind::Colon,
                TokenKind::Newline,
                TokenKind::Indent,
                TokenKind::Identifier("y".into()),
                TokenKind::Assign,
                TokenKind::IntLiteral(1),
                TokenKind::Newline,
                TokenKind::Dedent,
                TokenKind::Identifier("z".into()),
                TokenKind::Assign,
                TokenKind::IntLiteral(2),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_blank_and_comment_lines_ignored() {
        let toks = kinds("# heading\n\nx = 1  # trailing\n   \n");
        assert_eq!(
            toks,
            vec![
                TokenKind::Identifier("x".into()),
                TokenKind::Assign,
                TokenKind::IntLiteral(1),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
        assert_eq!(kinds("# only a comment"), vec![TokenKind::Eof]);
    }

    #[test]
    fn test_implicit_line_join() {
        let toks = kinds("f(1,\n  2)");
        assert!(!toks[..toks.len() - 2].contains(&TokenKind::Newline));
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("a ** b // c != d"),
            vec![
                TokenKind::Identifier("a".into()),
                TokenKind::DoubleStar,
                TokenKind::Identifier("b".into()),
                TokenKind::DoubleSlash,
                TokenKind::Identifier("c".into()),
                TokenKind::Neq,
                TokenKind::Identifier("d".into()),
                TokenKind::Newline,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(kinds("1_000")[0], TokenKind::IntLiteral(1000));
        assert_eq!(kinds("0x1f")[0], TokenKind::IntLiteral(31));
        assert_eq!(kinds("2.5")[0], TokenKind::FloatLiteral(2.5));
        assert_eq!(kinds(".5")[0], TokenKind::FloatLiteral(0.5));
        assert_eq!(kinds("1e3")[0], TokenKind::FloatLiteral(1000.0));
        assert!(matches!(
            tokenize("12abc"),
            Err(LexError::InvalidNumber { .. })
        ));
    }

    #[test]
    fn test_strings() {
        assert_eq!(
            kinds(r#"'it\'s' "a\tb""#)[..2],
            [
                TokenKind::StringLiteral("it's".into()),
                TokenKind::StringLiteral("a\tb".into()),
            ]
        );
        assert_eq!(
            kinds("\"\"\"two\nlines\"\"\"")[0],
            TokenKind::StringLiteral("two\nlines".into())
        );
    }

    #[test]
    fn test_incomplete_inputs() {
        let err = tokenize("x = (1,\n").unwrap_err();
        assert!(err.is_incomplete());
        let err = tokenize("s = \"\"\"open").unwrap_err();
        assert!(err.is_incomplete());
        let err = tokenize("s = 'open").unwrap_err();
        assert!(!err.is_incomplete());
    }

    #[test]
    fn test_inconsistent_dedent() {
        let err = tokenize("if x:\n        a = 1\n    b = 2\n").unwrap_err();
        assert!(err.is_indentation());
        assert_eq!(err.position().line, 3);
    }

    #[test]
    fn test_unmatched_bracket() {
        assert!(matches!(
            tokenize("x = 1)"),
            Err(LexError::UnmatchedBracket { close: ')', .. })
        ));
    }
}
