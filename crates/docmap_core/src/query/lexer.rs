//! Tokenizer for query text.

use crate::error::{CoreError, CoreResult};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TokenKind {
    /// Identifier or keyword; keywords are matched case-insensitively by the parser.
    Ident(String),
    /// `:name`
    Param(String),
    /// `'text'`, with `''` as an escaped quote.
    Str(String),
    Int(i64),
    Float(f64),
    Dot,
    Eq,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character.
    pub offset: usize,
}

impl Token {
    pub(crate) fn is_keyword(&self, keyword: &str) -> bool {
        matches!(&self.kind, TokenKind::Ident(word) if word.eq_ignore_ascii_case(keyword))
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_'
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

pub(crate) struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    pub(crate) fn new(input: &'a str) -> Self {
        Self { input, pos: 0 }
    }

    fn peek(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        self.input[self.pos..].chars().nth(1)
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn take_while(&mut self, accept: fn(char) -> bool) -> &'a str {
        let start = self.pos;
        while self.peek().is_some_and(accept) {
            self.advance();
        }
        &self.input[start..self.pos]
    }

    /// Splits the whole input into tokens, ending with [`TokenKind::Eof`].
    pub(crate) fn tokenize(mut self) -> CoreResult<Vec<Token>> {
        let mut tokens = Vec::new();
        loop {
            self.take_while(char::is_whitespace);
            let offset = self.pos;
            let Some(c) = self.peek() else {
                tokens.push(Token {
                    kind: TokenKind::Eof,
                    offset,
                });
                return Ok(tokens);
            };
            let kind = match c {
                '.' => {
                    self.advance();
                    TokenKind::Dot
                }
                '=' => {
                    self.advance();
                    TokenKind::Eq
                }
                ':' => {
                    self.advance();
                    let name = self.take_while(is_ident_char);
                    if name.is_empty() {
                        return Err(CoreError::invalid_query(offset, "expected a parameter name after `:`"));
                    }
                    TokenKind::Param(name.to_string())
                }
                '\'' => self.string(offset)?,
                c if c.is_ascii_digit() => self.number(offset)?,
                '-' if self.peek_second().is_some_and(|c| c.is_ascii_digit()) => self.number(offset)?,
                c if is_ident_start(c) => TokenKind::Ident(self.take_while(is_ident_char).to_string()),
                other => {
                    return Err(CoreError::invalid_query(
                        offset,
                        format!("unexpected character `{other}`"),
                    ))
                }
            };
            tokens.push(Token { kind, offset });
        }
    }

    fn string(&mut self, offset: usize) -> CoreResult<TokenKind> {
        self.advance();
        let mut out = String::new();
        loop {
            match self.advance() {
                None => return Err(CoreError::invalid_query(offset, "unterminated string literal")),
                Some('\'') if self.peek() == Some('\'') => {
                    self.advance();
                    out.push('\'');
                }
                Some('\'') => return Ok(TokenKind::Str(out)),
                Some(c) => out.push(c),
            }
        }
    }

    fn number(&mut self, offset: usize) -> CoreResult<TokenKind> {
        if self.peek() == Some('-') {
            self.advance();
        }
        self.take_while(|c| c.is_ascii_digit());
        let mut is_float = false;
        if self.peek() == Some('.') && self.peek_second().is_some_and(|c| c.is_ascii_digit()) {
            is_float = true;
            self.advance();
            self.take_while(|c| c.is_ascii_digit());
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            is_float = true;
            self.advance();
            if matches!(self.peek(), Some('-' | '+')) {
                self.advance();
            }
            self.take_while(|c| c.is_ascii_digit());
        }
        let text = &self.input[offset..self.pos];
        let parsed = if is_float {
            text.parse::<f64>().ok().map(TokenKind::Float)
        } else {
            text.parse::<i64>().ok().map(TokenKind::Int)
        };
        parsed.ok_or_else(|| CoreError::invalid_query(offset, format!("invalid number {text}")))
    }
}
