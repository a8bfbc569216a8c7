//! Reader for native shell-style query text.
//!
//! Accepts the forms users type into a document shell:
//!
//! - `db.ORDER.find({...})` and `db.ORDER.findOne({...})`
//! - a bare filter object `{...}`
//!
//! Objects use relaxed syntax: keys may be unquoted (`{_id: "x"}`) or quoted
//! with single or double quotes, strings may use either quote, and a trailing
//! `;` after a command is accepted.

use crate::error::{StoreError, StoreResult};
use docmap_document::{Document, Value};

/// The shell method named by a native query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShellMethod {
    /// `find(...)`: every match.
    Find,
    /// `findOne(...)`: the first match only.
    FindOne,
}

/// A parsed native query.
#[derive(Debug, Clone, PartialEq)]
pub struct ShellQuery {
    /// Collection named after `db.`, if the text was a full command.
    pub collection: Option<String>,
    /// The requested method.
    pub method: ShellMethod,
    /// The filter document (empty selects everything).
    pub filter: Document,
}

/// Parses native query text.
///
/// # Errors
///
/// Returns [`StoreError::InvalidNativeQuery`] with the byte offset of the
/// first problem.
pub fn parse_shell_query(text: &str) -> StoreResult<ShellQuery> {
    let mut reader = Reader::new(text);
    reader.skip_ws();

    let query = if reader.src[reader.pos..].starts_with("db.") {
        reader.pos += 3;
        let collection = reader.word(is_name_char)?.to_string();
        reader.expect('.')?;
        let method_start = reader.pos;
        let method = match reader.word(is_name_char)? {
            "find" => ShellMethod::Find,
            "findOne" => ShellMethod::FindOne,
            other => {
                return Err(StoreError::invalid_native_query(
                    method_start,
                    format!("unsupported shell method {other}"),
                ))
            }
        };
        reader.skip_ws();
        reader.expect('(')?;
        reader.skip_ws();
        let filter = if reader.peek() == Some('{') {
            reader.object()?
        } else {
            Document::new()
        };
        reader.skip_ws();
        reader.expect(')')?;
        reader.skip_ws();
        reader.eat(';');
        ShellQuery {
            collection: Some(collection),
            method,
            filter,
        }
    } else if reader.peek() == Some('{') {
        ShellQuery {
            collection: None,
            method: ShellMethod::Find,
            filter: reader.object()?,
        }
    } else {
        return Err(reader.error("expected `db.<collection>.<method>(...)` or a filter object"));
    };

    reader.skip_ws();
    if reader.peek().is_some() {
        return Err(reader.error("unexpected trailing input"));
    }
    Ok(query)
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn is_key_char(c: char) -> bool {
    is_name_char(c) || c == '$' || c == '.'
}

struct Reader<'a> {
    src: &'a str,
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(src: &'a str) -> Self {
        Self { src, pos: 0 }
    }

    fn error(&self, message: impl Into<String>) -> StoreError {
        StoreError::invalid_native_query(self.pos, message)
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn eat(&mut self, c: char) -> bool {
        if self.peek() == Some(c) {
            self.pos += c.len_utf8();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, c: char) -> StoreResult<()> {
        if self.eat(c) {
            Ok(())
        } else {
            Err(self.error(format!("expected `{c}`")))
        }
    }

    fn skip_ws(&mut self) {
        while self.peek().is_some_and(char::is_whitespace) {
            self.bump();
        }
    }

    fn word(&mut self, accept: fn(char) -> bool) -> StoreResult<&'a str> {
        let start = self.pos;
        while self.peek().is_some_and(accept) {
            self.bump();
        }
        if start == self.pos {
            return Err(self.error("expected a name"));
        }
        Ok(&self.src[start..self.pos])
    }

    fn object(&mut self) -> StoreResult<Document> {
        self.expect('{')?;
        let mut doc = Document::new();
        self.skip_ws();
        if self.eat('}') {
            return Ok(doc);
        }
        loop {
            self.skip_ws();
            let key = match self.peek() {
                Some(q @ ('"' | '\'')) => self.string(q)?,
                _ => self.word(is_key_char)?.to_string(),
            };
            self.skip_ws();
            self.expect(':')?;
            self.skip_ws();
            let value = self.value()?;
            doc.insert(key, value);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.expect('}')?;
            return Ok(doc);
        }
    }

    fn array(&mut self) -> StoreResult<Vec<Value>> {
        self.expect('[')?;
        let mut items = Vec::new();
        self.skip_ws();
        if self.eat(']') {
            return Ok(items);
        }
        loop {
            self.skip_ws();
            items.push(self.value()?);
            self.skip_ws();
            if self.eat(',') {
                continue;
            }
            self.expect(']')?;
            return Ok(items);
        }
    }

    fn value(&mut self) -> StoreResult<Value> {
        match self.peek() {
            Some('{') => Ok(Value::Document(self.object()?)),
            Some('[') => Ok(Value::Array(self.array()?)),
            Some(q @ ('"' | '\'')) => Ok(Value::Text(self.string(q)?)),
            Some(c) if c == '-' || c == '+' || c.is_ascii_digit() => self.number(),
            Some(c) if c.is_ascii_alphabetic() => {
                let start = self.pos;
                match self.word(is_name_char)? {
                    "true" => Ok(Value::Bool(true)),
                    "false" => Ok(Value::Bool(false)),
                    "null" => Ok(Value::Null),
                    other => Err(StoreError::invalid_native_query(
                        start,
                        format!("unexpected word {other}"),
                    )),
                }
            }
            Some(_) => Err(self.error("expected a value")),
            None => Err(self.error("unexpected end of input")),
        }
    }

    fn string(&mut self, quote: char) -> StoreResult<String> {
        self.expect(quote)?;
        let mut out = String::new();
        loop {
            match self.bump() {
                None => return Err(self.error("unterminated string")),
                Some(c) if c == quote => return Ok(out),
                Some('\\') => {
                    let escaped = match self.bump() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('u') => self.unicode_escape()?,
                        Some(c) => c,
                        None => return Err(self.error("unterminated escape")),
                    };
                    out.push(escaped);
                }
                Some(c) => out.push(c),
            }
        }
    }

    fn unicode_escape(&mut self) -> StoreResult<char> {
        let start = self.pos;
        let end = start + 4;
        let hex = self
            .src
            .get(start..end)
            .ok_or_else(|| self.error("truncated \\u escape"))?;
        let code = u32::from_str_radix(hex, 16).map_err(|_| self.error("invalid \\u escape"))?;
        self.pos = end;
        char::from_u32(code).ok_or_else(|| StoreError::invalid_native_query(start, "invalid code point"))
    }

    fn number(&mut self) -> StoreResult<Value> {
        let start = self.pos;
        if matches!(self.peek(), Some('-' | '+')) {
            self.bump();
        }
        let mut is_float = false;
        while let Some(c) = self.peek() {
            match c {
                '0'..='9' => {}
                '.' | 'e' | 'E' => is_float = true,
                '-' | '+' if is_float => {}
                _ => break,
            }
            self.bump();
        }
        let text = &self.src[start..self.pos];
        let parsed = if is_float {
            text.parse::<f64>().ok().map(Value::Float)
        } else {
            text.parse::<i64>()
                .ok()
                .map(Value::Integer)
                .or_else(|| text.parse::<f64>().ok().map(Value::Float))
        };
        parsed.ok_or_else(|| StoreError::invalid_native_query(start, format!("invalid number {text}")))
    }
}
