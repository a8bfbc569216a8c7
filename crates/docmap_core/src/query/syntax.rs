//! Parser for the supported query grammar.
//!
//! ```text
//! query      := SELECT alias FROM Type [AS] alias join* [WHERE condition (AND condition)*]
//! join       := [INNER] JOIN path [AS] alias
//! condition  := path = operand
//! path       := alias (. field)*
//! operand    := 'text' | integer | float | TRUE | FALSE | NULL | :name
//! ```
//!
//! Keywords are case-insensitive. The parser only checks shape; names are
//! resolved against the registry by the compiler.

use super::lexer::{Lexer, Token, TokenKind};
use crate::error::{CoreError, CoreResult};
use docmap_document::Value;
use std::fmt;

const RESERVED: &[&str] = &["SELECT", "FROM", "WHERE", "JOIN", "INNER", "AND", "AS"];

/// `alias.field.field` as written in the query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PathExpr {
    pub alias: String,
    pub fields: Vec<String>,
    pub offset: usize,
}

impl PathExpr {
    /// Splits `i.quantity` style text. Used by the criteria builder.
    pub(crate) fn from_dotted(text: &str) -> Self {
        let mut parts = text.split('.').map(str::to_string);
        let alias = parts.next().unwrap_or_default();
        Self {
            alias,
            fields: parts.collect(),
            offset: 0,
        }
    }
}

impl fmt::Display for PathExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.alias)?;
        for field in &self.fields {
            write!(f, ".{field}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum OperandExpr {
    Literal(Value),
    Parameter(String),
}

impl fmt::Display for OperandExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperandExpr::Parameter(name) => write!(f, ":{name}"),
            OperandExpr::Literal(Value::Text(s)) => write!(f, "'{}'", s.replace('\'', "''")),
            OperandExpr::Literal(Value::Null) => f.write_str("NULL"),
            OperandExpr::Literal(Value::Bool(true)) => f.write_str("TRUE"),
            OperandExpr::Literal(Value::Bool(false)) => f.write_str("FALSE"),
            OperandExpr::Literal(v) => write!(f, "{v}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct JoinClause {
    pub source: PathExpr,
    pub alias: String,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Comparison {
    pub path: PathExpr,
    pub operand: OperandExpr,
    pub offset: usize,
}

/// A parsed, unresolved query.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SelectStatement {
    pub selected: String,
    pub selected_offset: usize,
    pub entity: String,
    pub entity_offset: usize,
    pub root_alias: String,
    pub joins: Vec<JoinClause>,
    pub conditions: Vec<Comparison>,
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SELECT {} FROM {} {}", self.selected, self.entity, self.root_alias)?;
        for join in &self.joins {
            write!(f, " JOIN {} {}", join.source, join.alias)?;
        }
        for (i, condition) in self.conditions.iter().enumerate() {
            let keyword = if i == 0 { "WHERE" } else { "AND" };
            write!(f, " {keyword} {} = {}", condition.path, condition.operand)?;
        }
        Ok(())
    }
}

/// Parses query text into a statement.
pub(crate) fn parse(text: &str) -> CoreResult<SelectStatement> {
    let tokens = Lexer::new(text).tokenize()?;
    Parser { tokens, pos: 0 }.statement()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> &Token {
        // tokenize always ends with Eof, and the parser never moves past it
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if token.kind != TokenKind::Eof {
            self.pos += 1;
        }
        token
    }

    fn error(&self, message: impl Into<String>) -> CoreError {
        CoreError::invalid_query(self.peek().offset, message)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        if self.peek().is_keyword(keyword) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_keyword(&mut self, keyword: &str) -> CoreResult<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.error(format!("expected {keyword}")))
        }
    }

    fn identifier(&mut self, what: &str) -> CoreResult<(String, usize)> {
        let token = self.peek().clone();
        match token.kind {
            TokenKind::Ident(name) if !RESERVED.iter().any(|k| name.eq_ignore_ascii_case(k)) => {
                self.advance();
                Ok((name, token.offset))
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn statement(mut self) -> CoreResult<SelectStatement> {
        self.expect_keyword("SELECT")?;
        let (selected, selected_offset) = self.identifier("a selected alias")?;
        self.expect_keyword("FROM")?;
        let (entity, entity_offset) = self.identifier("an entity name")?;
        self.eat_keyword("AS");
        let (root_alias, _) = self.identifier("an alias for the entity")?;

        let mut joins = Vec::new();
        loop {
            let inner = self.eat_keyword("INNER");
            if !self.eat_keyword("JOIN") {
                if inner {
                    return Err(self.error("expected JOIN after INNER"));
                }
                break;
            }
            let source = self.path()?;
            self.eat_keyword("AS");
            let (alias, offset) = self.identifier("an alias for the join")?;
            joins.push(JoinClause { source, alias, offset });
        }

        let mut conditions = Vec::new();
        if self.eat_keyword("WHERE") {
            loop {
                conditions.push(self.comparison()?);
                if !self.eat_keyword("AND") {
                    break;
                }
            }
        }

        if self.peek().kind != TokenKind::Eof {
            return Err(self.error("unexpected input after query"));
        }

        Ok(SelectStatement {
            selected,
            selected_offset,
            entity,
            entity_offset,
            root_alias,
            joins,
            conditions,
        })
    }

    fn path(&mut self) -> CoreResult<PathExpr> {
        let (alias, offset) = self.identifier("a path")?;
        let mut fields = Vec::new();
        while self.peek().kind == TokenKind::Dot {
            self.advance();
            let token = self.advance();
            match token.kind {
                TokenKind::Ident(field) => fields.push(field),
                _ => return Err(CoreError::invalid_query(token.offset, "expected a field name after `.`")),
            }
        }
        Ok(PathExpr { alias, fields, offset })
    }

    fn comparison(&mut self) -> CoreResult<Comparison> {
        let path = self.path()?;
        if self.peek().kind != TokenKind::Eq {
            return Err(self.error("expected `=`; only equality comparisons are supported"));
        }
        self.advance();
        let token = self.advance();
        let operand = match token.kind {
            TokenKind::Str(s) => OperandExpr::Literal(Value::Text(s)),
            TokenKind::Int(n) => OperandExpr::Literal(Value::Integer(n)),
            TokenKind::Float(x) => OperandExpr::Literal(Value::Float(x)),
            TokenKind::Param(name) => OperandExpr::Parameter(name),
            TokenKind::Ident(word) if word.eq_ignore_ascii_case("TRUE") => OperandExpr::Literal(Value::Bool(true)),
            TokenKind::Ident(word) if word.eq_ignore_ascii_case("FALSE") => OperandExpr::Literal(Value::Bool(false)),
            TokenKind::Ident(word) if word.eq_ignore_ascii_case("NULL") => OperandExpr::Literal(Value::Null),
            _ => return Err(CoreError::invalid_query(token.offset, "expected a literal or :parameter")),
        };
        Ok(Comparison {
            offset: path.offset,
            path,
            operand,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_join_query() {
        let stmt = parse("SELECT o FROM Order o JOIN o.items i WHERE i.quantity = 2").unwrap();

        assert_eq!(stmt.entity, "Order");
        assert_eq!(stmt.root_alias, "o");
        assert_eq!(stmt.joins.len(), 1);
        assert_eq!(stmt.joins[0].source.to_string(), "o.items");
        assert_eq!(stmt.joins[0].alias, "i");
        assert_eq!(stmt.conditions[0].path.fields, vec!["quantity".to_string()]);
        assert_eq!(stmt.conditions[0].operand, OperandExpr::Literal(Value::Integer(2)));
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let stmt = parse("select o from Order as o inner join o.items as i where i.quantity = :q and o.paid = true")
            .unwrap();
        assert_eq!(stmt.joins[0].alias, "i");
        assert_eq!(stmt.conditions.len(), 2);
        assert_eq!(stmt.conditions[0].operand, OperandExpr::Parameter("q".into()));
        assert_eq!(stmt.conditions[1].operand, OperandExpr::Literal(Value::Bool(true)));
    }

    #[test]
    fn where_is_optional() {
        let stmt = parse("SELECT o FROM Order o").unwrap();
        assert!(stmt.joins.is_empty());
        assert!(stmt.conditions.is_empty());
    }

    #[test]
    fn display_renders_canonical_text() {
        let text = "SELECT o FROM Order o JOIN o.items i WHERE i.description = 'it''s' AND o.note = NULL";
        assert_eq!(parse(text).unwrap().to_string(), text);
    }

    #[test]
    fn syntax_errors_report_offsets() {
        let err = parse("SELECT o FROM Order o WHERE i.quantity < 2").unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuery { offset: 39, .. }));

        let err = parse("SELECT o FROM Order").unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuery { offset: 19, .. }));

        let err = parse("SELECT o FROM Order o ORDER BY o.id").unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuery { offset: 22, .. }));

        let err = parse("SELECT o FROM Order o WHERE o.quantity = o.price").unwrap_err();
        assert!(matches!(err, CoreError::InvalidQuery { offset: 41, .. }));

        assert!(parse("UPDATE Order o").is_err());
        assert!(parse("SELECT o FROM Order o INNER o.items i").is_err());
        assert!(parse("SELECT o FROM Order where").is_err());
    }
}
