//! # Filter Expressions
//!
//! Boolean expression trees over column comparisons, parsed from the request
//! query string and translated verbatim into SQL predicates. Wildcards use
//! `*` on the wire and become `LIKE` patterns.
//!
//! Grammar (loosely URL-filter style):
//!
//! ```text
//! filter     := or_chain
//! or_chain   := and_chain ( '|' and_chain )*
//! and_chain  := term ( '&' term )*
//! term       := '(' filter ')' | comparison
//! comparison := column ( '=' | '!=' | '>' | '<' ) value
//! ```

use crate::error::{ExportError, Result};

/// Comparison operators supported in filter expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Lt,
}

/// A parsed filter: a single comparison or an AND/OR chain of sub-filters.
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    Expression {
        column: String,
        op: CompareOp,
        value: String,
    },
    Chain {
        all: bool, // true = AND, false = OR
        parts: Vec<Filter>,
    },
}

impl Filter {
    /// Parse a query-string filter expression.
    ///
    /// Fails with [`ExportError::FilterSyntax`] before any query execution;
    /// an empty string is a syntax error (callers pass `None` instead).
    pub fn parse(input: &str) -> Result<Self> {
        let mut parser = Parser {
            chars: input.chars().collect(),
            pos: 0,
            input,
        };
        let filter = parser.parse_or()?;
        parser.skip_whitespace();
        if parser.pos != parser.chars.len() {
            return Err(parser.error("trailing input after expression"));
        }
        Ok(filter)
    }

    /// Convenience constructor for programmatic callers.
    pub fn eq(column: &str, value: &str) -> Self {
        Filter::Expression {
            column: column.to_string(),
            op: CompareOp::Eq,
            value: value.to_string(),
        }
    }

    /// Translate to a SQL predicate. Column names were validated at parse
    /// time; values are quoted and escaped here.
    pub fn to_sql(&self) -> String {
        match self {
            Filter::Expression { column, op, value } => {
                let wildcard = value.contains('*');
                match (op, wildcard) {
                    (CompareOp::Eq, false) => {
                        format!("{} = {}", column, quote_value(value))
                    }
                    (CompareOp::Eq, true) => {
                        format!("{} LIKE {}", column, quote_pattern(value))
                    }
                    (CompareOp::Ne, false) => {
                        format!("{} != {}", column, quote_value(value))
                    }
                    (CompareOp::Ne, true) => {
                        format!("{} NOT LIKE {}", column, quote_pattern(value))
                    }
                    (CompareOp::Gt, _) => {
                        format!("{} > {}", column, quote_value(value))
                    }
                    (CompareOp::Lt, _) => {
                        format!("{} < {}", column, quote_value(value))
                    }
                }
            }
            Filter::Chain { all, parts } => {
                let joiner = if *all { " AND " } else { " OR " };
                let rendered: Vec<String> = parts.iter().map(Filter::to_sql).collect();
                format!("({})", rendered.join(joiner))
            }
        }
    }
}

impl Filter {
    /// Evaluate against an in-memory row, mirroring the SQL translation.
    /// Used by the in-memory store; the Postgres store pushes the predicate
    /// down via [`Filter::to_sql`] instead.
    pub fn matches(&self, row: &crate::store::RawRow) -> bool {
        match self {
            Filter::Expression { column, op, value } => {
                let actual = match row.get(column) {
                    Some(serde_json::Value::String(s)) => s.clone(),
                    Some(serde_json::Value::Null) | None => return false,
                    Some(other) => other.to_string(),
                };
                let wildcard = value.contains('*');
                match op {
                    CompareOp::Eq if wildcard => glob_match(value, &actual),
                    CompareOp::Eq => actual == *value,
                    CompareOp::Ne if wildcard => !glob_match(value, &actual),
                    CompareOp::Ne => actual != *value,
                    // Numeric when both sides parse, lexicographic otherwise,
                    // matching how the database compares untyped literals.
                    CompareOp::Gt => compare(&actual, value) == std::cmp::Ordering::Greater,
                    CompareOp::Lt => compare(&actual, value) == std::cmp::Ordering::Less,
                }
            }
            Filter::Chain { all: true, parts } => parts.iter().all(|p| p.matches(row)),
            Filter::Chain { all: false, parts } => parts.iter().any(|p| p.matches(row)),
        }
    }
}

fn compare(actual: &str, expected: &str) -> std::cmp::Ordering {
    match (actual.parse::<f64>(), expected.parse::<f64>()) {
        (Ok(a), Ok(b)) => a.partial_cmp(&b).unwrap_or(std::cmp::Ordering::Equal),
        _ => actual.cmp(expected),
    }
}

/// Match a `*`-wildcard pattern against a candidate string.
fn glob_match(pattern: &str, candidate: &str) -> bool {
    let parts: Vec<&str> = pattern.split('*').collect();
    let mut remainder = candidate;
    for (i, part) in parts.iter().enumerate() {
        if part.is_empty() {
            continue;
        }
        if i == 0 {
            match remainder.strip_prefix(part) {
                Some(rest) => remainder = rest,
                None => return false,
            }
        } else if i == parts.len() - 1 {
            return remainder.ends_with(part);
        } else {
            match remainder.find(part) {
                Some(idx) => remainder = &remainder[idx + part.len()..],
                None => return false,
            }
        }
    }
    // Pattern ends with '*' (or consumed everything exactly).
    parts.last().is_some_and(|p| p.is_empty()) || remainder.is_empty()
}

/// Quote a literal value for SQL, doubling embedded quotes.
fn quote_value(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Quote a wildcard value as a LIKE pattern: `*` becomes `%`, literal
/// `%` and `_` are escaped so they only match themselves.
fn quote_pattern(value: &str) -> String {
    let escaped = value
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
        .replace('\'', "''")
        .replace('*', "%");
    format!("'{escaped}'")
}

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    input: &'a str,
}

impl Parser<'_> {
    fn parse_or(&mut self) -> Result<Filter> {
        let mut parts = vec![self.parse_and()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some('|') {
                self.pos += 1;
                parts.push(self.parse_and()?);
            } else {
                break;
            }
        }
        Ok(flatten(false, parts))
    }

    fn parse_and(&mut self) -> Result<Filter> {
        let mut parts = vec![self.parse_term()?];
        loop {
            self.skip_whitespace();
            if self.peek() == Some('&') {
                self.pos += 1;
                parts.push(self.parse_term()?);
            } else {
                break;
            }
        }
        Ok(flatten(true, parts))
    }

    fn parse_term(&mut self) -> Result<Filter> {
        self.skip_whitespace();
        if self.peek() == Some('(') {
            self.pos += 1;
            let inner = self.parse_or()?;
            self.skip_whitespace();
            if self.peek() != Some(')') {
                return Err(self.error("expected closing parenthesis"));
            }
            self.pos += 1;
            return Ok(inner);
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Filter> {
        let column = self.parse_column()?;
        self.skip_whitespace();

        let op = match self.peek() {
            Some('=') => {
                self.pos += 1;
                CompareOp::Eq
            }
            Some('!') => {
                self.pos += 1;
                if self.peek() != Some('=') {
                    return Err(self.error("expected '=' after '!'"));
                }
                self.pos += 1;
                CompareOp::Ne
            }
            Some('>') => {
                self.pos += 1;
                CompareOp::Gt
            }
            Some('<') => {
                self.pos += 1;
                CompareOp::Lt
            }
            _ => return Err(self.error("expected comparison operator")),
        };

        let value = self.parse_value();
        Ok(Filter::Expression { column, op, value })
    }

    fn parse_column(&mut self) -> Result<String> {
        self.skip_whitespace();
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c.is_ascii_alphanumeric() || c == '_' || c == '.' {
                self.pos += 1;
            } else {
                break;
            }
        }
        if self.pos == start {
            return Err(self.error("expected column name"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    fn parse_value(&mut self) -> String {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if c == '&' || c == '|' || c == ')' {
                break;
            }
            self.pos += 1;
        }
        // Whitespace around chain operators belongs to the syntax, not
        // the value, mirroring how column names are trimmed.
        let value: String = self.chars[start..self.pos].iter().collect();
        value.trim().to_string()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|c| c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn error(&self, message: &str) -> ExportError {
        ExportError::FilterSyntax(format!(
            "{message} at offset {} in {:?}",
            self.pos, self.input
        ))
    }
}

/// Single-element chains collapse to the element itself.
fn flatten(all: bool, mut parts: Vec<Filter>) -> Filter {
    if parts.len() == 1 {
        parts.pop().expect("length checked")
    } else {
        Filter::Chain { all, parts }
    }
}
