//! Parameterized query formatting.
//!
//! Templates use `:name` placeholders. Formatting rewrites each placeholder
//! into a literal value escaped for PostgreSQL, so the resulting string can be
//! sent over the simple query protocol on whichever connection the transaction
//! holds. Placeholders inside quoted strings or identifiers are left alone, as
//! is the `::` cast operator. A placeholder with no matching parameter is an
//! error; silently substituting NULL would hide caller bugs in the generated
//! SQL.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    #[error("no value provided for placeholder :{0}")]
    MissingParam(String),

    #[error("value for placeholder :{0} contains a NUL byte")]
    NulByte(String),
}

/// A scalar parameter value, rendered into the SQL text as a literal.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    Uuid(Uuid),
    Timestamp(DateTime<Utc>),
}

impl From<bool> for ScalarValue {
    fn from(v: bool) -> Self {
        ScalarValue::Bool(v)
    }
}

impl From<i32> for ScalarValue {
    fn from(v: i32) -> Self {
        ScalarValue::Int(v.into())
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int(v)
    }
}

impl From<f64> for ScalarValue {
    fn from(v: f64) -> Self {
        ScalarValue::Float(v)
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Text(v.to_string())
    }
}

impl From<String> for ScalarValue {
    fn from(v: String) -> Self {
        ScalarValue::Text(v)
    }
}

impl From<Uuid> for ScalarValue {
    fn from(v: Uuid) -> Self {
        ScalarValue::Uuid(v)
    }
}

impl From<DateTime<Utc>> for ScalarValue {
    fn from(v: DateTime<Utc>) -> Self {
        ScalarValue::Timestamp(v)
    }
}

impl<T> From<Option<T>> for ScalarValue
where
    T: Into<ScalarValue>,
{
    fn from(v: Option<T>) -> Self {
        v.map_or(ScalarValue::Null, Into::into)
    }
}

/// Named parameter set for one statement.
#[derive(Debug, Clone, Default)]
pub struct Params {
    values: HashMap<String, ScalarValue>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, for chaining one entry per placeholder.
    pub fn with(mut self, name: &str, value: impl Into<ScalarValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn get(&self, name: &str) -> Option<&ScalarValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Renders a template into literal SQL, substituting every `:name`
/// placeholder with its escaped parameter value.
pub fn format_query(template: &str, params: &Params) -> Result<String, FormatError> {
    let mut out = String::with_capacity(template.len() + 32);
    let mut chars = template.chars().peekable();

    while let Some(ch) = chars.next() {
        match ch {
            // Quoted string or identifier: copy verbatim through the closing
            // quote. A doubled quote inside is an escaped quote, not the end.
            '\'' | '"' => {
                let quote = ch;
                out.push(quote);
                while let Some(c) = chars.next() {
                    out.push(c);
                    if c == quote {
                        if chars.peek() == Some(&quote) {
                            out.push(quote);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
            }
            ':' => {
                // `::` is the cast operator, not a placeholder.
                if chars.peek() == Some(&':') {
                    chars.next();
                    out.push_str("::");
                    continue;
                }
                let mut name = String::new();
                if matches!(chars.peek(), Some(&c) if c.is_ascii_alphabetic() || c == '_') {
                    while let Some(&c) = chars.peek() {
                        if c.is_ascii_alphanumeric() || c == '_' {
                            name.push(c);
                            chars.next();
                        } else {
                            break;
                        }
                    }
                }
                if name.is_empty() {
                    // Bare colon (array slices, etc.): copy as-is.
                    out.push(':');
                    continue;
                }
                let value = params
                    .get(&name)
                    .ok_or_else(|| FormatError::MissingParam(name.clone()))?;
                render_value(&mut out, &name, value)?;
            }
            _ => out.push(ch),
        }
    }

    Ok(out)
}

fn render_value(out: &mut String, name: &str, value: &ScalarValue) -> Result<(), FormatError> {
    match value {
        ScalarValue::Null => out.push_str("NULL"),
        ScalarValue::Bool(true) => out.push_str("TRUE"),
        ScalarValue::Bool(false) => out.push_str("FALSE"),
        ScalarValue::Int(v) => out.push_str(&v.to_string()),
        ScalarValue::Float(v) => {
            if v.is_finite() {
                out.push_str(&v.to_string());
            } else if v.is_nan() {
                out.push_str("'NaN'");
            } else if *v > 0.0 {
                out.push_str("'Infinity'");
            } else {
                out.push_str("'-Infinity'");
            }
        }
        ScalarValue::Text(s) => {
            if s.contains('\0') {
                return Err(FormatError::NulByte(name.to_string()));
            }
            push_text_literal(out, s);
        }
        ScalarValue::Uuid(v) => {
            out.push('\'');
            out.push_str(&v.to_string());
            out.push('\'');
        }
        ScalarValue::Timestamp(v) => {
            out.push('\'');
            out.push_str(&v.format("%Y-%m-%d %H:%M:%S%.6f+00").to_string());
            out.push('\'');
        }
    }
    Ok(())
}

/// Escapes a text value as a PostgreSQL string literal.
///
/// Quotes are doubled. Strings carrying backslashes are emitted in `E'...'`
/// form with the backslashes doubled, so the literal reads the same under any
/// `standard_conforming_strings` setting.
fn push_text_literal(out: &mut String, s: &str) {
    if s.contains('\\') {
        out.push_str("E'");
        for ch in s.chars() {
            match ch {
                '\'' => out.push_str("''"),
                '\\' => out.push_str("\\\\"),
                _ => out.push(ch),
            }
        }
    } else {
        out.push('\'');
        for ch in s.chars() {
            if ch == '\'' {
                out.push_str("''");
            } else {
                out.push(ch);
            }
        }
    }
    out.push('\'');
}
