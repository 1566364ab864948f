//! Typed values for positional arguments and flags.

use serde::Serialize;
use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;
use thiserror::Error;

/// Errors produced while synthesizing defaults or coercing tokens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    #[error("unknown default value '{0}': expected 'true' or 'false'")]
    UnknownDefaultValue(String),

    #[error("cannot parse '{input}' as an integer: {source}")]
    IntegerParse {
        input: String,
        #[source]
        source: ParseIntError,
    },

    #[error("invalid boolean value '{0}': expected true, false, t or f")]
    InvalidValue(String),

    #[error("list type '{0}' does not accept a default value")]
    DefaultOnList(ValueType),
}

/// Declared type of an argument or flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Bool,
    Number,
    String,
    Bools,
    Numbers,
    Strings,
}

impl ValueType {
    /// Spelling used in spec documents.
    pub fn as_str(self) -> &'static str {
        match self {
            ValueType::Bool => "bool",
            ValueType::Number => "number",
            ValueType::String => "string",
            ValueType::Bools => "bools",
            ValueType::Numbers => "numbers",
            ValueType::Strings => "strings",
        }
    }

    /// Whether values of this type absorb multiple tokens.
    pub fn is_plural(self) -> bool {
        matches!(
            self,
            ValueType::Bools | ValueType::Numbers | ValueType::Strings
        )
    }
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "bool" => Ok(ValueType::Bool),
            "number" => Ok(ValueType::Number),
            "string" => Ok(ValueType::String),
            "bools" => Ok(ValueType::Bools),
            "numbers" => Ok(ValueType::Numbers),
            "strings" => Ok(ValueType::Strings),
            other => Err(other.to_string()),
        }
    }
}

/// The current value of an argument or flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Bool(bool),
    Number(i64),
    String(String),
    BoolList(Vec<bool>),
    NumberList(Vec<i64>),
    StringList(Vec<String>),
}

impl Value {
    /// Build the starting value for a declared type.
    ///
    /// Scalars take the literal when one is given and fall back to
    /// `false`, `0` or the empty string. Lists always start empty and
    /// reject any literal.
    pub fn with_default(ty: ValueType, literal: Option<&str>) -> Result<Value, ValueError> {
        match (ty, literal) {
            (ValueType::Bool, None) => Ok(Value::Bool(false)),
            (ValueType::Bool, Some("true")) => Ok(Value::Bool(true)),
            (ValueType::Bool, Some("false")) => Ok(Value::Bool(false)),
            (ValueType::Bool, Some(other)) => {
                Err(ValueError::UnknownDefaultValue(other.to_string()))
            }
            (ValueType::Number, None) => Ok(Value::Number(0)),
            (ValueType::Number, Some(text)) => parse_number(text).map(Value::Number),
            (ValueType::String, None) => Ok(Value::String(String::new())),
            (ValueType::String, Some(text)) => Ok(Value::String(text.to_string())),
            (list, Some(_)) => Err(ValueError::DefaultOnList(list)),
            (ValueType::Bools, None) => Ok(Value::BoolList(Vec::new())),
            (ValueType::Numbers, None) => Ok(Value::NumberList(Vec::new())),
            (ValueType::Strings, None) => Ok(Value::StringList(Vec::new())),
        }
    }

    pub fn value_type(&self) -> ValueType {
        match self {
            Value::Bool(_) => ValueType::Bool,
            Value::Number(_) => ValueType::Number,
            Value::String(_) => ValueType::String,
            Value::BoolList(_) => ValueType::Bools,
            Value::NumberList(_) => ValueType::Numbers,
            Value::StringList(_) => ValueType::Strings,
        }
    }

    pub fn is_plural(&self) -> bool {
        self.value_type().is_plural()
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Value::Bool(_))
    }

    /// Flip a boolean. Non-boolean values are left untouched.
    pub fn toggle(&mut self) {
        if let Value::Bool(b) = self {
            *b = !*b;
        }
    }

    /// Overwrite a scalar with a coerced token, or append it to a list.
    pub fn assign(&mut self, token: &str) -> Result<(), ValueError> {
        match self {
            Value::Bool(b) => *b = parse_truthy(token)?,
            Value::Number(n) => *n = parse_number(token)?,
            Value::String(s) => *s = token.to_string(),
            Value::BoolList(items) => items.push(parse_truthy(token)?),
            Value::NumberList(items) => items.push(parse_number(token)?),
            Value::StringList(items) => items.push(token.to_string()),
        }
        Ok(())
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<i64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bools(&self) -> Option<&[bool]> {
        match self {
            Value::BoolList(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_numbers(&self) -> Option<&[i64]> {
        match self {
            Value::NumberList(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_strings(&self) -> Option<&[String]> {
        match self {
            Value::StringList(items) => Some(items),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn join<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                write!(f, "{}", item)?;
            }
            Ok(())
        }

        match self {
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => f.write_str(s),
            Value::BoolList(items) => join(f, items),
            Value::NumberList(items) => join(f, items),
            Value::StringList(items) => join(f, items),
        }
    }
}

/// Parse a boolean element: `true`/`false` or `t`/`f`, case-insensitive.
pub fn parse_truthy(token: &str) -> Result<bool, ValueError> {
    if token.eq_ignore_ascii_case("true") || token.eq_ignore_ascii_case("t") {
        Ok(true)
    } else if token.eq_ignore_ascii_case("false") || token.eq_ignore_ascii_case("f") {
        Ok(false)
    } else {
        Err(ValueError::InvalidValue(token.to_string()))
    }
}

fn parse_number(token: &str) -> Result<i64, ValueError> {
    token
        .parse::<i64>()
        .map_err(|source| ValueError::IntegerParse {
            input: token.to_string(),
            source,
        })
}
