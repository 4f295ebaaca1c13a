use std::fmt;

use serde::{Deserialize, Serialize};

/// A single cell returned by a node's embedded engine.
///
/// Equality is strict: grant values are compared as stored, so `Integer(0)`
/// and `Text("0")` are different values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Text(String),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "NULL",
            Self::Integer(_) => "INTEGER",
            Self::Text(_) => "TEXT",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Integer(i)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// Declared column type as reported by the node alongside each result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Char,
    VarChar,
    VarBinary,
    Text,
    Blob,
    Int32,
    Int64,
    Enum,
    Set,
    Timestamp,
}

impl ColumnType {
    pub fn is_compatible(&self, value: &Value) -> bool {
        match value {
            Value::Null => true,
            Value::Integer(_) => true,
            // The text protocol returns every cell as bytes, so integer
            // columns such as max_questions arrive as decimal text.
            Value::Text(text) => self.is_textual() || text.trim().parse::<i64>().is_ok(),
        }
    }

    pub fn is_textual(&self) -> bool {
        !matches!(self, Self::Int32 | Self::Int64)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Char => "CHAR",
            Self::VarChar => "VARCHAR",
            Self::VarBinary => "VARBINARY",
            Self::Text => "TEXT",
            Self::Blob => "BLOB",
            Self::Int32 => "INT32",
            Self::Int64 => "INT64",
            Self::Enum => "ENUM",
            Self::Set => "SET",
            Self::Timestamp => "TIMESTAMP",
        };
        write!(f, "{}", name)
    }
}
