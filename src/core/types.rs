use std::fmt;

use serde::{Deserialize, Serialize};

use super::{ColumnType, GrantError, Result, Value};

pub type Row = Vec<Value>;

/// A result-set column descriptor. Two columns are equal only when both the
/// name (case-sensitive) and the declared type match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    #[serde(rename = "type")]
    pub column_type: ColumnType,
}

impl Column {
    pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
        Self {
            name: name.into(),
            column_type,
        }
    }

    pub fn validate(&self, value: &Value) -> Result<()> {
        if !self.column_type.is_compatible(value) {
            return Err(GrantError::InputError(format!(
                "Column '{}' expects type {}, got {}",
                self.name,
                self.column_type,
                value.type_name()
            )));
        }
        Ok(())
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` ({})", self.name, self.column_type)
    }
}

/// Finds a column by name, ignoring ASCII case (`Host` vs `host`).
pub fn find_column_index(columns: &[Column], name: &str) -> Option<usize> {
    columns
        .iter()
        .position(|col| col.name.eq_ignore_ascii_case(name))
}
