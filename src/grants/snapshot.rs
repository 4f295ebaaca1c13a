use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use super::checksum::{is_password_column, password_checksum};
use crate::core::{Column, GrantError, Result, Row, Value, find_column_index};
use crate::result::QueryResult;

/// Returns every global grant, sorted by its reconciliation key.
pub const USER_GRANTS_QUERY: &str = "SELECT * FROM mysql.user ORDER BY host, user";

/// Returns every database-scoped grant, sorted by its reconciliation key.
pub const DB_GRANTS_QUERY: &str = "SELECT * FROM mysql.db ORDER BY host, db, user";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantTableKind {
    User,
    Db,
}

impl GrantTableKind {
    pub const ALL: [GrantTableKind; 2] = [GrantTableKind::User, GrantTableKind::Db];

    pub fn key_columns(&self) -> &'static [&'static str] {
        match self {
            Self::User => &["Host", "User"],
            Self::Db => &["Host", "Db", "User"],
        }
    }

    pub fn query(&self) -> &'static str {
        match self {
            Self::User => USER_GRANTS_QUERY,
            Self::Db => DB_GRANTS_QUERY,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Db => "db",
        }
    }

    /// What one row of the table describes, for diagnostics.
    pub fn entry_noun(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Db => "db grant",
        }
    }
}

impl fmt::Display for GrantTableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Reconciliation key of a grant row. Ordering is lexicographic over
/// `(host, user)` or `(host, db, user)`.
///
/// Parts keep their `Value` so that NULL, `'NULL'`, `1` and `'1'` stay
/// distinct keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum GrantKey {
    User {
        host: Value,
        user: Value,
    },
    Db {
        host: Value,
        db: Value,
        user: Value,
    },
}

impl GrantKey {
    pub fn user(host: impl Into<Value>, user: impl Into<Value>) -> Self {
        Self::User {
            host: host.into(),
            user: user.into(),
        }
    }

    pub fn db(host: impl Into<Value>, db: impl Into<Value>, user: impl Into<Value>) -> Self {
        Self::Db {
            host: host.into(),
            db: db.into(),
            user: user.into(),
        }
    }

    fn from_parts(kind: GrantTableKind, mut parts: Vec<Value>) -> Self {
        let mut next = || parts.pop().unwrap_or(Value::Null);
        match kind {
            GrantTableKind::User => {
                let user = next();
                let host = next();
                Self::User { host, user }
            }
            GrantTableKind::Db => {
                let user = next();
                let db = next();
                let host = next();
                Self::Db { host, db, user }
            }
        }
    }
}

struct KeyPart<'a>(&'a Value);

impl fmt::Display for KeyPart<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Value::Null => write!(f, "NULL"),
            other => write!(f, "'{}'", other),
        }
    }
}

impl fmt::Display for GrantKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User { host, user } => write!(f, "{}@{}", KeyPart(user), KeyPart(host)),
            Self::Db { host, db, user } => write!(
                f,
                "{}@{} on {}",
                KeyPart(user),
                KeyPart(host),
                KeyPart(db)
            ),
        }
    }
}

/// A grant row split into its key and the remaining (non-key) values, in
/// column order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrantRecord {
    pub key: GrantKey,
    pub values: Vec<Value>,
}

/// One grant table as returned by a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantTable {
    kind: GrantTableKind,
    columns: Vec<Column>,
    rows: Vec<Row>,
}

impl GrantTable {
    pub fn new(kind: GrantTableKind, columns: Vec<Column>, rows: Vec<Row>) -> Self {
        Self {
            kind,
            columns,
            rows,
        }
    }

    pub fn from_result(kind: GrantTableKind, result: QueryResult) -> Self {
        Self::new(kind, result.columns, result.rows)
    }

    pub fn kind(&self) -> GrantTableKind {
        self.kind
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Positions of the key columns, in key order.
    pub fn key_positions(&self) -> Result<Vec<usize>> {
        self.kind
            .key_columns()
            .iter()
            .map(|name| {
                find_column_index(&self.columns, name).ok_or_else(|| {
                    GrantError::MissingKeyColumn {
                        table: self.kind.to_string(),
                        column: name.to_string(),
                    }
                })
            })
            .collect()
    }

    /// Names of the non-key columns, in column order.
    pub fn value_column_names(&self) -> Result<Vec<String>> {
        let keys = self.key_positions()?;
        Ok(self
            .columns
            .iter()
            .enumerate()
            .filter(|(i, _)| !keys.contains(i))
            .map(|(_, col)| col.name.clone())
            .collect())
    }

    /// Indexes the rows by reconciliation key.
    ///
    /// Two rows with the same key make the table malformed; they are never
    /// merged.
    pub fn records(&self) -> Result<BTreeMap<GrantKey, GrantRecord>> {
        let keys = self.key_positions()?;
        let mut records = BTreeMap::new();
        for (index, row) in self.rows.iter().enumerate() {
            if row.len() != self.columns.len() {
                return Err(GrantError::InputError(format!(
                    "row {} of {} table has {} values for {} columns",
                    index,
                    self.kind,
                    row.len(),
                    self.columns.len()
                )));
            }
            let parts = keys.iter().map(|pos| row[*pos].clone()).collect();
            let key = GrantKey::from_parts(self.kind, parts);
            let values = row
                .iter()
                .enumerate()
                .filter(|(i, _)| !keys.contains(i))
                .map(|(_, value)| value.clone())
                .collect();
            if records.contains_key(&key) {
                return Err(GrantError::DuplicateKey {
                    table: self.kind.to_string(),
                    key: key.to_string(),
                });
            }
            records.insert(key.clone(), GrantRecord { key, values });
        }
        Ok(records)
    }

    /// Keys of every row, with each key column looked up by name. A key
    /// column missing from the schema contributes NULL, so a renamed key
    /// column still yields keys that can be set against another table's.
    pub fn keys_by_name(&self) -> BTreeSet<GrantKey> {
        let positions: Vec<Option<usize>> = self
            .kind
            .key_columns()
            .iter()
            .map(|name| find_column_index(&self.columns, name))
            .collect();
        self.rows
            .iter()
            .map(|row| {
                let parts = positions
                    .iter()
                    .map(|pos| pos.and_then(|pos| row.get(pos)).cloned().unwrap_or(Value::Null))
                    .collect();
                GrantKey::from_parts(self.kind, parts)
            })
            .collect()
    }

    /// Copy of the table as a query result with credential columns replaced
    /// by their checksum.
    pub fn redacted(&self) -> QueryResult {
        let password_positions: Vec<usize> = self
            .columns
            .iter()
            .enumerate()
            .filter(|(_, col)| is_password_column(&col.name))
            .map(|(i, _)| i)
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .map(|(i, value)| {
                        if password_positions.contains(&i) {
                            Value::Text(format!("checksum:{:016x}", password_checksum(value)))
                        } else {
                            value.clone()
                        }
                    })
                    .collect()
            })
            .collect();
        QueryResult::new(self.columns.clone(), rows)
    }
}

/// Both grant tables of one node, captured during a single validation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantSnapshot {
    pub node_id: String,
    pub user: GrantTable,
    pub db: GrantTable,
}

impl GrantSnapshot {
    pub fn new(node_id: impl Into<String>, user: GrantTable, db: GrantTable) -> Self {
        Self {
            node_id: node_id.into(),
            user,
            db,
        }
    }

    pub fn table(&self, kind: GrantTableKind) -> &GrantTable {
        match kind {
            GrantTableKind::User => &self.user,
            GrantTableKind::Db => &self.db,
        }
    }

    /// Renders both tables with credentials replaced by checksums.
    pub fn render_redacted(&self) -> String {
        let mut out = format!("Grants of node '{}'\n", self.node_id);
        for kind in GrantTableKind::ALL {
            out.push_str(&format!("\n{} table:\n", kind));
            out.push_str(&self.table(kind).redacted().render());
        }
        out
    }
}
