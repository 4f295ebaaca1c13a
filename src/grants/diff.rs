use serde::Serialize;

use super::snapshot::{GrantKey, GrantSnapshot, GrantTable, GrantTableKind};
use crate::core::Column;

/// Which snapshot of a pair a finding refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotSide {
    Reference,
    Candidate,
}

/// One position at which two column lists disagree. A `None` side means the
/// list on that side is shorter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDifference {
    pub position: usize,
    pub reference: Option<Column>,
    pub candidate: Option<Column>,
}

/// Column lists that disagree. Rows are not compared value by value, but
/// when a key column was renamed or dropped the keys no longer line up;
/// `missing_keys` and `extra_keys` hold the keys (key columns looked up by
/// name) found on only one side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaMismatch {
    pub reference_columns: usize,
    pub candidate_columns: usize,
    pub differences: Vec<ColumnDifference>,
    pub missing_keys: Vec<GrantKey>,
    pub extra_keys: Vec<GrantKey>,
}

/// A table that could not be indexed by key (duplicate key, missing key
/// column or ragged row).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MalformedTable {
    pub side: SnapshotSide,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChangedGrant {
    pub key: GrantKey,
    pub columns: Vec<String>,
}

/// Findings for one grant table of a (reference, candidate) pair.
///
/// When `schema_mismatch` or `malformed` is set the row-level lists are
/// always empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableDiff {
    pub kind: GrantTableKind,
    pub schema_mismatch: Option<SchemaMismatch>,
    pub malformed: Option<MalformedTable>,
    pub missing: Vec<GrantKey>,
    pub extra: Vec<GrantKey>,
    pub changed: Vec<ChangedGrant>,
}

impl TableDiff {
    fn new(kind: GrantTableKind) -> Self {
        Self {
            kind,
            schema_mismatch: None,
            malformed: None,
            missing: Vec::new(),
            extra: Vec::new(),
            changed: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.schema_mismatch.is_none()
            && self.malformed.is_none()
            && self.missing.is_empty()
            && self.extra.is_empty()
            && self.changed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DiffResult {
    pub user: TableDiff,
    pub db: TableDiff,
}

impl DiffResult {
    pub fn is_empty(&self) -> bool {
        self.user.is_empty() && self.db.is_empty()
    }

    pub fn tables(&self) -> [&TableDiff; 2] {
        [&self.user, &self.db]
    }
}

/// Compares a candidate node's grants against the reference node's.
pub fn diff(reference: &GrantSnapshot, candidate: &GrantSnapshot) -> DiffResult {
    DiffResult {
        user: diff_tables(&reference.user, &candidate.user),
        db: diff_tables(&reference.db, &candidate.db),
    }
}

/// Compares one grant table.
///
/// Rows are only compared once both column lists are identical; values are
/// then compared positionally.
pub fn diff_tables(reference: &GrantTable, candidate: &GrantTable) -> TableDiff {
    let mut result = TableDiff::new(reference.kind());

    if let Some(mut mismatch) = compare_schemas(reference.columns(), candidate.columns()) {
        let reference_keys = reference.keys_by_name();
        let candidate_keys = candidate.keys_by_name();
        mismatch.missing_keys = reference_keys.difference(&candidate_keys).cloned().collect();
        mismatch.extra_keys = candidate_keys.difference(&reference_keys).cloned().collect();
        result.schema_mismatch = Some(mismatch);
        return result;
    }

    let reference_records = match reference.records() {
        Ok(records) => records,
        Err(err) => {
            result.malformed = Some(MalformedTable {
                side: SnapshotSide::Reference,
                reason: err.to_string(),
            });
            return result;
        }
    };
    let candidate_records = match candidate.records() {
        Ok(records) => records,
        Err(err) => {
            result.malformed = Some(MalformedTable {
                side: SnapshotSide::Candidate,
                reason: err.to_string(),
            });
            return result;
        }
    };
    // Both schemas are identical and the key columns were found above.
    let value_columns = reference.value_column_names().unwrap_or_default();

    for (key, record) in &reference_records {
        match candidate_records.get(key) {
            None => result.missing.push(key.clone()),
            Some(other) => {
                let columns: Vec<String> = record
                    .values
                    .iter()
                    .zip(&other.values)
                    .zip(&value_columns)
                    .filter(|((a, b), _)| a != b)
                    .map(|(_, name)| name.clone())
                    .collect();
                if !columns.is_empty() {
                    result.changed.push(ChangedGrant {
                        key: key.clone(),
                        columns,
                    });
                }
            }
        }
    }
    result.extra = candidate_records
        .keys()
        .filter(|key| !reference_records.contains_key(*key))
        .cloned()
        .collect();

    result
}

fn compare_schemas(reference: &[Column], candidate: &[Column]) -> Option<SchemaMismatch> {
    let width = reference.len().max(candidate.len());
    let differences: Vec<ColumnDifference> = (0..width)
        .filter_map(|position| {
            let left = reference.get(position);
            let right = candidate.get(position);
            if left == right {
                return None;
            }
            Some(ColumnDifference {
                position,
                reference: left.cloned(),
                candidate: right.cloned(),
            })
        })
        .collect();

    if differences.is_empty() {
        return None;
    }
    Some(SchemaMismatch {
        reference_columns: reference.len(),
        candidate_columns: candidate.len(),
        differences,
        missing_keys: Vec::new(),
        extra_keys: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ColumnType, Row, Value};

    fn columns() -> Vec<Column> {
        vec![
            Column::new("Host", ColumnType::Char),
            Column::new("User", ColumnType::Char),
            Column::new("Select_priv", ColumnType::Char),
            Column::new("Insert_priv", ColumnType::Char),
        ]
    }

    fn row(host: &str, user: &str, select: &str, insert: &str) -> Row {
        vec![host.into(), user.into(), select.into(), insert.into()]
    }

    fn table(rows: Vec<Row>) -> GrantTable {
        GrantTable::new(GrantTableKind::User, columns(), rows)
    }

    #[test]
    fn test_identical_tables_have_no_findings() {
        let a = table(vec![row("%", "app", "Y", "N")]);
        assert!(diff_tables(&a, &a.clone()).is_empty());
    }

    #[test]
    fn test_changed_lists_differing_columns() {
        let a = table(vec![row("%", "app", "Y", "N")]);
        let b = table(vec![row("%", "app", "N", "Y")]);
        let result = diff_tables(&a, &b);
        assert_eq!(
            result.changed,
            vec![ChangedGrant {
                key: GrantKey::user("%", "app"),
                columns: vec!["Select_priv".to_string(), "Insert_priv".to_string()],
            }]
        );
        assert!(result.missing.is_empty() && result.extra.is_empty());
    }

    #[test]
    fn test_type_change_is_a_schema_mismatch() {
        let a = table(vec![row("%", "app", "Y", "N")]);
        let mut changed = columns();
        changed[3] = Column::new("Insert_priv", ColumnType::Enum);
        let b = GrantTable::new(GrantTableKind::User, changed, vec![row("%", "other", "Y", "N")]);

        let result = diff_tables(&a, &b);
        let mismatch = result.schema_mismatch.unwrap();
        assert_eq!(mismatch.differences.len(), 1);
        assert_eq!(mismatch.differences[0].position, 3);
        assert!(result.extra.is_empty() && result.missing.is_empty());
    }

    #[test]
    fn test_extra_column_is_reported_as_count_difference() {
        let a = table(Vec::new());
        let mut wider = columns();
        wider.push(Column::new("is_role", ColumnType::Char));
        let b = GrantTable::new(GrantTableKind::User, wider, Vec::new());

        let mismatch = diff_tables(&a, &b).schema_mismatch.unwrap();
        assert_eq!(mismatch.reference_columns, 4);
        assert_eq!(mismatch.candidate_columns, 5);
        assert_eq!(mismatch.differences[0].reference, None);
    }

    #[test]
    fn test_duplicate_candidate_key_marks_table_malformed() {
        let a = table(vec![row("%", "app", "Y", "N")]);
        let b = table(vec![row("%", "app", "Y", "N"), row("%", "app", "N", "N")]);
        let result = diff_tables(&a, &b);
        let malformed = result.malformed.unwrap();
        assert_eq!(malformed.side, SnapshotSide::Candidate);
        assert!(malformed.reason.contains("Duplicate key"));
        assert!(result.changed.is_empty());
    }

    #[test]
    fn test_null_and_empty_values_differ() {
        let a = table(vec![vec!["%".into(), "app".into(), Value::Null, "N".into()]]);
        let b = table(vec![row("%", "app", "", "N")]);
        assert_eq!(diff_tables(&a, &b).changed[0].columns, vec!["Select_priv"]);
    }

    #[test]
    fn test_renamed_key_column_reports_unaligned_keys() {
        let a = table(vec![row("%", "app", "Y", "N")]);
        let mut renamed = columns();
        renamed[0] = Column::new("Wrong", ColumnType::Char);
        let b = GrantTable::new(GrantTableKind::User, renamed, vec![row("%", "app", "Y", "N")]);

        let result = diff_tables(&a, &b);
        let mismatch = result.schema_mismatch.unwrap();
        assert_eq!(mismatch.missing_keys, vec![GrantKey::user("%", "app")]);
        assert_eq!(mismatch.extra_keys, vec![GrantKey::user(Value::Null, "app")]);
        assert!(result.missing.is_empty() && result.extra.is_empty());
    }

    #[test]
    fn test_null_host_and_text_null_host_are_not_duplicates() {
        let a = table(vec![
            vec![Value::Null, "u".into(), "Y".into(), "N".into()],
            row("NULL", "u", "Y", "N"),
        ]);
        let result = diff_tables(&a, &a.clone());
        assert!(result.malformed.is_none());
        assert!(result.is_empty());
    }
}
