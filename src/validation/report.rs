use std::collections::BTreeMap;
use std::fmt;

use crate::core::GrantError;
use crate::grants::{ColumnDifference, DiffResult, SnapshotSide, TableDiff};

/// Findings for one shard. Only candidates with at least one finding are
/// kept in `diffs`.
#[derive(Debug, Default)]
pub struct ShardReport {
    /// The primary every other node was compared against.
    pub reference: Option<String>,
    /// Failure that prevented any comparison in this shard.
    pub shard_error: Option<GrantError>,
    pub diffs: BTreeMap<String, DiffResult>,
    pub node_errors: BTreeMap<String, GrantError>,
}

impl ShardReport {
    pub fn is_empty(&self) -> bool {
        self.shard_error.is_none() && self.diffs.is_empty() && self.node_errors.is_empty()
    }

    /// One line per finding, without the shard prefix.
    pub fn findings(&self) -> Vec<String> {
        let mut lines = Vec::new();
        if let Some(err) = &self.shard_error {
            lines.push(err.to_string());
        }
        let reference = self.reference.as_deref().unwrap_or("<unknown>");
        for (node, diff) in &self.diffs {
            for table in diff.tables() {
                lines.extend(table_findings(reference, node, table));
            }
        }
        for (node, err) in &self.node_errors {
            lines.push(format!("{}: {}", node, err));
        }
        lines
    }
}

fn table_findings(reference: &str, node: &str, table: &TableDiff) -> Vec<String> {
    let mut lines = Vec::new();
    let noun = table.kind.entry_noun();

    if let Some(mismatch) = &table.schema_mismatch {
        let details: Vec<String> = mismatch.differences.iter().map(describe_column).collect();
        lines.push(format!(
            "{} has a different {} schema than {}: {}",
            node,
            table.kind,
            reference,
            details.join("; ")
        ));
        for key in &mismatch.missing_keys {
            lines.push(format!("{} is missing {} {}", node, noun, key));
        }
        for key in &mismatch.extra_keys {
            lines.push(format!("{} has an extra {} {}", node, noun, key));
        }
    }
    if let Some(malformed) = &table.malformed {
        let owner = match malformed.side {
            SnapshotSide::Reference => reference,
            SnapshotSide::Candidate => node,
        };
        lines.push(format!(
            "{} has a malformed {} table: {}",
            owner, table.kind, malformed.reason
        ));
    }
    for key in &table.missing {
        lines.push(format!("{} is missing {} {}", node, noun, key));
    }
    for key in &table.extra {
        lines.push(format!("{} has an extra {} {}", node, noun, key));
    }
    for changed in &table.changed {
        lines.push(format!(
            "{} has mismatched privileges for {} {}: {}",
            node,
            noun,
            changed.key,
            changed.columns.join(", ")
        ));
    }
    lines
}

fn describe_column(difference: &ColumnDifference) -> String {
    match (&difference.reference, &difference.candidate) {
        (Some(expected), Some(found)) => format!(
            "column {} is {}, expected {}",
            difference.position, found, expected
        ),
        (None, Some(found)) => format!("column {} {} is extra", difference.position, found),
        (Some(expected), None) => {
            format!("column {} {} is missing", difference.position, expected)
        }
        (None, None) => format!("column {} differs", difference.position),
    }
}

/// Outcome of validating a keyspace. An empty report means every compared
/// node agrees with its shard primary.
#[derive(Debug)]
pub struct ValidationReport {
    pub keyspace: String,
    pub shards_checked: usize,
    pub nodes_checked: usize,
    pub shards: BTreeMap<String, ShardReport>,
}

impl ValidationReport {
    pub fn new(keyspace: impl Into<String>) -> Self {
        Self {
            keyspace: keyspace.into(),
            shards_checked: 0,
            nodes_checked: 0,
            shards: BTreeMap::new(),
        }
    }

    /// Records a shard's outcome. Shards without findings are counted but
    /// not retained.
    pub fn record_shard(&mut self, shard: impl Into<String>, report: ShardReport, nodes: usize) {
        self.shards_checked += 1;
        self.nodes_checked += nodes;
        if !report.is_empty() {
            self.shards.insert(shard.into(), report);
        }
    }

    pub fn is_consistent(&self) -> bool {
        self.shards.values().all(ShardReport::is_empty)
    }

    pub fn shard(&self, shard: &str) -> Option<&ShardReport> {
        self.shards.get(shard)
    }

    /// Every finding, prefixed by `keyspace/shard`, in shard then node order.
    pub fn findings(&self) -> Vec<String> {
        self.shards
            .iter()
            .flat_map(|(shard, report)| {
                report
                    .findings()
                    .into_iter()
                    .map(move |line| format!("{}/{}: {}", self.keyspace, shard, line))
            })
            .collect()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let findings = self.findings();
        if findings.is_empty() {
            return write!(
                f,
                "keyspace '{}' is consistent ({} shard(s), {} node(s) checked)",
                self.keyspace, self.shards_checked, self.nodes_checked
            );
        }
        write!(
            f,
            "keyspace '{}' has {} grant inconsistencies:\n{}",
            self.keyspace,
            findings.len(),
            findings.join("\n")
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Column, ColumnType, Value};
    use crate::grants::{GrantKey, GrantTableKind, SchemaMismatch};

    fn empty_table(kind: GrantTableKind) -> TableDiff {
        TableDiff {
            kind,
            schema_mismatch: None,
            malformed: None,
            missing: Vec::new(),
            extra: Vec::new(),
            changed: Vec::new(),
        }
    }

    #[test]
    fn test_consistent_shards_are_not_retained() {
        let mut report = ValidationReport::new("commerce");
        report.record_shard("-80", ShardReport::default(), 2);
        report.record_shard("80-", ShardReport::default(), 3);
        assert!(report.is_consistent());
        assert!(report.shards.is_empty());
        assert_eq!(report.nodes_checked, 5);
        assert_eq!(
            report.to_string(),
            "keyspace 'commerce' is consistent (2 shard(s), 5 node(s) checked)"
        );
    }

    #[test]
    fn test_findings_name_node_and_kind() {
        let mut user = empty_table(GrantTableKind::User);
        user.extra.push(GrantKey::user("%", "intruder"));
        let mut db = empty_table(GrantTableKind::Db);
        db.missing.push(GrantKey::db("%", "orders", "app"));

        let mut shard = ShardReport {
            reference: Some("zone1-100".to_string()),
            ..ShardReport::default()
        };
        shard
            .diffs
            .insert("zone1-101".to_string(), DiffResult { user, db });

        let mut report = ValidationReport::new("commerce");
        report.record_shard("0", shard, 2);

        assert_eq!(
            report.findings(),
            vec![
                "commerce/0: zone1-101 has an extra user 'intruder'@'%'".to_string(),
                "commerce/0: zone1-101 is missing db grant 'app'@'%' on 'orders'".to_string(),
            ]
        );
        assert!(report.to_string().starts_with("keyspace 'commerce' has 2 grant inconsistencies"));
    }

    #[test]
    fn test_schema_finding_describes_columns() {
        let mut user = empty_table(GrantTableKind::User);
        user.schema_mismatch = Some(SchemaMismatch {
            reference_columns: 2,
            candidate_columns: 2,
            differences: vec![ColumnDifference {
                position: 0,
                reference: Some(Column::new("Host", ColumnType::Char)),
                candidate: Some(Column::new("Wrong", ColumnType::Char)),
            }],
            missing_keys: vec![GrantKey::user("%", "app")],
            extra_keys: vec![GrantKey::user(Value::Null, "app")],
        });
        let lines = table_findings("p", "r", &user);
        assert_eq!(
            lines,
            vec![
                "r has a different user schema than p: column 0 is `Wrong` (CHAR), expected `Host` (CHAR)"
                    .to_string(),
                "r is missing user 'app'@'%'".to_string(),
                "r has an extra user 'app'@NULL".to_string(),
            ]
        );
    }
}
