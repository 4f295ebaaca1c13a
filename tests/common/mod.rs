#![allow(dead_code)]

use shardperm::{
    Column, ColumnType, DB_GRANTS_QUERY, GrantSnapshot, GrantTable, GrantTableKind,
    InMemoryNodeQuery, InMemoryTopology, NodeDescriptor, NodeRole, QueryResult, Row,
    USER_GRANTS_QUERY, Value, ValidatorConfig,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

pub const KEYSPACE: &str = "commerce";

const USER_PRIVS: [&str; 6] = [
    "Select_priv",
    "Insert_priv",
    "Update_priv",
    "Delete_priv",
    "Grant_priv",
    "Super_priv",
];

const DB_PRIVS: [&str; 4] = ["Select_priv", "Insert_priv", "Update_priv", "Delete_priv"];

pub fn user_columns() -> Vec<Column> {
    let mut columns = vec![
        Column::new("Host", ColumnType::Char),
        Column::new("User", ColumnType::Char),
        Column::new("Password", ColumnType::Char),
    ];
    columns.extend(USER_PRIVS.iter().map(|name| Column::new(*name, ColumnType::Char)));
    columns.push(Column::new("max_questions", ColumnType::Int32));
    columns.push(Column::new("plugin", ColumnType::Char));
    columns.push(Column::new("authentication_string", ColumnType::Blob));
    columns
}

/// `privs` holds one 'Y'/'N' flag per privilege column.
pub fn user_row(host: &str, user: &str, privs: &str) -> Row {
    let mut row: Row = vec![
        host.into(),
        user.into(),
        format!("pw-{}", user).into(),
    ];
    row.extend(privs.chars().map(|c| Value::Text(c.to_string())));
    row.push(Value::Integer(0));
    row.push("mysql_native_password".into());
    row.push(Value::Text(String::new()));
    row
}

pub fn user_result() -> QueryResult {
    QueryResult::new(
        user_columns(),
        vec![
            user_row("test_host1", "test_user1", "YYYYYY"),
            user_row("test_host2", "test_user2", "YYYYYY"),
            user_row("test_host3", "test_user3", "YYYNYN"),
            user_row("test_host4", "test_user4", "NNNNNY"),
        ],
    )
}

pub fn db_columns() -> Vec<Column> {
    let mut columns = vec![
        Column::new("Host", ColumnType::Char),
        Column::new("Db", ColumnType::Char),
        Column::new("User", ColumnType::Char),
    ];
    columns.extend(DB_PRIVS.iter().map(|name| Column::new(*name, ColumnType::Char)));
    columns
}

pub fn db_row(host: &str, db: &str, user: &str, privs: &str) -> Row {
    let mut row: Row = vec![host.into(), db.into(), user.into()];
    row.extend(privs.chars().map(|c| Value::Text(c.to_string())));
    row
}

pub fn db_result() -> QueryResult {
    QueryResult::new(
        db_columns(),
        vec![db_row("test_host", "test_db", "test_user", "YYYN")],
    )
}

pub fn snapshot(node_id: &str, user: QueryResult, db: QueryResult) -> GrantSnapshot {
    GrantSnapshot::new(
        node_id,
        GrantTable::from_result(GrantTableKind::User, user),
        GrantTable::from_result(GrantTableKind::Db, db),
    )
}

pub fn grant_results(user: QueryResult, db: QueryResult) -> HashMap<String, QueryResult> {
    HashMap::from([
        (USER_GRANTS_QUERY.to_string(), user),
        (DB_GRANTS_QUERY.to_string(), db),
    ])
}

pub fn fast_config() -> ValidatorConfig {
    ValidatorConfig::new()
        .timeout(Duration::from_secs(5))
        .retry_delay(Duration::from_millis(5))
}

pub struct TestCluster {
    pub topology: Arc<InMemoryTopology>,
    pub nodes: Arc<InMemoryNodeQuery>,
}

impl TestCluster {
    pub fn new() -> Self {
        Self {
            topology: Arc::new(InMemoryTopology::new()),
            nodes: Arc::new(InMemoryNodeQuery::new()),
        }
    }

    /// Registers a node in the topology and gives it grant tables. Primaries
    /// become their shard's designated primary.
    pub async fn add_node(
        &self,
        id: &str,
        shard: &str,
        role: NodeRole,
        user: QueryResult,
        db: QueryResult,
    ) {
        self.topology
            .register_node(NodeDescriptor::new(id, KEYSPACE, shard, role))
            .await
            .unwrap();
        self.nodes
            .register_node(id, grant_results(user, db))
            .await
            .unwrap();
        if role == NodeRole::Primary {
            self.topology
                .set_shard_primary(KEYSPACE, shard, id)
                .await
                .unwrap();
        }
    }
}
