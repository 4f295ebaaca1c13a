use std::sync::Arc;

use tracing::{Level, event};

use super::snapshot::{GrantSnapshot, GrantTable, GrantTableKind};
use crate::cluster::{NodeDescriptor, NodeQuery};
use crate::core::{GrantError, Result};

/// Issues the two canonical grant queries against a node and packages the
/// answers as a `GrantSnapshot`.
#[derive(Clone)]
pub struct GrantFetcher {
    nodes: Arc<dyn NodeQuery>,
}

impl GrantFetcher {
    pub fn new(nodes: Arc<dyn NodeQuery>) -> Self {
        Self { nodes }
    }

    /// Fetches both grant tables of `node`.
    ///
    /// Column order is kept exactly as the node returned it. Any transport
    /// or shape problem is reported as `FetchFailure` for this node.
    pub async fn fetch_grants(&self, node: &NodeDescriptor) -> Result<GrantSnapshot> {
        let (user, db) = tokio::try_join!(
            self.fetch_table(node, GrantTableKind::User),
            self.fetch_table(node, GrantTableKind::Db)
        )?;
        event!(
            Level::DEBUG,
            node = %node.id,
            user_rows = user.row_count(),
            db_rows = db.row_count(),
            "grant snapshot fetched"
        );
        Ok(GrantSnapshot::new(node.id.clone(), user, db))
    }

    async fn fetch_table(&self, node: &NodeDescriptor, kind: GrantTableKind) -> Result<GrantTable> {
        let result = self
            .nodes
            .fetch_query(node, kind.query())
            .await
            .map_err(|err| match err {
                GrantError::FetchFailure { .. } => err,
                other => GrantError::fetch(&node.id, other.to_string()),
            })?;
        result.validate().map_err(|err| {
            GrantError::fetch(&node.id, format!("malformed {} table: {}", kind, err))
        })?;
        Ok(GrantTable::from_result(kind, result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::{InMemoryNodeQuery, NodeRole};
    use crate::core::{Column, ColumnType, Value};
    use crate::grants::{DB_GRANTS_QUERY, USER_GRANTS_QUERY};
    use crate::result::QueryResult;
    use std::collections::HashMap;

    fn results(user_rows: Vec<Vec<Value>>) -> HashMap<String, QueryResult> {
        let user = QueryResult::new(
            vec![
                Column::new("User", ColumnType::Char),
                Column::new("Host", ColumnType::Char),
            ],
            user_rows,
        );
        let db = QueryResult::new(
            vec![
                Column::new("Host", ColumnType::Char),
                Column::new("Db", ColumnType::Char),
                Column::new("User", ColumnType::Char),
            ],
            Vec::new(),
        );
        HashMap::from([
            (USER_GRANTS_QUERY.to_string(), user),
            (DB_GRANTS_QUERY.to_string(), db),
        ])
    }

    #[tokio::test]
    async fn test_fetch_preserves_column_order() {
        let nodes = InMemoryNodeQuery::new();
        nodes
            .register_node("n1", results(vec![vec!["app".into(), "%".into()]]))
            .await
            .unwrap();
        let fetcher = GrantFetcher::new(Arc::new(nodes.clone()));
        let node = NodeDescriptor::new("n1", "ks", "0", NodeRole::Replica);

        let snapshot = fetcher.fetch_grants(&node).await.unwrap();
        assert_eq!(snapshot.node_id, "n1");
        assert_eq!(snapshot.user.columns()[0].name, "User");
        assert_eq!(snapshot.user.row_count(), 1);
        assert_eq!(nodes.fetch_count("n1").await, 2);
    }

    #[tokio::test]
    async fn test_fetch_accepts_integer_columns_sent_as_text() {
        let mut results = results(Vec::new());
        let user = QueryResult::new(
            vec![
                Column::new("Host", ColumnType::Char),
                Column::new("User", ColumnType::Char),
                Column::new("max_questions", ColumnType::Int32),
            ],
            vec![vec!["%".into(), "app".into(), "0".into()]],
        );
        results.insert(USER_GRANTS_QUERY.to_string(), user);
        let nodes = InMemoryNodeQuery::new();
        nodes.register_node("n1", results).await.unwrap();
        let fetcher = GrantFetcher::new(Arc::new(nodes));
        let node = NodeDescriptor::new("n1", "ks", "0", NodeRole::Primary);

        let snapshot = fetcher.fetch_grants(&node).await.unwrap();
        assert_eq!(snapshot.user.rows()[0][2], Value::from("0"));
    }

    #[tokio::test]
    async fn test_fetch_rejects_malformed_rows() {
        let nodes = InMemoryNodeQuery::new();
        nodes
            .register_node("n1", results(vec![vec!["app".into()]]))
            .await
            .unwrap();
        let fetcher = GrantFetcher::new(Arc::new(nodes));
        let node = NodeDescriptor::new("n1", "ks", "0", NodeRole::Replica);

        let err = fetcher.fetch_grants(&node).await.unwrap_err();
        assert!(matches!(err, GrantError::FetchFailure { ref node, .. } if node == "n1"));
        assert!(err.to_string().contains("malformed user table"));
    }

    #[tokio::test]
    async fn test_fetch_from_unreachable_node_fails() {
        let nodes = InMemoryNodeQuery::new();
        nodes.register_node("n1", results(Vec::new())).await.unwrap();
        nodes.set_reachable("n1", false).await.unwrap();
        let fetcher = GrantFetcher::new(Arc::new(nodes));
        let node = NodeDescriptor::new("n1", "ks", "0", NodeRole::Replica);

        let err = fetcher.fetch_grants(&node).await.unwrap_err();
        assert!(err.to_string().contains("connection refused"));
    }
}
