/// Canned state for one node of the in-memory cluster.
#[derive(Clone)]
struct InMemoryNode {
    results: HashMap<String, QueryResult>,
    reachable: bool,
    latency: Option<Duration>,
}

/// An in-memory implementation of `NodeQuery`.
///
/// Each node answers a fixed map of query text to result. Nodes can be made
/// unreachable or slow, and every `fetch_query` call is counted.
#[derive(Clone, Default)]
pub struct InMemoryNodeQuery {
    nodes: Arc<Mutex<HashMap<String, InMemoryNode>>>,
    fetches: Arc<Mutex<HashMap<String, usize>>>,
}

impl InMemoryNodeQuery {
    /// Creates a new, empty node set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a node with its canned query results. Re-registering
    /// replaces the previous results.
    pub async fn register_node(
        &self,
        node_id: impl Into<String>,
        results: HashMap<String, QueryResult>,
    ) -> Result<()> {
        let node_id = node_id.into();
        if node_id.trim().is_empty() {
            return Err(GrantError::TopologyError(
                "node_id must not be empty".to_string(),
            ));
        }
        let mut nodes = self.nodes.lock().await;
        nodes.insert(
            node_id,
            InMemoryNode {
                results,
                reachable: true,
                latency: None,
            },
        );
        Ok(())
    }

    /// Replaces the result a node returns for one query.
    pub async fn set_query_result(
        &self,
        node_id: &str,
        query: impl Into<String>,
        result: QueryResult,
    ) -> Result<()> {
        let mut nodes = self.nodes.lock().await;
        let node = nodes.get_mut(node_id).ok_or_else(|| not_registered(node_id))?;
        node.results.insert(query.into(), result);
        Ok(())
    }

    /// Toggles whether the node answers probes and queries.
    pub async fn set_reachable(&self, node_id: &str, reachable: bool) -> Result<()> {
        let mut nodes = self.nodes.lock().await;
        let node = nodes.get_mut(node_id).ok_or_else(|| not_registered(node_id))?;
        node.reachable = reachable;
        Ok(())
    }

    /// Adds an artificial delay to every query the node answers.
    pub async fn set_latency(&self, node_id: &str, latency: Option<Duration>) -> Result<()> {
        let mut nodes = self.nodes.lock().await;
        let node = nodes.get_mut(node_id).ok_or_else(|| not_registered(node_id))?;
        node.latency = latency;
        Ok(())
    }

    /// Number of `fetch_query` calls made against the node.
    pub async fn fetch_count(&self, node_id: &str) -> usize {
        let fetches = self.fetches.lock().await;
        fetches.get(node_id).copied().unwrap_or_default()
    }

    /// Number of `fetch_query` calls made against any node.
    pub async fn total_fetches(&self) -> usize {
        let fetches = self.fetches.lock().await;
        fetches.values().sum()
    }

    async fn node(&self, node_id: &str) -> Result<InMemoryNode> {
        let nodes = self.nodes.lock().await;
        nodes.get(node_id).cloned().ok_or_else(|| not_registered(node_id))
    }
}

fn not_registered(node_id: &str) -> GrantError {
    GrantError::fetch(node_id, "node is not registered")
}

#[async_trait]
impl NodeQuery for InMemoryNodeQuery {
    async fn fetch_query(&self, node: &NodeDescriptor, query: &str) -> Result<QueryResult> {
        {
            let mut fetches = self.fetches.lock().await;
            *fetches.entry(node.id.clone()).or_default() += 1;
        }

        let peer = self.node(&node.id).await?;
        if let Some(latency) = peer.latency {
            tokio::time::sleep(latency).await;
        }
        if !peer.reachable {
            return Err(GrantError::fetch(&node.id, "connection refused"));
        }
        peer.results
            .get(query)
            .cloned()
            .ok_or_else(|| GrantError::fetch(&node.id, format!("unexpected query: {}", query)))
    }

    async fn probe(&self, node: &NodeDescriptor) -> Result<()> {
        let peer = self.node(&node.id).await?;
        if !peer.reachable {
            return Err(GrantError::fetch(&node.id, "connection refused"));
        }
        Ok(())
    }
}
