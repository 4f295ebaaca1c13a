/// Read access to the topology store: which shards a keyspace has, who
/// their primaries are and which nodes currently serve them.
///
/// Registration is asynchronous, so a freshly started node may be missing
/// from `list_nodes` for a while.
#[async_trait]
pub trait TopologyService: Send + Sync {
    /// Lists the shard names of a keyspace.
    async fn list_shards(&self, keyspace: &str) -> Result<Vec<String>>;

    /// Returns the shard record, including its designated primary.
    async fn get_shard_info(&self, keyspace: &str, shard: &str) -> Result<ShardInfo>;

    /// Lists the nodes currently registered for a shard.
    async fn list_nodes(&self, keyspace: &str, shard: &str) -> Result<Vec<NodeDescriptor>>;

    /// Resolves a node by id regardless of shard.
    async fn get_node(&self, node_id: &str) -> Result<NodeDescriptor>;
}

/// Query access to a node's embedded database engine.
#[async_trait]
pub trait NodeQuery: Send + Sync {
    /// Runs a parameter-free read query and returns columns in the order the
    /// node produced them.
    async fn fetch_query(&self, node: &NodeDescriptor, query: &str) -> Result<QueryResult>;

    /// Checks that the node accepts queries at all.
    async fn probe(&self, _node: &NodeDescriptor) -> Result<()> {
        Ok(())
    }
}
