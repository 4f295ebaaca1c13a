#[derive(Debug, Clone, Default)]
struct InMemoryShard {
    primary: Option<String>,
    nodes: BTreeMap<String, NodeDescriptor>,
}

/// An in-memory implementation of `TopologyService`.
///
/// Keyspaces and shards are created implicitly when the first node
/// registers, or explicitly with `add_shard`.
#[derive(Clone, Default)]
pub struct InMemoryTopology {
    keyspaces: Arc<Mutex<BTreeMap<String, BTreeMap<String, InMemoryShard>>>>,
}

impl InMemoryTopology {
    /// Creates a new, empty topology.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty shard (no nodes, no primary).
    pub async fn add_shard(&self, keyspace: &str, shard: &str) -> Result<()> {
        validate_name("keyspace", keyspace)?;
        validate_name("shard", shard)?;
        let mut keyspaces = self.keyspaces.lock().await;
        keyspaces
            .entry(keyspace.to_string())
            .or_default()
            .entry(shard.to_string())
            .or_default();
        Ok(())
    }

    /// Registers a node under its keyspace and shard.
    ///
    /// A node id may only be registered once across the whole topology.
    pub async fn register_node(&self, node: NodeDescriptor) -> Result<()> {
        validate_name("node_id", &node.id)?;
        validate_name("keyspace", &node.keyspace)?;
        validate_name("shard", &node.shard)?;

        let mut keyspaces = self.keyspaces.lock().await;
        let already_registered = keyspaces
            .values()
            .flat_map(|shards| shards.values())
            .any(|shard| shard.nodes.contains_key(&node.id));
        if already_registered {
            return Err(GrantError::TopologyError(format!(
                "node '{}' is already registered",
                node.id
            )));
        }

        keyspaces
            .entry(node.keyspace.clone())
            .or_default()
            .entry(node.shard.clone())
            .or_default()
            .nodes
            .insert(node.id.clone(), node);
        Ok(())
    }

    /// Removes a node. Returns true if the node was present.
    pub async fn unregister_node(&self, node_id: &str) -> bool {
        let mut keyspaces = self.keyspaces.lock().await;
        keyspaces
            .values_mut()
            .flat_map(|shards| shards.values_mut())
            .any(|shard| shard.nodes.remove(node_id).is_some())
    }

    /// Marks `node_id` as the designated primary of the shard.
    pub async fn set_shard_primary(&self, keyspace: &str, shard: &str, node_id: &str) -> Result<()> {
        validate_name("node_id", node_id)?;
        let mut keyspaces = self.keyspaces.lock().await;
        let entry = keyspaces
            .get_mut(keyspace)
            .and_then(|shards| shards.get_mut(shard))
            .ok_or_else(|| shard_not_found(keyspace, shard))?;
        if !entry.nodes.contains_key(node_id) {
            return Err(GrantError::TopologyError(format!(
                "node '{}' is not registered in shard {}/{}",
                node_id, keyspace, shard
            )));
        }
        entry.primary = Some(node_id.to_string());
        Ok(())
    }

    /// Clears the designated primary of the shard.
    pub async fn clear_shard_primary(&self, keyspace: &str, shard: &str) -> Result<()> {
        let mut keyspaces = self.keyspaces.lock().await;
        let entry = keyspaces
            .get_mut(keyspace)
            .and_then(|shards| shards.get_mut(shard))
            .ok_or_else(|| shard_not_found(keyspace, shard))?;
        entry.primary = None;
        Ok(())
    }
}

fn validate_name(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GrantError::TopologyError(format!(
            "{} must not be empty",
            what
        )));
    }
    Ok(())
}

fn shard_not_found(keyspace: &str, shard: &str) -> GrantError {
    GrantError::TopologyError(format!("shard {}/{} not found", keyspace, shard))
}

#[async_trait]
impl TopologyService for InMemoryTopology {
    async fn list_shards(&self, keyspace: &str) -> Result<Vec<String>> {
        let keyspaces = self.keyspaces.lock().await;
        let shards = keyspaces.get(keyspace).ok_or_else(|| {
            GrantError::TopologyError(format!("keyspace '{}' not found", keyspace))
        })?;
        Ok(shards.keys().cloned().collect())
    }

    async fn get_shard_info(&self, keyspace: &str, shard: &str) -> Result<ShardInfo> {
        let keyspaces = self.keyspaces.lock().await;
        let entry = keyspaces
            .get(keyspace)
            .and_then(|shards| shards.get(shard))
            .ok_or_else(|| shard_not_found(keyspace, shard))?;
        Ok(ShardInfo {
            keyspace: keyspace.to_string(),
            shard: shard.to_string(),
            primary: entry.primary.clone(),
        })
    }

    async fn list_nodes(&self, keyspace: &str, shard: &str) -> Result<Vec<NodeDescriptor>> {
        let keyspaces = self.keyspaces.lock().await;
        let entry = keyspaces
            .get(keyspace)
            .and_then(|shards| shards.get(shard))
            .ok_or_else(|| shard_not_found(keyspace, shard))?;
        Ok(entry.nodes.values().cloned().collect())
    }

    async fn get_node(&self, node_id: &str) -> Result<NodeDescriptor> {
        let keyspaces = self.keyspaces.lock().await;
        keyspaces
            .values()
            .flat_map(|shards| shards.values())
            .find_map(|shard| shard.nodes.get(node_id).cloned())
            .ok_or_else(|| GrantError::TopologyError(format!("node '{}' not found", node_id)))
    }
}
