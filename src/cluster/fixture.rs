//! JSON description of a whole cluster, used to run validations offline
//! against captured grant tables.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{InMemoryNodeQuery, InMemoryTopology, NodeDescriptor, NodeRole};
use crate::core::{GrantError, Result};
use crate::grants::{DB_GRANTS_QUERY, USER_GRANTS_QUERY};
use crate::result::QueryResult;
use crate::validation::ValidatorConfig;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShardFixture {
    pub keyspace: String,
    pub shard: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeFixture {
    pub id: String,
    pub keyspace: String,
    pub shard: String,
    pub role: NodeRole,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default = "default_reachable")]
    pub reachable: bool,
    pub user: QueryResult,
    pub db: QueryResult,
}

fn default_reachable() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClusterFixture {
    #[serde(default)]
    pub validator: Option<ValidatorConfig>,
    /// Shards that exist even without nodes.
    #[serde(default)]
    pub shards: Vec<ShardFixture>,
    #[serde(default)]
    pub nodes: Vec<NodeFixture>,
}

/// In-memory collaborators built from a fixture.
#[derive(Clone)]
pub struct InMemoryCluster {
    pub topology: Arc<InMemoryTopology>,
    pub nodes: Arc<InMemoryNodeQuery>,
    pub validator: Option<ValidatorConfig>,
}

impl ClusterFixture {
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|err| {
            GrantError::IoError(format!("failed to read '{}': {}", path.display(), err))
        })?;
        Self::from_json(&json)
    }

    /// Registers every shard and node. A node with the primary role becomes
    /// its shard's designated primary; two primaries in one shard are
    /// rejected.
    pub async fn into_cluster(self) -> Result<InMemoryCluster> {
        let topology = InMemoryTopology::new();
        let nodes = InMemoryNodeQuery::new();

        for shard in &self.shards {
            topology.add_shard(&shard.keyspace, &shard.shard).await?;
        }

        let mut primaries: HashMap<(String, String), String> = HashMap::new();
        for node in self.nodes {
            let mut descriptor =
                NodeDescriptor::new(&node.id, &node.keyspace, &node.shard, node.role);
            if let Some(address) = node.address {
                descriptor = descriptor.with_address(address);
            }
            topology.register_node(descriptor).await?;

            let results = HashMap::from([
                (USER_GRANTS_QUERY.to_string(), node.user),
                (DB_GRANTS_QUERY.to_string(), node.db),
            ]);
            nodes.register_node(&node.id, results).await?;
            nodes.set_reachable(&node.id, node.reachable).await?;

            if node.role == NodeRole::Primary {
                let shard_key = (node.keyspace.clone(), node.shard.clone());
                if let Some(existing) = primaries.insert(shard_key, node.id.clone()) {
                    return Err(GrantError::ConfigError(format!(
                        "shard {}/{} lists two primaries: '{}' and '{}'",
                        node.keyspace, node.shard, existing, node.id
                    )));
                }
                topology
                    .set_shard_primary(&node.keyspace, &node.shard, &node.id)
                    .await?;
            }
        }

        Ok(InMemoryCluster {
            topology: Arc::new(topology),
            nodes: Arc::new(nodes),
            validator: self.validator,
        })
    }
}
