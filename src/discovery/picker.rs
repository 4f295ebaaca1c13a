use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{Instant, sleep_until, timeout_at};
use tracing::{Level, event};

use crate::cluster::{NodeDescriptor, NodeQuery, NodeRole, TopologyService, describe_roles};
use crate::core::{GrantError, Result};

/// Delay between two topology polls when no eligible node is available.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Finds reachable nodes of a shard, polling the topology until one shows up
/// or the deadline passes.
///
/// Topology membership is eventually consistent, so a single lookup right
/// after a node starts may legitimately come back empty.
#[derive(Clone)]
pub struct NodePicker {
    topology: Arc<dyn TopologyService>,
    nodes: Arc<dyn NodeQuery>,
    retry_delay: Duration,
}

impl NodePicker {
    pub fn new(
        topology: Arc<dyn TopologyService>,
        nodes: Arc<dyn NodeQuery>,
        retry_delay: Duration,
    ) -> Self {
        Self {
            topology,
            nodes,
            retry_delay: retry_delay.max(Duration::from_millis(1)),
        }
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    /// Returns one reachable node of the shard whose role is in `roles`
    /// (an empty slice accepts every role). Nodes are tried in id order.
    pub async fn pick(
        &self,
        keyspace: &str,
        shard: &str,
        roles: &[NodeRole],
        deadline: Instant,
    ) -> Result<NodeDescriptor> {
        let wanted = format!("{} node", describe_roles(roles));
        self.poll(keyspace, shard, &wanted, deadline, || async move {
            for node in self.eligible(keyspace, shard, roles).await? {
                match self.nodes.probe(&node).await {
                    Ok(()) => return Ok(Some(node)),
                    Err(err) => {
                        event!(Level::DEBUG, node = %node.id, error = %err, "node probe failed")
                    }
                }
            }
            Ok(None)
        })
        .await
    }

    /// Returns every eligible node of the shard once at least one of them is
    /// reachable.
    ///
    /// Eligible nodes that failed their probe are still returned so that the
    /// caller can attribute a failure to each of them.
    pub async fn pick_all(
        &self,
        keyspace: &str,
        shard: &str,
        roles: &[NodeRole],
        deadline: Instant,
    ) -> Result<Vec<NodeDescriptor>> {
        let wanted = format!("{} node", describe_roles(roles));
        self.poll(keyspace, shard, &wanted, deadline, || async move {
            let eligible = self.eligible(keyspace, shard, roles).await?;
            let mut any_reachable = false;
            for node in &eligible {
                if self.nodes.probe(node).await.is_ok() {
                    any_reachable = true;
                    break;
                }
            }
            Ok(any_reachable.then_some(eligible))
        })
        .await
    }

    /// Waits until the node `node_id` is listed in the shard and reachable.
    pub async fn await_node(
        &self,
        keyspace: &str,
        shard: &str,
        node_id: &str,
        deadline: Instant,
    ) -> Result<NodeDescriptor> {
        let wanted = format!("node '{}'", node_id);
        self.poll(keyspace, shard, &wanted, deadline, || async move {
            let listed = self.topology.list_nodes(keyspace, shard).await?;
            let Some(node) = listed.into_iter().find(|node| node.id == node_id) else {
                return Ok(None);
            };
            match self.nodes.probe(&node).await {
                Ok(()) => Ok(Some(node)),
                Err(err) => {
                    event!(Level::DEBUG, node = %node.id, error = %err, "node probe failed");
                    Ok(None)
                }
            }
        })
        .await
    }

    async fn eligible(
        &self,
        keyspace: &str,
        shard: &str,
        roles: &[NodeRole],
    ) -> Result<Vec<NodeDescriptor>> {
        let mut nodes: Vec<NodeDescriptor> = self
            .topology
            .list_nodes(keyspace, shard)
            .await?
            .into_iter()
            .filter(|node| roles.is_empty() || roles.contains(&node.role))
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(nodes)
    }

    /// Runs `attempt` until it yields a value, sleeping `retry_delay` between
    /// cycles. Neither the attempt nor the sleep may run past `deadline`.
    async fn poll<T, F, Fut>(
        &self,
        keyspace: &str,
        shard: &str,
        wanted: &str,
        deadline: Instant,
        mut attempt: F,
    ) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<Option<T>>>,
    {
        let started = Instant::now();
        let mut cycle = 0u32;
        loop {
            cycle += 1;
            match timeout_at(deadline, attempt()).await {
                Ok(Ok(Some(found))) => return Ok(found),
                Ok(Ok(None)) => {}
                Ok(Err(err)) => {
                    event!(
                        Level::WARN,
                        keyspace,
                        shard,
                        cycle,
                        error = %err,
                        "topology lookup failed, retrying"
                    );
                }
                Err(_) => break,
            }

            let now = Instant::now();
            if now >= deadline {
                break;
            }
            event!(Level::DEBUG, keyspace, shard, cycle, wanted, "no eligible node yet");
            sleep_until((now + self.retry_delay).min(deadline)).await;
            if Instant::now() >= deadline {
                break;
            }
        }

        Err(GrantError::DiscoveryTimeout {
            keyspace: keyspace.to_string(),
            shard: shard.to_string(),
            wanted: wanted.to_string(),
            waited_ms: started.elapsed().as_millis() as u64,
        })
    }
}
