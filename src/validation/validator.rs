use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::Semaphore;
use tokio::time::{Instant, timeout_at};
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

use super::config::ValidatorConfig;
use super::report::{ShardReport, ValidationReport};
use crate::cluster::{NodeDescriptor, NodeQuery, NodeRole, TopologyService};
use crate::core::{GrantError, Result};
use crate::discovery::NodePicker;
use crate::grants::{DiffResult, GrantFetcher, GrantSnapshot, diff};

/// Cross-checks the grant tables of every node in a keyspace against the
/// primary of its shard.
///
/// Shards are validated concurrently and candidates within a shard are
/// fetched concurrently; the total number of fetches in flight is bounded by
/// `ValidatorConfig::max_concurrency`. Every wait is bounded by the run
/// deadline, and dropping the returned future cancels all outstanding work.
pub struct GrantValidator {
    topology: Arc<dyn TopologyService>,
    picker: NodePicker,
    fetcher: GrantFetcher,
    config: ValidatorConfig,
}

impl GrantValidator {
    pub fn new(
        topology: Arc<dyn TopologyService>,
        nodes: Arc<dyn NodeQuery>,
        config: ValidatorConfig,
    ) -> Result<Self> {
        config.validate()?;
        let picker = NodePicker::new(
            topology.clone(),
            nodes.clone(),
            config.retry_delay_duration(),
        );
        Ok(Self {
            topology,
            picker,
            fetcher: GrantFetcher::new(nodes),
            config,
        })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    pub fn picker(&self) -> &NodePicker {
        &self.picker
    }

    fn deadline(&self) -> Instant {
        Instant::now() + self.config.timeout_duration()
    }

    /// Fetches the grant snapshot of a single node.
    pub async fn get_permissions(&self, node_id: &str) -> Result<GrantSnapshot> {
        let node = self.topology.get_node(node_id).await?;
        fetch_before(&self.fetcher, &node, self.deadline()).await
    }

    /// Fetches the grant snapshot of any reachable node of the shard whose
    /// role is in `roles`.
    pub async fn fetch_from_shard(
        &self,
        keyspace: &str,
        shard: &str,
        roles: &[NodeRole],
    ) -> Result<GrantSnapshot> {
        let deadline = self.deadline();
        let node = self.picker.pick(keyspace, shard, roles, deadline).await?;
        fetch_before(&self.fetcher, &node, deadline).await
    }

    /// Validates every shard of `keyspace`, or only the shards named in
    /// `shard_filter` when it is not empty.
    ///
    /// A filter naming an unknown shard fails before any node is contacted.
    /// Any finding turns the result into `GrantError::Inconsistent`, which
    /// carries the full report.
    pub async fn validate_keyspace(
        &self,
        keyspace: &str,
        shard_filter: &[String],
    ) -> Result<ValidationReport> {
        let shards = self.topology.list_shards(keyspace).await?;
        let targets = select_shards(keyspace, &shards, shard_filter)?;
        self.run(keyspace, targets).await
    }

    /// Validates a single shard.
    pub async fn validate_shard(&self, keyspace: &str, shard: &str) -> Result<ValidationReport> {
        self.validate_keyspace(keyspace, &[shard.to_string()]).await
    }

    async fn run(&self, keyspace: &str, shards: Vec<String>) -> Result<ValidationReport> {
        let run_id = Uuid::new_v4();
        let span = info_span!("grants.validate", run_id = %run_id, keyspace = %keyspace);
        let deadline = self.deadline();
        let permits = Semaphore::new(self.config.max_concurrency);

        let report = async {
            event!(Level::INFO, shards = shards.len(), "grant validation started");
            let outcomes = join_all(shards.iter().map(|shard| {
                self.validate_one_shard(keyspace, shard, deadline, &permits)
                    .instrument(info_span!("grants.shard", shard = %shard))
            }))
            .await;

            let mut report = ValidationReport::new(keyspace);
            for (shard, (shard_report, nodes)) in shards.into_iter().zip(outcomes) {
                report.record_shard(shard, shard_report, nodes);
            }
            event!(
                Level::INFO,
                shards_checked = report.shards_checked,
                nodes_checked = report.nodes_checked,
                consistent = report.is_consistent(),
                "grant validation finished"
            );
            report
        }
        .instrument(span)
        .await;

        if report.is_consistent() {
            Ok(report)
        } else {
            Err(GrantError::Inconsistent(Box::new(report)))
        }
    }

    /// Returns the shard's findings and the number of nodes whose snapshot
    /// was fetched.
    async fn validate_one_shard(
        &self,
        keyspace: &str,
        shard: &str,
        deadline: Instant,
        permits: &Semaphore,
    ) -> (ShardReport, usize) {
        let mut report = ShardReport::default();

        let primary_id = match self.topology.get_shard_info(keyspace, shard).await {
            Ok(info) => match info.primary {
                Some(primary) => primary,
                None => {
                    report.shard_error = Some(GrantError::NoPrimary {
                        keyspace: keyspace.to_string(),
                        shard: shard.to_string(),
                    });
                    return (report, 0);
                }
            },
            Err(err) => {
                report.shard_error = Some(err);
                return (report, 0);
            }
        };
        report.reference = Some(primary_id.clone());

        let reference = match self
            .picker
            .await_node(keyspace, shard, &primary_id, deadline)
            .await
        {
            Ok(node) => fetch_bounded(&self.fetcher, &node, deadline, permits).await,
            Err(err) => Err(err),
        };
        let reference = match reference {
            Ok(snapshot) => snapshot,
            Err(err) => {
                event!(Level::WARN, node = %primary_id, error = %err, "reference snapshot unavailable");
                report.shard_error = Some(err);
                return (report, 0);
            }
        };

        // The primary is always listed and reachable at this point, so
        // polling for any role returns promptly even in single-node shards.
        let candidates: Vec<NodeDescriptor> =
            match self.picker.pick_all(keyspace, shard, &[], deadline).await {
                Ok(nodes) => nodes
                    .into_iter()
                    .filter(|node| node.id != primary_id)
                    .filter(|node| {
                        let roles = &self.config.candidate_roles;
                        roles.is_empty() || roles.contains(&node.role)
                    })
                    .collect(),
                Err(err) => {
                    report.shard_error = Some(err);
                    return (report, 1);
                }
            };

        let outcomes = join_all(candidates.iter().map(|candidate| {
            let reference = &reference;
            async move {
                let outcome = self
                    .compare_candidate(keyspace, shard, candidate, reference, deadline, permits)
                    .await;
                (candidate.id.clone(), outcome)
            }
        }))
        .await;

        let mut fetched = 1;
        for (node, outcome) in outcomes {
            match outcome {
                Ok(result) => {
                    fetched += 1;
                    if !result.is_empty() {
                        event!(Level::WARN, node = %node, "grant divergence detected");
                        report.diffs.insert(node, result);
                    }
                }
                Err(err) => {
                    event!(Level::WARN, node = %node, error = %err, "candidate snapshot unavailable");
                    report.node_errors.insert(node, err);
                }
            }
        }
        (report, fetched)
    }

    async fn compare_candidate(
        &self,
        keyspace: &str,
        shard: &str,
        candidate: &NodeDescriptor,
        reference: &GrantSnapshot,
        deadline: Instant,
        permits: &Semaphore,
    ) -> Result<DiffResult> {
        let node = self
            .picker
            .await_node(keyspace, shard, &candidate.id, deadline)
            .await?;
        let snapshot = fetch_bounded(&self.fetcher, &node, deadline, permits).await?;
        Ok(diff(reference, &snapshot))
    }
}

/// Resolves the shards to validate, rejecting filter entries that are not
/// part of the keyspace.
fn select_shards(keyspace: &str, shards: &[String], filter: &[String]) -> Result<Vec<String>> {
    if filter.is_empty() {
        return Ok(shards.to_vec());
    }
    let known: BTreeSet<&String> = shards.iter().collect();
    let requested: BTreeSet<&String> = filter.iter().collect();
    let unknown: Vec<&str> = requested
        .iter()
        .filter(|shard| !known.contains(*shard))
        .map(|shard| shard.as_str())
        .collect();
    if !unknown.is_empty() {
        return Err(GrantError::InputError(format!(
            "shard(s) {} not found in keyspace '{}'",
            unknown.join(", "),
            keyspace
        )));
    }
    Ok(requested.into_iter().cloned().collect())
}

async fn fetch_before(
    fetcher: &GrantFetcher,
    node: &NodeDescriptor,
    deadline: Instant,
) -> Result<GrantSnapshot> {
    timeout_at(deadline, fetcher.fetch_grants(node))
        .await
        .map_err(|_| GrantError::fetch(&node.id, "deadline exceeded while fetching grants"))?
}

async fn fetch_bounded(
    fetcher: &GrantFetcher,
    node: &NodeDescriptor,
    deadline: Instant,
    permits: &Semaphore,
) -> Result<GrantSnapshot> {
    let _permit = timeout_at(deadline, permits.acquire())
        .await
        .map_err(|_| GrantError::fetch(&node.id, "deadline exceeded waiting for a fetch slot"))?
        .map_err(|_| GrantError::fetch(&node.id, "fetch slots closed"))?;
    fetch_before(fetcher, node, deadline).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_select_shards_without_filter_returns_all() {
        let shards = names(&["-80", "80-"]);
        assert_eq!(select_shards("ks", &shards, &[]).unwrap(), shards);
    }

    #[test]
    fn test_select_shards_dedupes_filter() {
        let shards = names(&["-80", "80-"]);
        let selected = select_shards("ks", &shards, &names(&["80-", "80-"])).unwrap();
        assert_eq!(selected, names(&["80-"]));
    }

    #[test]
    fn test_select_shards_rejects_unknown() {
        let shards = names(&["-80", "80-"]);
        let err = select_shards("ks", &shards, &names(&["-80", "c0-"])).unwrap_err();
        assert!(matches!(err, GrantError::InputError(_)));
        assert!(err.to_string().contains("c0-"));
    }
}
