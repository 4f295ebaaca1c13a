use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cluster::NodeRole;
use crate::core::{GrantError, Result};
use crate::discovery::DEFAULT_RETRY_DELAY;

/// Tunables of a validation run.
///
/// Every field has a default, so a partial JSON object is accepted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorConfig {
    /// Overall deadline of one run, covering discovery and every fetch.
    pub timeout_ms: u64,

    /// Pause between two topology polls while waiting for a node.
    pub retry_delay_ms: u64,

    /// Maximum number of node fetches in flight at once.
    pub max_concurrency: usize,

    /// Roles compared against the primary; empty accepts every role. The
    /// shard's designated primary itself is never a candidate.
    pub candidate_roles: Vec<NodeRole>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30_000,
            retry_delay_ms: DEFAULT_RETRY_DELAY.as_millis() as u64,
            max_concurrency: 8,
            candidate_roles: NodeRole::ALL.to_vec(),
        }
    }
}

impl ValidatorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the overall deadline
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the discovery retry delay
    pub fn retry_delay(mut self, delay: Duration) -> Self {
        self.retry_delay_ms = delay.as_millis() as u64;
        self
    }

    /// Set the fetch worker limit
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Set the roles compared against the primary
    pub fn candidate_roles(mut self, roles: Vec<NodeRole>) -> Self {
        self.candidate_roles = roles;
        self
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn retry_delay_duration(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_ms == 0 {
            return Err(GrantError::ConfigError(
                "timeout_ms must be >= 1".to_string(),
            ));
        }
        if self.retry_delay_ms == 0 {
            return Err(GrantError::ConfigError(
                "retry_delay_ms must be >= 1".to_string(),
            ));
        }
        if self.max_concurrency == 0 {
            return Err(GrantError::ConfigError(
                "max_concurrency must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_sets_fields() {
        let config = ValidatorConfig::new()
            .timeout(Duration::from_secs(2))
            .retry_delay(Duration::from_millis(5))
            .max_concurrency(3)
            .candidate_roles(vec![NodeRole::Replica]);
        assert_eq!(config.timeout_ms, 2_000);
        assert_eq!(config.retry_delay_duration(), Duration::from_millis(5));
        assert_eq!(config.max_concurrency, 3);
        assert_eq!(config.candidate_roles, vec![NodeRole::Replica]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: ValidatorConfig = serde_json::from_str(r#"{"retry_delay_ms": 5}"#).unwrap();
        assert_eq!(config.retry_delay_ms, 5);
        assert_eq!(config.timeout_ms, 30_000);
        assert_eq!(config.candidate_roles.len(), 4);
    }

    #[test]
    fn test_zero_concurrency_is_rejected() {
        let err = ValidatorConfig::new().max_concurrency(0).validate().unwrap_err();
        assert!(err.to_string().contains("max_concurrency"));
    }
}
