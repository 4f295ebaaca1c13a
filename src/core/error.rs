use thiserror::Error;

use crate::validation::ValidationReport;

#[derive(Error, Debug)]
pub enum GrantError {
    #[error("Input error: {0}")]
    InputError(String),

    #[error("Discovery timeout: no reachable {wanted} in shard {keyspace}/{shard} after {waited_ms}ms")]
    DiscoveryTimeout {
        keyspace: String,
        shard: String,
        wanted: String,
        waited_ms: u64,
    },

    #[error("Fetch failure on node '{node}': {reason}")]
    FetchFailure { node: String, reason: String },

    #[error("Duplicate key {key} in {table} table")]
    DuplicateKey { table: String, key: String },

    #[error("Key column '{column}' missing from {table} table")]
    MissingKeyColumn { table: String, column: String },

    #[error("Shard {keyspace}/{shard} has no primary")]
    NoPrimary { keyspace: String, shard: String },

    #[error("Topology error: {0}")]
    TopologyError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("{0}")]
    Inconsistent(Box<ValidationReport>),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl GrantError {
    pub(crate) fn fetch(node: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FetchFailure {
            node: node.into(),
            reason: reason.into(),
        }
    }

    /// Returns the structured report when the error carries validation findings.
    pub fn report(&self) -> Option<&ValidationReport> {
        match self {
            Self::Inconsistent(report) => Some(report),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, GrantError>;

impl From<std::io::Error> for GrantError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<serde_json::Error> for GrantError {
    fn from(err: serde_json::Error) -> Self {
        Self::ConfigError(err.to_string())
    }
}
