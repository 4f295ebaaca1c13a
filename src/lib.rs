// ============================================================================
// shardperm: grant consistency validation for sharded database clusters
// ============================================================================

pub mod cluster;
pub mod core;
pub mod discovery;
pub mod grants;
pub mod result;
pub mod validation;

// Re-export main types for convenience
pub use core::{Column, ColumnType, GrantError, Result, Row, Value};
pub use result::QueryResult;

pub use cluster::fixture::{ClusterFixture, InMemoryCluster, NodeFixture, ShardFixture};
pub use cluster::{
    InMemoryNodeQuery, InMemoryTopology, NodeDescriptor, NodeQuery, NodeRole, ShardInfo,
    TopologyService, describe_roles,
};
pub use discovery::{DEFAULT_RETRY_DELAY, NodePicker};
pub use grants::{
    ChangedGrant, ColumnDifference, DB_GRANTS_QUERY, DiffResult, GrantFetcher, GrantKey,
    GrantRecord, GrantSnapshot, GrantTable, GrantTableKind, MalformedTable, SchemaMismatch,
    SnapshotSide, TableDiff, USER_GRANTS_QUERY, diff, diff_tables, password_checksum,
};
pub use validation::{GrantValidator, ShardReport, ValidationReport, ValidatorConfig};
