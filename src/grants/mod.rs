//! Grant snapshots: fetching them from nodes and diffing them pairwise.

pub mod checksum;
pub mod diff;
pub mod fetcher;
pub mod snapshot;

pub use checksum::password_checksum;
pub use diff::{
    ChangedGrant, ColumnDifference, DiffResult, MalformedTable, SchemaMismatch, SnapshotSide,
    TableDiff, diff, diff_tables,
};
pub use fetcher::GrantFetcher;
pub use snapshot::{
    DB_GRANTS_QUERY, GrantKey, GrantRecord, GrantSnapshot, GrantTable, GrantTableKind,
    USER_GRANTS_QUERY,
};
