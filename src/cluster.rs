use crate::core::{GrantError, Result};
use crate::result::QueryResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

// Cluster collaborators are split by responsibility for easier navigation.
include!("cluster/types.rs");
include!("cluster/collaborators.rs");
include!("cluster/in_memory_topology.rs");
include!("cluster/in_memory_node_query.rs");

pub mod fixture;
