/// Role a node currently plays within its shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeRole {
    Primary,
    Replica,
    #[serde(rename = "rdonly")]
    RdOnly,
    Spare,
}

impl NodeRole {
    pub const ALL: [NodeRole; 4] = [
        NodeRole::Primary,
        NodeRole::Replica,
        NodeRole::RdOnly,
        NodeRole::Spare,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Primary => "primary",
            Self::Replica => "replica",
            Self::RdOnly => "rdonly",
            Self::Spare => "spare",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Renders a role set for log lines and error messages, e.g. `replica|rdonly`.
pub fn describe_roles(roles: &[NodeRole]) -> String {
    if roles.is_empty() {
        return "any".to_string();
    }
    roles
        .iter()
        .map(NodeRole::as_str)
        .collect::<Vec<_>>()
        .join("|")
}

/// A node as listed by the topology service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeDescriptor {
    pub id: String,
    pub keyspace: String,
    pub shard: String,
    pub role: NodeRole,
    #[serde(default)]
    pub address: String,
}

impl NodeDescriptor {
    pub fn new(
        id: impl Into<String>,
        keyspace: impl Into<String>,
        shard: impl Into<String>,
        role: NodeRole,
    ) -> Self {
        let id = id.into();
        Self {
            address: format!("{}:3306", id),
            id,
            keyspace: keyspace.into(),
            shard: shard.into(),
            role,
        }
    }

    pub fn with_address(mut self, address: impl Into<String>) -> Self {
        self.address = address.into();
        self
    }
}

/// Shard record held by the topology service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShardInfo {
    pub keyspace: String,
    pub shard: String,
    pub primary: Option<String>,
}
