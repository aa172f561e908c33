/// The fixed set of nodes that make up the cluster.
///
/// Membership never changes after construction. Eviction only takes a node
/// out of service; it stays a member.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterMembership {
    nodes: BTreeSet<NodeId>,
}

impl ClusterMembership {
    /// Creates a membership set from a list of nodes.
    pub fn new<I, S>(nodes: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut members = BTreeSet::new();
        for node in nodes {
            let node_id = node.into();
            if node_id.trim().is_empty() {
                return Err(TimelockError::InvalidConfig(
                    "membership node_id must not be empty".to_string(),
                ));
            }
            members.insert(node_id);
        }
        if members.is_empty() {
            return Err(TimelockError::InvalidConfig(
                "membership must contain at least one node".to_string(),
            ));
        }
        Ok(Self { nodes: members })
    }

    /// Checks if a node is part of the cluster.
    pub fn contains(&self, node_id: &str) -> bool {
        self.nodes.contains(node_id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> &BTreeSet<NodeId> {
        &self.nodes
    }

    /// Returns a sorted list of all nodes.
    pub fn all_nodes(&self) -> Vec<NodeId> {
        self.nodes.iter().cloned().collect()
    }

    /// Every member except `node_id`.
    pub fn others(&self, node_id: &str) -> BTreeSet<NodeId> {
        self.nodes
            .iter()
            .filter(|node| node.as_str() != node_id)
            .cloned()
            .collect()
    }
}
