/// How the simulated cluster elects after its leader is evicted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum ElectionPolicy {
    /// The next online node (in id order) takes over immediately.
    #[default]
    Rotate,
    /// An interim leader takes over, and the evicted node reclaims leadership
    /// as soon as it is restored.
    Sticky,
    /// Nobody takes over; the evicted node stays the recorded leader.
    Stalled,
}

#[derive(Debug, Clone)]
struct SimulatedNode {
    online: bool,
    ping_latency: Option<Duration>,
    evictions: usize,
    restorations: usize,
}

impl Default for SimulatedNode {
    fn default() -> Self {
        Self {
            online: true,
            ping_latency: None,
            evictions: 0,
            restorations: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
struct SimulatedNamespace {
    leader: Option<NodeId>,
    reclaim_by: Option<NodeId>,
    extra_claimants: BTreeSet<NodeId>,
    last_timestamp: u64,
}

#[derive(Debug)]
struct NetworkState {
    nodes: BTreeMap<NodeId, SimulatedNode>,
    namespaces: HashMap<Namespace, SimulatedNamespace>,
    policy: ElectionPolicy,
}

impl NetworkState {
    fn node_mut(&mut self, node_id: &str) -> Result<&mut SimulatedNode> {
        self.nodes.get_mut(node_id).ok_or_else(|| {
            TimelockError::ExecutionError(format!(
                "Simulated node '{}' is not registered",
                node_id
            ))
        })
    }

    fn check_online(&self, node_id: &str) -> Result<&SimulatedNode> {
        match self.nodes.get(node_id) {
            Some(node) if node.online => Ok(node),
            _ => Err(TimelockError::NodeUnavailable(node_id.to_string())),
        }
    }

    /// Elects a leader for a namespace seen for the first time, picking an
    /// online node by stable hash.
    fn ensure_leader(&mut self, namespace: &str) -> &mut SimulatedNamespace {
        let online = self
            .nodes
            .iter()
            .filter(|(_, node)| node.online)
            .map(|(id, _)| id)
            .collect::<Vec<_>>();
        let candidate = if online.is_empty() {
            None
        } else {
            Some(online[stable_bucket_for(namespace, online.len())].clone())
        };
        let entry = self.namespaces.entry(namespace.to_string()).or_default();
        if entry.leader.is_none() {
            entry.leader = candidate;
        }
        entry
    }

    fn next_online_after(&self, node_id: &str) -> Option<NodeId> {
        let after = self
            .nodes
            .range::<str, _>((Bound::Excluded(node_id), Bound::Unbounded));
        let before = self
            .nodes
            .range::<str, _>((Bound::Unbounded, Bound::Excluded(node_id)));
        after
            .chain(before)
            .find(|(_, node)| node.online)
            .map(|(id, _)| id.clone())
    }
}

/// A simulated cluster for tests and drills.
///
/// Implements the leadership query, the lifecycle signal, and the namespaced
/// timestamp transport. Leaders are elected lazily the first time a
/// namespace is mentioned to any node.
#[derive(Clone)]
pub struct InMemoryTimelockNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl InMemoryTimelockNetwork {
    /// Creates a network with every member online.
    pub fn new(membership: &ClusterMembership, policy: ElectionPolicy) -> Self {
        let nodes = membership
            .nodes()
            .iter()
            .map(|node| (node.clone(), SimulatedNode::default()))
            .collect();
        Self {
            state: Arc::new(Mutex::new(NetworkState {
                nodes,
                namespaces: HashMap::new(),
                policy,
            })),
        }
    }

    pub async fn set_election_policy(&self, policy: ElectionPolicy) {
        self.state.lock().await.policy = policy;
    }

    /// Delays every ping answered by `node_id`. `None` removes the delay.
    pub async fn set_ping_latency(&self, node_id: &str, latency: Option<Duration>) -> Result<()> {
        let mut state = self.state.lock().await;
        state.node_mut(node_id)?.ping_latency = latency;
        Ok(())
    }

    /// Makes `node_id` the leader of `namespace`, as if it won an election.
    pub async fn elect(&self, namespace: &str, node_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.node_mut(node_id)?;
        let entry = state.namespaces.entry(namespace.to_string()).or_default();
        entry.leader = Some(node_id.to_string());
        entry.reclaim_by = None;
        Ok(())
    }

    /// Makes `node_id` claim `namespace` in addition to the real leader.
    pub async fn inject_split_brain(&self, namespace: &str, node_id: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        state.node_mut(node_id)?;
        state.ensure_leader(namespace);
        if let Some(entry) = state.namespaces.get_mut(namespace) {
            entry.extra_claimants.insert(node_id.to_string());
        }
        Ok(())
    }

    pub async fn clear_split_brain(&self, namespace: &str) {
        let mut state = self.state.lock().await;
        if let Some(entry) = state.namespaces.get_mut(namespace) {
            entry.extra_claimants.clear();
        }
    }

    /// The recorded leader, without contacting any node.
    pub async fn leader_of(&self, namespace: &str) -> Option<NodeId> {
        let state = self.state.lock().await;
        state
            .namespaces
            .get(namespace)
            .and_then(|entry| entry.leader.clone())
    }

    pub async fn is_online(&self, node_id: &str) -> Result<bool> {
        let mut state = self.state.lock().await;
        Ok(state.node_mut(node_id)?.online)
    }

    /// Times `node_id` went from online to removed.
    pub async fn eviction_count(&self, node_id: &str) -> Result<usize> {
        let mut state = self.state.lock().await;
        Ok(state.node_mut(node_id)?.evictions)
    }

    /// Times `node_id` went from removed to online.
    pub async fn restoration_count(&self, node_id: &str) -> Result<usize> {
        let mut state = self.state.lock().await;
        Ok(state.node_mut(node_id)?.restorations)
    }
}

#[async_trait]
impl LeadershipPinger for InMemoryTimelockNetwork {
    async fn ping(
        &self,
        target_node: &str,
        namespaces: &BTreeSet<Namespace>,
    ) -> Result<BTreeSet<Namespace>> {
        let (latency, claimed) = {
            let mut state = self.state.lock().await;
            let latency = state.check_online(target_node)?.ping_latency;
            let mut claimed = BTreeSet::new();
            for namespace in namespaces {
                let entry = state.ensure_leader(namespace);
                if entry.leader.as_deref() == Some(target_node)
                    || entry.extra_claimants.contains(target_node)
                {
                    claimed.insert(namespace.clone());
                }
            }
            (latency, claimed)
        };
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        Ok(claimed)
    }
}

#[async_trait]
impl NodeLifecycle for InMemoryTimelockNetwork {
    async fn remove(&self, target_node: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let node = state.node_mut(target_node)?;
        if !node.online {
            return Ok(());
        }
        node.online = false;
        node.evictions += 1;

        let policy = state.policy;
        let successor = state.next_online_after(target_node);
        for entry in state.namespaces.values_mut() {
            if entry.leader.as_deref() != Some(target_node) {
                continue;
            }
            match policy {
                ElectionPolicy::Rotate => entry.leader = successor.clone(),
                ElectionPolicy::Sticky => {
                    entry.reclaim_by = Some(target_node.to_string());
                    entry.leader = successor.clone();
                }
                ElectionPolicy::Stalled => {}
            }
        }
        Ok(())
    }

    async fn restore(&self, target_node: &str) -> Result<()> {
        let mut state = self.state.lock().await;
        let node = state.node_mut(target_node)?;
        if node.online {
            return Ok(());
        }
        node.online = true;
        node.restorations += 1;

        for entry in state.namespaces.values_mut() {
            if entry.reclaim_by.as_deref() == Some(target_node) {
                entry.leader = Some(target_node.to_string());
                entry.reclaim_by = None;
            }
        }
        Ok(())
    }
}

#[async_trait]
impl NamespacedTransport for InMemoryTimelockNetwork {
    async fn fresh_timestamp(&self, target_node: &str, namespace: &str) -> Result<u64> {
        let mut state = self.state.lock().await;
        state.check_online(target_node)?;
        let entry = state.ensure_leader(namespace);
        if entry.leader.as_deref() != Some(target_node) {
            return Err(TimelockError::NotLeader(
                target_node.to_string(),
                namespace.to_string(),
            ));
        }
        entry.last_timestamp += 1;
        Ok(entry.last_timestamp)
    }
}
