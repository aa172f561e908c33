/// Satisfied once every requested namespace has been claimed by at least one node.
///
/// Leadership claims are already backed by the consensus layer's own quorum,
/// so one claim per namespace is enough; no majority is needed here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceCoverage {
    namespaces: BTreeSet<Namespace>,
}

impl NamespaceCoverage {
    pub fn new(namespaces: BTreeSet<Namespace>) -> Self {
        Self { namespaces }
    }
}

impl TerminationPredicate<NodeId, BTreeSet<Namespace>> for NamespaceCoverage {
    fn is_satisfied(&self, state: &InProgressResponseState<NodeId, BTreeSet<Namespace>>) -> bool {
        let claimed = state
            .successful_values()
            .flat_map(|(_, namespaces)| namespaces.iter())
            .collect::<HashSet<_>>();
        self.namespaces.iter().all(|namespace| claimed.contains(namespace))
    }
}

/// Which nodes claimed leadership of each requested namespace at poll time.
///
/// Every requested namespace has an entry, possibly empty. Zero or several
/// claimants mean an election is in progress or the cluster is split; the
/// snapshot reports this and never picks a winner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeadershipSnapshot {
    claims: BTreeMap<Namespace, BTreeSet<NodeId>>,
    outcome: QuorumOutcome,
}

impl LeadershipSnapshot {
    /// Inverts per-node claim sets into namespace -> claiming nodes.
    ///
    /// Claims for namespaces outside `requested` are ignored.
    pub fn from_responses(
        requested: &BTreeSet<Namespace>,
        state: &InProgressResponseState<NodeId, BTreeSet<Namespace>>,
        outcome: QuorumOutcome,
    ) -> Self {
        let mut claims = requested
            .iter()
            .map(|namespace| (namespace.clone(), BTreeSet::new()))
            .collect::<BTreeMap<_, _>>();
        for (node, claimed) in state.successful_values() {
            for namespace in claimed {
                if let Some(claimants) = claims.get_mut(namespace) {
                    claimants.insert(node.clone());
                }
            }
        }
        Self { claims, outcome }
    }

    pub fn claims(&self) -> &BTreeMap<Namespace, BTreeSet<NodeId>> {
        &self.claims
    }

    /// How the underlying fan-out ended. Anything other than `Satisfied`
    /// means at least one namespace went unclaimed.
    pub fn outcome(&self) -> QuorumOutcome {
        self.outcome
    }

    pub fn leaders_for(&self, namespace: &str) -> Option<&BTreeSet<NodeId>> {
        self.claims.get(namespace)
    }

    /// The only claimant of `namespace`.
    ///
    /// Fails with `LeadershipUnsettled` when there are zero or several claimants.
    pub fn single_leader(&self, namespace: &str) -> Result<&NodeId> {
        let claimants = self.claims.get(namespace).ok_or_else(|| {
            TimelockError::IllegalState(format!(
                "namespace '{}' was not part of the leadership query",
                namespace
            ))
        })?;
        match claimants.len() {
            1 => claimants.iter().next().ok_or_else(|| {
                TimelockError::LeadershipUnsettled(namespace.to_string(), 0)
            }),
            count => Err(TimelockError::LeadershipUnsettled(
                namespace.to_string(),
                count,
            )),
        }
    }

    /// Namespaces with a claimant count other than one.
    pub fn unsettled(&self) -> impl Iterator<Item = (&Namespace, usize)> {
        self.claims
            .iter()
            .filter(|(_, claimants)| claimants.len() != 1)
            .map(|(namespace, claimants)| (namespace, claimants.len()))
    }

    pub fn is_settled(&self) -> bool {
        self.unsettled().next().is_none()
    }

    /// namespace -> leader, failing on the first unsettled namespace.
    pub fn single_leaders(&self) -> Result<BTreeMap<Namespace, NodeId>> {
        self.claims
            .keys()
            .map(|namespace| {
                self.single_leader(namespace)
                    .map(|leader| (namespace.clone(), leader.clone()))
            })
            .collect()
    }
}

/// Discovers which node leads each namespace with one quorum-checked fan-out.
pub struct NamespaceLeadershipResolver {
    membership: ClusterMembership,
    pinger: Arc<dyn LeadershipPinger>,
    executors: NodeExecutors<NodeId>,
    quorum_deadline: Duration,
}

impl NamespaceLeadershipResolver {
    pub fn new(
        membership: ClusterMembership,
        pinger: Arc<dyn LeadershipPinger>,
        quorum_deadline: Duration,
    ) -> Self {
        Self {
            membership,
            pinger,
            executors: NodeExecutors::current(),
            quorum_deadline,
        }
    }

    /// Runs node pings on the given executors instead of the caller's runtime.
    pub fn with_executors(mut self, executors: NodeExecutors<NodeId>) -> Self {
        self.executors = executors;
        self
    }

    pub fn membership(&self) -> &ClusterMembership {
        &self.membership
    }

    /// Asks every node which of `namespaces` it leads and merges the answers.
    ///
    /// Returns as soon as every namespace has a claimant. When the deadline
    /// passes first, the snapshot still holds whatever was learned.
    pub async fn current_leaders<I, S>(&self, namespaces: I) -> Result<LeadershipSnapshot>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let requested = namespaces
            .into_iter()
            .map(Into::into)
            .collect::<BTreeSet<Namespace>>();
        let span = info_span!("timelock.leadership.resolve", namespaces = requested.len());

        async {
            let query = Arc::new(requested.clone());
            let pinger = self.pinger.clone();
            let result = collect_until(
                self.membership.all_nodes(),
                move |node: NodeId| {
                    let pinger = pinger.clone();
                    let query = query.clone();
                    async move { pinger.ping(&node, &query).await }
                },
                &self.executors,
                self.quorum_deadline,
                NamespaceCoverage::new(requested.clone()),
            )
            .await?;

            let snapshot =
                LeadershipSnapshot::from_responses(&requested, result.state(), result.outcome());
            for (namespace, claimants) in snapshot.unsettled() {
                event!(
                    Level::WARN,
                    namespace = %namespace,
                    claimants,
                    "namespace leadership unsettled"
                );
            }
            Ok(snapshot)
        }
        .instrument(span)
        .await
    }

    /// The single leader of `namespace`.
    pub async fn current_leader_for(&self, namespace: &str) -> Result<NodeId> {
        let snapshot = self.current_leaders([namespace]).await?;
        snapshot.single_leader(namespace).cloned()
    }

    /// For each namespace, every member except its leader.
    ///
    /// Fails with `LeadershipUnsettled` if any namespace lacks exactly one leader.
    pub async fn non_leaders<I, S>(
        &self,
        namespaces: I,
    ) -> Result<BTreeMap<Namespace, BTreeSet<NodeId>>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let snapshot = self.current_leaders(namespaces).await?;
        let leaders = snapshot.single_leaders()?;
        Ok(leaders
            .into_iter()
            .map(|(namespace, leader)| {
                let others = self.membership.others(&leader);
                (namespace, others)
            })
            .collect())
    }
}
