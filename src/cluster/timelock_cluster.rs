/// A cluster of timelock nodes seen from the outside.
///
/// Bundles leadership resolution, forced failover, and per-namespace
/// routing over one fixed membership.
pub struct TimelockCluster {
    config: ClusterConfig,
    membership: ClusterMembership,
    resolver: Arc<NamespaceLeadershipResolver>,
    failover: FailoverController,
    router: NamespacedClientRouter,
    lifecycle: Arc<dyn NodeLifecycle>,
}

impl TimelockCluster {
    /// Creates a cluster from its configuration and external collaborators.
    pub fn new(
        config: ClusterConfig,
        pinger: Arc<dyn LeadershipPinger>,
        lifecycle: Arc<dyn NodeLifecycle>,
        transport: Arc<dyn NamespacedTransport>,
    ) -> Result<Self> {
        config.validate()?;
        let membership = ClusterMembership::new(config.nodes.clone())?;
        let resolver = Arc::new(NamespaceLeadershipResolver::new(
            membership.clone(),
            pinger,
            config.quorum.deadline(),
        ));
        let failover =
            FailoverController::new(resolver.clone(), lifecycle.clone(), config.failover.clone());
        let router = NamespacedClientRouter::new(
            membership.clone(),
            transport,
            config.max_namespaces,
            config.slow_call_log_trigger(),
        );
        Ok(Self {
            config,
            membership,
            resolver,
            failover,
            router,
            lifecycle,
        })
    }

    /// Creates a cluster backed by a simulated network, returning both.
    pub fn in_memory(
        config: ClusterConfig,
        policy: ElectionPolicy,
    ) -> Result<(Self, InMemoryTimelockNetwork)> {
        config.validate()?;
        let membership = ClusterMembership::new(config.nodes.clone())?;
        let network = InMemoryTimelockNetwork::new(&membership, policy);
        let shared = Arc::new(network.clone());
        let cluster = Self::new(config, shared.clone(), shared.clone(), shared)?;
        Ok((cluster, network))
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    pub fn membership(&self) -> &ClusterMembership {
        &self.membership
    }

    pub fn resolver(&self) -> &NamespaceLeadershipResolver {
        &self.resolver
    }

    pub fn router(&self) -> &NamespacedClientRouter {
        &self.router
    }

    pub async fn current_leaders<I, S>(&self, namespaces: I) -> Result<LeadershipSnapshot>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolver.current_leaders(namespaces).await
    }

    pub async fn current_leader_for(&self, namespace: &str) -> Result<NodeId> {
        self.resolver.current_leader_for(namespace).await
    }

    pub async fn non_leaders<I, S>(
        &self,
        namespaces: I,
    ) -> Result<BTreeMap<Namespace, BTreeSet<NodeId>>>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resolver.non_leaders(namespaces).await
    }

    pub async fn failover_to_new_leader(&self, namespace: &str) -> Result<FailoverReport> {
        self.failover.failover_to_new_leader(namespace).await
    }

    pub fn client(&self, namespace: &str) -> Result<Arc<NamespacedClient>> {
        self.router.client(namespace)
    }

    pub fn client_for_random_namespace(&self) -> Result<Arc<NamespacedClient>> {
        self.router.client_for_random_namespace()
    }

    /// Waits until every namespace serves a fresh timestamp.
    ///
    /// Polls at the failover poll interval and gives up after the failover
    /// await timeout.
    pub async fn wait_until_ready_to_serve<I, S>(&self, namespaces: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let clients = namespaces
            .into_iter()
            .map(|namespace| {
                let namespace: String = namespace.into();
                self.router.client(&namespace)
            })
            .collect::<Result<Vec<_>>>()?;
        let policy = self.failover.policy();
        let deadline = tokio::time::Instant::now() + policy.await_timeout();

        loop {
            let mut last_err = None;
            for client in &clients {
                if let Err(err) = client.fresh_timestamp().await {
                    last_err = Some((client.namespace().to_string(), err));
                    break;
                }
            }
            let Some((namespace, err)) = last_err else {
                return Ok(());
            };
            if tokio::time::Instant::now() >= deadline {
                return Err(TimelockError::Timeout(format!(
                    "namespace '{}' not ready to serve within {:?} ({})",
                    namespace,
                    policy.await_timeout(),
                    err
                )));
            }
            event!(Level::DEBUG, namespace = %namespace, error = %err, "namespace not ready yet");
            tokio::time::sleep(policy.poll_interval()).await;
        }
    }

    /// Restores every node, then waits until the namespaces are served.
    pub async fn wait_until_all_servers_online_and_ready<I, S>(&self, namespaces: I) -> Result<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for node in self.membership.nodes() {
            self.lifecycle.restore(node).await?;
        }
        self.wait_until_ready_to_serve(namespaces).await
    }
}
