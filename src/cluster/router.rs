/// Client for a single namespace whose calls follow the namespace's leader.
///
/// Calls go to a sticky preferred node first. A retryable failure (wrong
/// node, unreachable node, timeout) moves on to the next member; the first
/// node that answers becomes the new preferred node.
pub struct NamespacedClient {
    namespace: Namespace,
    nodes: Vec<NodeId>,
    preferred: AtomicUsize,
    transport: Arc<dyn NamespacedTransport>,
    slow_call_log_trigger: Duration,
}

impl std::fmt::Debug for NamespacedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NamespacedClient")
            .field("namespace", &self.namespace)
            .field("preferred_node", &self.preferred_node())
            .finish()
    }
}

impl NamespacedClient {
    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Node the next call is sent to first.
    pub fn preferred_node(&self) -> &str {
        let index = self.preferred.load(Ordering::Relaxed) % self.nodes.len();
        &self.nodes[index]
    }

    /// Fetches a fresh timestamp from whichever node leads the namespace.
    pub async fn fresh_timestamp(&self) -> Result<u64> {
        self.call_with_failover("fresh_timestamp", |transport, node, namespace| async move {
            transport.fresh_timestamp(&node, &namespace).await
        })
        .await
    }

    /// Runs `call` against the preferred node, failing over across the
    /// remaining members on retryable errors.
    ///
    /// Non-retryable errors surface immediately. If every member fails, the
    /// last error is returned.
    pub async fn call_with_failover<T, F, Fut>(&self, operation: &str, call: F) -> Result<T>
    where
        F: Fn(Arc<dyn NamespacedTransport>, NodeId, Namespace) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        let first = self.preferred.load(Ordering::Relaxed);
        let mut last_err = None;

        for offset in 0..self.nodes.len() {
            let index = (first + offset) % self.nodes.len();
            let node = self.nodes[index].clone();
            match call(self.transport.clone(), node.clone(), self.namespace.clone()).await {
                Ok(value) => {
                    if offset > 0 {
                        self.preferred.store(index, Ordering::Relaxed);
                        event!(
                            Level::DEBUG,
                            namespace = %self.namespace,
                            node = %node,
                            "namespace rerouted"
                        );
                    }
                    self.log_if_slow(operation, started.elapsed());
                    return Ok(value);
                }
                Err(err) if err.is_retryable() => {
                    event!(
                        Level::DEBUG,
                        namespace = %self.namespace,
                        node = %node,
                        error = %err,
                        "routed call failed, trying next node"
                    );
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        self.log_if_slow(operation, started.elapsed());
        Err(last_err.unwrap_or_else(|| {
            TimelockError::ExecutionError(format!(
                "no nodes to route namespace '{}'",
                self.namespace
            ))
        }))
    }

    fn log_if_slow(&self, operation: &str, elapsed: Duration) {
        if elapsed >= self.slow_call_log_trigger {
            event!(
                Level::INFO,
                namespace = %self.namespace,
                operation,
                elapsed_ms = elapsed.as_millis() as u64,
                "slow namespaced call"
            );
        }
    }
}

/// Hands out one [`NamespacedClient`] per namespace, built on first use.
///
/// The cache belongs to the router, so separate clusters never share
/// routing state.
pub struct NamespacedClientRouter {
    membership: ClusterMembership,
    transport: Arc<dyn NamespacedTransport>,
    clients: RwLock<HashMap<Namespace, Arc<NamespacedClient>>>,
    max_namespaces: usize,
    slow_call_log_trigger: Duration,
}

impl NamespacedClientRouter {
    pub fn new(
        membership: ClusterMembership,
        transport: Arc<dyn NamespacedTransport>,
        max_namespaces: usize,
        slow_call_log_trigger: Duration,
    ) -> Self {
        Self {
            membership,
            transport,
            clients: RwLock::new(HashMap::new()),
            max_namespaces,
            slow_call_log_trigger,
        }
    }

    /// Returns the cached client for `namespace`, building it at most once.
    ///
    /// Fails with `NamespaceLimitExceeded` when a new namespace would exceed the cap.
    pub fn client(&self, namespace: &str) -> Result<Arc<NamespacedClient>> {
        if namespace.trim().is_empty() {
            return Err(TimelockError::IllegalState(
                "namespace must not be empty".to_string(),
            ));
        }
        {
            let clients = self.clients.read()?;
            if let Some(client) = clients.get(namespace) {
                return Ok(client.clone());
            }
        }

        let mut clients = self.clients.write()?;
        if let Some(client) = clients.get(namespace) {
            return Ok(client.clone());
        }
        if clients.len() >= self.max_namespaces {
            return Err(TimelockError::NamespaceLimitExceeded(self.max_namespaces));
        }
        let client = Arc::new(self.uncached_client(namespace));
        clients.insert(namespace.to_string(), client.clone());
        Ok(client)
    }

    /// Client for a fresh random namespace.
    pub fn client_for_random_namespace(&self) -> Result<Arc<NamespacedClient>> {
        self.client(&Uuid::new_v4().to_string())
    }

    /// Builds a client without touching the cache.
    ///
    /// The first preferred node is picked by a stable hash of the namespace,
    /// spreading initial routing across the cluster.
    pub fn uncached_client(&self, namespace: &str) -> NamespacedClient {
        let nodes = self.membership.all_nodes();
        let preferred = stable_bucket_for(namespace, nodes.len());
        NamespacedClient {
            namespace: namespace.to_string(),
            nodes,
            preferred: AtomicUsize::new(preferred),
            transport: self.transport.clone(),
            slow_call_log_trigger: self.slow_call_log_trigger,
        }
    }

    /// Namespaces with a cached client, sorted.
    pub fn cached_namespaces(&self) -> Result<Vec<Namespace>> {
        let clients = self.clients.read()?;
        let mut namespaces = clients.keys().cloned().collect::<Vec<_>>();
        namespaces.sort();
        Ok(namespaces)
    }
}
