/// Asks a node which namespaces it currently believes it leads.
#[async_trait]
pub trait LeadershipPinger: Send + Sync {
    /// Returns the subset of `namespaces` led by `target_node`.
    ///
    /// An empty set is a normal answer. Transport failures and unreachable
    /// nodes are reported as errors.
    async fn ping(
        &self,
        target_node: &str,
        namespaces: &BTreeSet<Namespace>,
    ) -> Result<BTreeSet<Namespace>>;
}

/// Takes nodes out of service and brings them back.
///
/// Both operations are idempotent and take effect before the next
/// leadership poll.
#[async_trait]
pub trait NodeLifecycle: Send + Sync {
    /// Stops the node from serving (simulated crash).
    async fn remove(&self, target_node: &str) -> Result<()>;

    /// Returns a previously removed node to service.
    async fn restore(&self, target_node: &str) -> Result<()>;
}

/// Per-namespace calls served by whichever node leads the namespace.
#[async_trait]
pub trait NamespacedTransport: Send + Sync {
    /// Fetches a fresh timestamp for `namespace` from `target_node`.
    ///
    /// Nodes that do not lead the namespace answer with `NotLeader`.
    async fn fresh_timestamp(&self, target_node: &str, namespace: &str) -> Result<u64>;
}
