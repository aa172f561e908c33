/// Runtime handles used to run node calls, one per node.
///
/// Nodes without an explicit handle run on the fallback, or on the runtime
/// driving the checker when no fallback is set.
#[derive(Debug, Clone)]
pub struct NodeExecutors<N: Ord> {
    per_node: BTreeMap<N, Handle>,
    fallback: Option<Handle>,
}

impl<N: Ord> Default for NodeExecutors<N> {
    fn default() -> Self {
        Self {
            per_node: BTreeMap::new(),
            fallback: None,
        }
    }
}

impl<N: Ord> NodeExecutors<N> {
    /// Runs every node call on the checker's own runtime.
    pub fn current() -> Self {
        Self::default()
    }

    /// Runs every node call on `handle`.
    pub fn shared(handle: Handle) -> Self {
        Self {
            per_node: BTreeMap::new(),
            fallback: Some(handle),
        }
    }

    /// Dedicates `handle` to calls against `node`.
    pub fn with_node(mut self, node: N, handle: Handle) -> Self {
        self.per_node.insert(node, handle);
        self
    }

    pub(crate) fn handle_for(&self, node: &N) -> Handle {
        self.per_node
            .get(node)
            .or(self.fallback.as_ref())
            .cloned()
            .unwrap_or_else(Handle::current)
    }
}
