/// Aggregate of per-node outcomes for one outstanding quorum-checked call.
///
/// Iteration follows node ordering, so two calls over the same membership
/// observe nodes in the same order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InProgressResponseState<N: Ord, T> {
    responses: BTreeMap<N, ResponseState<T>>,
}

impl<N: Ord, T> InProgressResponseState<N, T> {
    /// Creates a state with every node pending. Duplicate nodes collapse into one entry.
    pub fn new(nodes: impl IntoIterator<Item = N>) -> Self {
        Self {
            responses: nodes
                .into_iter()
                .map(|node| (node, ResponseState::Pending))
                .collect(),
        }
    }

    pub fn responses(&self) -> &BTreeMap<N, ResponseState<T>> {
        &self.responses
    }

    pub fn into_responses(self) -> BTreeMap<N, ResponseState<T>> {
        self.responses
    }

    pub fn get(&self, node: &N) -> Option<&ResponseState<T>> {
        self.responses.get(node)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &N> {
        self.responses.keys()
    }

    pub fn total_nodes(&self) -> usize {
        self.responses.len()
    }

    pub fn success_count(&self) -> usize {
        self.responses.values().filter(|r| r.is_successful()).count()
    }

    pub fn failure_count(&self) -> usize {
        self.responses.values().filter(|r| r.is_failed()).count()
    }

    pub fn pending_count(&self) -> usize {
        self.responses.values().filter(|r| r.is_pending()).count()
    }

    pub fn pending_nodes(&self) -> impl Iterator<Item = &N> {
        self.responses
            .iter()
            .filter(|(_, r)| r.is_pending())
            .map(|(node, _)| node)
    }

    /// Iterates `(node, value)` for every node that answered successfully.
    pub fn successful_values(&self) -> impl Iterator<Item = (&N, &T)> {
        self.responses.iter().filter_map(|(node, r)| match r {
            ResponseState::Succeeded(value) => Some((node, value)),
            _ => None,
        })
    }

    /// Iterates `(node, error)` for every node whose call failed.
    pub fn failures(&self) -> impl Iterator<Item = (&N, &TimelockError)> {
        self.responses
            .iter()
            .filter_map(|(node, r)| r.error().map(|err| (node, err)))
    }

    pub(crate) fn record(&mut self, node: &N, outcome: Result<T>) -> Result<()> {
        let slot = self.responses.get_mut(node).ok_or_else(|| {
            TimelockError::IllegalState("response recorded for a node outside the call".to_string())
        })?;
        slot.complete(outcome)
    }
}
