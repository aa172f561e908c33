/// Decides when a quorum-checked call has learned enough to stop waiting.
///
/// Implementations must depend only on the current state, never on arrival
/// order, and must be free of side effects: the checker calls them after
/// every node completion.
pub trait TerminationPredicate<N: Ord, T>: Send + Sync {
    fn is_satisfied(&self, state: &InProgressResponseState<N, T>) -> bool;

    /// Returns true once no pending node can change the answer.
    ///
    /// The default only knows that for certain when nothing is pending.
    fn is_unsatisfiable(&self, state: &InProgressResponseState<N, T>) -> bool {
        state.pending_count() == 0 && !self.is_satisfied(state)
    }
}

impl<N, T, F> TerminationPredicate<N, T> for F
where
    N: Ord,
    F: Fn(&InProgressResponseState<N, T>) -> bool + Send + Sync,
{
    fn is_satisfied(&self, state: &InProgressResponseState<N, T>) -> bool {
        self(state)
    }
}

/// Number of successes that form a majority of `cluster_size` nodes.
pub fn majority_of(cluster_size: usize) -> usize {
    (cluster_size / 2) + 1
}

/// Satisfied once `required` nodes have succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MajorityQuorum {
    required: usize,
}

impl MajorityQuorum {
    /// Classic majority, `floor(n/2) + 1`.
    pub fn for_cluster(cluster_size: usize) -> Self {
        Self {
            required: majority_of(cluster_size),
        }
    }

    /// Explicit success threshold, for callers with a quorum override.
    pub fn with_required(required: usize) -> Self {
        Self {
            required: required.max(1),
        }
    }

    pub fn required(&self) -> usize {
        self.required
    }
}

impl<N: Ord, T> TerminationPredicate<N, T> for MajorityQuorum {
    fn is_satisfied(&self, state: &InProgressResponseState<N, T>) -> bool {
        state.success_count() >= self.required
    }

    fn is_unsatisfiable(&self, state: &InProgressResponseState<N, T>) -> bool {
        state.success_count() + state.pending_count() < self.required
    }
}
