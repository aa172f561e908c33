/// How a quorum-checked call ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuorumOutcome {
    /// The termination predicate was satisfied.
    Satisfied,
    /// The remaining pending nodes could no longer satisfy the predicate.
    Unsatisfiable,
    /// The batch deadline fired with the predicate unsatisfied.
    DeadlineElapsed,
}

impl fmt::Display for QuorumOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Satisfied => write!(f, "satisfied"),
            Self::Unsatisfiable => write!(f, "unsatisfiable"),
            Self::DeadlineElapsed => write!(f, "deadline elapsed"),
        }
    }
}

/// Result of a quorum-checked call: the outcome plus everything learned so far.
#[derive(Debug, Clone)]
pub struct QuorumResult<N: Ord, T> {
    outcome: QuorumOutcome,
    state: InProgressResponseState<N, T>,
    elapsed: Duration,
}

impl<N: Ord, T> QuorumResult<N, T> {
    pub fn outcome(&self) -> QuorumOutcome {
        self.outcome
    }

    pub fn is_satisfied(&self) -> bool {
        self.outcome == QuorumOutcome::Satisfied
    }

    pub fn state(&self) -> &InProgressResponseState<N, T> {
        &self.state
    }

    pub fn into_state(self) -> InProgressResponseState<N, T> {
        self.state
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// Returns the state if the predicate was satisfied, otherwise an error
    /// that still carries the partial state.
    pub fn into_satisfied(
        self,
    ) -> std::result::Result<InProgressResponseState<N, T>, QuorumNotReached<N, T>> {
        if self.is_satisfied() {
            Ok(self.state)
        } else {
            Err(QuorumNotReached {
                outcome: self.outcome,
                state: self.state,
            })
        }
    }
}

/// A quorum-checked call ended without satisfying its predicate.
#[derive(Debug, Clone)]
pub struct QuorumNotReached<N: Ord, T> {
    pub outcome: QuorumOutcome,
    pub state: InProgressResponseState<N, T>,
}

impl<N: Ord, T> fmt::Display for QuorumNotReached<N, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} with {} succeeded, {} failed, {} pending of {} nodes",
            self.outcome,
            self.state.success_count(),
            self.state.failure_count(),
            self.state.pending_count(),
            self.state.total_nodes()
        )
    }
}

impl<N: Ord + fmt::Debug, T: fmt::Debug> std::error::Error for QuorumNotReached<N, T> {}

impl<N: Ord, T> From<QuorumNotReached<N, T>> for TimelockError {
    fn from(err: QuorumNotReached<N, T>) -> Self {
        TimelockError::QuorumNotReached(err.to_string())
    }
}

/// Fans a request out to every node and collects responses until `predicate`
/// is satisfied, becomes unsatisfiable, or `deadline` elapses.
///
/// Each node is called exactly once, on its own task. Calls still running
/// when this returns are abandoned; their results are dropped. Per-node
/// failures, including panics, are recorded as `Failed` and never abort the
/// batch.
pub async fn collect_until<N, T, F, Fut, P>(
    nodes: impl IntoIterator<Item = N>,
    request: F,
    executors: &NodeExecutors<N>,
    deadline: Duration,
    predicate: P,
) -> Result<QuorumResult<N, T>>
where
    N: Ord + Clone + fmt::Debug + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(N) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    P: TerminationPredicate<N, T>,
{
    let mut state = InProgressResponseState::new(nodes);
    if state.total_nodes() == 0 {
        return Err(TimelockError::IllegalState(
            "quorum check requires at least one node".to_string(),
        ));
    }

    let span = info_span!(
        "timelock.quorum.collect",
        nodes = state.total_nodes(),
        deadline_ms = deadline.as_millis() as u64
    );
    let (outcome, elapsed) = collect_into(&mut state, request, executors, deadline, &predicate)
        .instrument(span)
        .await?;
    Ok(QuorumResult {
        outcome,
        state,
        elapsed,
    })
}

/// Shorthand for [`collect_until`] with a majority of the supplied nodes.
pub async fn collect_majority<N, T, F, Fut>(
    nodes: impl IntoIterator<Item = N>,
    request: F,
    executors: &NodeExecutors<N>,
    deadline: Duration,
) -> Result<QuorumResult<N, T>>
where
    N: Ord + Clone + fmt::Debug + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(N) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
{
    let nodes = nodes.into_iter().collect::<BTreeSet<_>>();
    let predicate = MajorityQuorum::for_cluster(nodes.len());
    collect_until(nodes, request, executors, deadline, predicate).await
}

async fn collect_into<N, T, F, Fut, P>(
    state: &mut InProgressResponseState<N, T>,
    request: F,
    executors: &NodeExecutors<N>,
    deadline: Duration,
    predicate: &P,
) -> Result<(QuorumOutcome, Duration)>
where
    N: Ord + Clone + fmt::Debug + Send + Sync + 'static,
    T: Send + 'static,
    F: Fn(N) -> Fut,
    Fut: Future<Output = Result<T>> + Send + 'static,
    P: TerminationPredicate<N, T>,
{
    let started = Instant::now();
    let deadline_at = tokio::time::Instant::now() + deadline;

    if let Some(outcome) = evaluate(state, predicate) {
        return Ok((outcome, started.elapsed()));
    }

    let (tx, mut rx) = mpsc::unbounded_channel::<(N, Result<T>)>();
    for node in state.nodes().cloned().collect::<Vec<_>>() {
        let call = request(node.clone());
        let tx = tx.clone();
        executors.handle_for(&node).spawn(async move {
            let outcome = match AssertUnwindSafe(call).catch_unwind().await {
                Ok(outcome) => outcome,
                Err(_) => Err(TimelockError::ExecutionError(format!(
                    "call to node {:?} panicked",
                    node
                ))),
            };
            // The receiver is gone once the batch has returned.
            let _ = tx.send((node, outcome));
        });
    }
    drop(tx);

    let outcome = loop {
        match tokio::time::timeout_at(deadline_at, rx.recv()).await {
            Err(_) => {
                event!(
                    Level::WARN,
                    succeeded = state.success_count(),
                    failed = state.failure_count(),
                    pending = state.pending_count(),
                    "quorum deadline elapsed"
                );
                break QuorumOutcome::DeadlineElapsed;
            }
            Ok(None) => break QuorumOutcome::Unsatisfiable,
            Ok(Some((node, response))) => {
                apply(state, &node, response);
                if let Some(outcome) = evaluate(state, predicate) {
                    break outcome;
                }
            }
        }
    };

    // Nodes that already answered belong in the returned state even if the
    // outcome was decided before their message was read.
    while let Ok((node, response)) = rx.try_recv() {
        apply(state, &node, response);
    }

    event!(
        Level::DEBUG,
        outcome = %outcome,
        succeeded = state.success_count(),
        failed = state.failure_count(),
        pending = state.pending_count(),
        "quorum check finished"
    );
    Ok((outcome, started.elapsed()))
}

fn evaluate<N: Ord, T, P: TerminationPredicate<N, T>>(
    state: &InProgressResponseState<N, T>,
    predicate: &P,
) -> Option<QuorumOutcome> {
    if predicate.is_satisfied(state) {
        Some(QuorumOutcome::Satisfied)
    } else if predicate.is_unsatisfiable(state) {
        Some(QuorumOutcome::Unsatisfiable)
    } else {
        None
    }
}

fn apply<N: Ord + fmt::Debug, T>(
    state: &mut InProgressResponseState<N, T>,
    node: &N,
    response: Result<T>,
) {
    match &response {
        Ok(_) => event!(Level::DEBUG, node = ?node, "node call succeeded"),
        Err(err) => event!(Level::DEBUG, node = ?node, error = %err, "node call failed"),
    }
    if let Err(err) = state.record(node, response) {
        event!(Level::WARN, node = ?node, error = %err, "discarding node response");
    }
}
