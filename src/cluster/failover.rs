/// One Resolve/Evict/AwaitNewLeader/Reinstate cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailoverAttempt {
    pub namespace: Namespace,
    pub original_leader: NodeId,
    /// 1-based attempt number within the retry budget.
    pub attempt_index: usize,
}

/// Summary of a successful forced leadership change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailoverReport {
    pub namespace: Namespace,
    pub previous_leader: NodeId,
    pub new_leader: NodeId,
    /// Attempts used, including the successful one.
    pub attempts: usize,
}

/// Forces a namespace's leadership onto a different node.
///
/// Used for fault-injection tests and operational drills. A node evicted by
/// this controller is always restored before the attempt finishes, whether
/// the attempt succeeded, needs a retry, or failed.
pub struct FailoverController {
    resolver: Arc<NamespaceLeadershipResolver>,
    lifecycle: Arc<dyn NodeLifecycle>,
    policy: FailoverPolicy,
    node_guards: StdMutex<HashMap<NodeId, Arc<Mutex<()>>>>,
}

impl FailoverController {
    pub fn new(
        resolver: Arc<NamespaceLeadershipResolver>,
        lifecycle: Arc<dyn NodeLifecycle>,
        policy: FailoverPolicy,
    ) -> Self {
        Self {
            resolver,
            lifecycle,
            policy,
            node_guards: StdMutex::new(HashMap::new()),
        }
    }

    pub fn policy(&self) -> &FailoverPolicy {
        &self.policy
    }

    /// Evicts the current leader of `namespace` until a different node leads it.
    ///
    /// Retries the whole cycle when leadership lands back on the original
    /// node. Fails with `FailoverExhausted` once the retry budget is spent.
    pub async fn failover_to_new_leader(&self, namespace: &str) -> Result<FailoverReport> {
        let span = info_span!("timelock.failover", namespace = %namespace);
        async {
            for attempt_index in 1..=self.policy.max_attempts {
                if let Some(report) = self.try_failover(namespace, attempt_index).await? {
                    event!(
                        Level::INFO,
                        previous_leader = %report.previous_leader,
                        new_leader = %report.new_leader,
                        attempts = report.attempts,
                        "namespace leadership moved"
                    );
                    return Ok(report);
                }
            }
            event!(
                Level::ERROR,
                attempts = self.policy.max_attempts,
                "failover retry budget exhausted"
            );
            Err(TimelockError::FailoverExhausted(
                namespace.to_string(),
                self.policy.max_attempts,
            ))
        }
        .instrument(span)
        .await
    }

    async fn try_failover(
        &self,
        namespace: &str,
        attempt_index: usize,
    ) -> Result<Option<FailoverReport>> {
        let Some((original_leader, exclusive)) = self.lock_current_leader(namespace).await? else {
            return Ok(None);
        };
        let attempt = FailoverAttempt {
            namespace: namespace.to_string(),
            original_leader,
            attempt_index,
        };

        let interim_leader = self.evict_and_await(&attempt, exclusive).await?;

        let current = match self.resolver.current_leader_for(namespace).await {
            Ok(leader) => leader,
            Err(err @ TimelockError::LeadershipUnsettled(_, _)) => {
                event!(
                    Level::WARN,
                    attempt = attempt.attempt_index,
                    error = %err,
                    "leadership unsettled after reinstatement"
                );
                return Ok(None);
            }
            Err(err) => return Err(err),
        };

        if current == attempt.original_leader {
            event!(
                Level::WARN,
                attempt = attempt.attempt_index,
                leader = %current,
                interim_leader = %interim_leader,
                "leadership returned to the evicted node"
            );
            return Ok(None);
        }

        Ok(Some(FailoverReport {
            namespace: attempt.namespace,
            previous_leader: attempt.original_leader,
            new_leader: current,
            attempts: attempt.attempt_index,
        }))
    }

    /// Resolves the leader of `namespace` and takes its node guard.
    ///
    /// Leadership may move while another failover holds the guard, so the
    /// leader is resolved again once the guard is held. Returns `None` when
    /// leadership keeps moving.
    async fn lock_current_leader(
        &self,
        namespace: &str,
    ) -> Result<Option<(NodeId, OwnedMutexGuard<()>)>> {
        let mut leader = self.resolver.current_leader_for(namespace).await?;
        for _ in 0..self.policy.max_attempts {
            let exclusive = self.node_guard(&leader).await?;
            let confirmed = self.resolver.current_leader_for(namespace).await?;
            if confirmed == leader {
                return Ok(Some((leader, exclusive)));
            }
            event!(
                Level::DEBUG,
                previous = %leader,
                current = %confirmed,
                "leadership moved while waiting for node guard"
            );
            drop(exclusive);
            leader = confirmed;
        }
        Ok(None)
    }

    /// Evicts the original leader, waits for any leader to be observed, then
    /// restores the original leader regardless of the observation's result.
    async fn evict_and_await(
        &self,
        attempt: &FailoverAttempt,
        exclusive: OwnedMutexGuard<()>,
    ) -> Result<NodeId> {
        let leader = attempt.original_leader.as_str();
        // Armed before removal: a partly applied removal is restored too.
        let eviction = EvictionGuard {
            node: attempt.original_leader.clone(),
            lifecycle: self.lifecycle.clone(),
            exclusive: Some(exclusive),
            armed: true,
        };

        if let Err(err) = self.lifecycle.remove(leader).await {
            if let Err(restore_err) = eviction.restore().await {
                event!(Level::ERROR, node = %leader, error = %restore_err, "restore after failed eviction failed");
            }
            return Err(err);
        }
        event!(
            Level::INFO,
            node = %leader,
            attempt = attempt.attempt_index,
            "evicted namespace leader"
        );

        let observed = self.await_new_leader(&attempt.namespace).await;
        let restored = eviction.restore().await;
        match (observed, restored) {
            (Ok(new_leader), Ok(())) => Ok(new_leader),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), restored) => {
                if let Err(restore_err) = restored {
                    event!(Level::ERROR, node = %leader, error = %restore_err, "restore after failed election wait failed");
                }
                Err(err)
            }
        }
    }

    /// Polls until exactly one node leads `namespace`, or the await timeout passes.
    async fn await_new_leader(&self, namespace: &str) -> Result<NodeId> {
        let deadline = tokio::time::Instant::now() + self.policy.await_timeout();
        loop {
            match self.resolver.current_leader_for(namespace).await {
                Ok(leader) => return Ok(leader),
                Err(err @ TimelockError::LeadershipUnsettled(_, _)) => {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(TimelockError::Timeout(format!(
                            "no single leader for namespace '{}' within {:?} ({})",
                            namespace,
                            self.policy.await_timeout(),
                            err
                        )));
                    }
                    event!(Level::DEBUG, error = %err, "waiting for new leader");
                }
                Err(err) => return Err(err),
            }
            tokio::time::sleep(self.policy.poll_interval()).await;
        }
    }

    async fn node_guard(&self, node: &str) -> Result<OwnedMutexGuard<()>> {
        let lock = {
            let mut guards = self.node_guards.lock()?;
            guards.entry(node.to_string()).or_default().clone()
        };
        Ok(lock.lock_owned().await)
    }
}

/// Keeps an evicted node's restoration owed until it has happened.
///
/// Dropping an armed guard, for example when the failover future is
/// cancelled mid-wait, restores the node on a background task. The node's
/// exclusive guard is held until the restore finishes.
struct EvictionGuard {
    node: NodeId,
    lifecycle: Arc<dyn NodeLifecycle>,
    exclusive: Option<OwnedMutexGuard<()>>,
    armed: bool,
}

impl EvictionGuard {
    async fn restore(mut self) -> Result<()> {
        let restored = self.lifecycle.restore(&self.node).await;
        self.armed = false;
        restored
    }
}

impl Drop for EvictionGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let node = self.node.clone();
        let lifecycle = self.lifecycle.clone();
        let exclusive = self.exclusive.take();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                event!(Level::WARN, node = %node, "failover abandoned, restoring evicted node");
                handle.spawn(async move {
                    if let Err(err) = lifecycle.restore(&node).await {
                        event!(Level::ERROR, node = %node, error = %err, "background restore failed");
                    }
                    drop(exclusive);
                });
            }
            Err(_) => {
                event!(Level::ERROR, node = %node, "no runtime left to restore evicted node");
            }
        }
    }
}
