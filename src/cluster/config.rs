/// Deadline applied to each quorum-checked fan-out.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QuorumPolicy {
    /// Batch deadline in milliseconds. Late nodes are reported as pending.
    pub deadline_ms: u64,
}

impl Default for QuorumPolicy {
    fn default() -> Self {
        Self { deadline_ms: 2_000 }
    }
}

impl QuorumPolicy {
    pub fn deadline(&self) -> Duration {
        Duration::from_millis(self.deadline_ms)
    }
}

/// Retry and polling bounds for forced leadership changes.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailoverPolicy {
    /// Full Resolve/Evict/Await/Reinstate cycles before giving up.
    pub max_attempts: usize,
    /// Interval between leadership polls while waiting for a new election.
    pub poll_interval_ms: u64,
    /// Upper bound on a single wait for a new election.
    pub await_timeout_ms: u64,
}

impl Default for FailoverPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            poll_interval_ms: 500,
            await_timeout_ms: 60_000,
        }
    }
}

impl FailoverPolicy {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn await_timeout(&self) -> Duration {
        Duration::from_millis(self.await_timeout_ms)
    }
}

fn default_max_namespaces() -> usize {
    100
}

fn default_slow_call_log_trigger_ms() -> u64 {
    10_000
}

/// Cluster configuration supplied by the surrounding system.
///
/// # Examples
///
/// ```
/// use timelock_cluster::ClusterConfig;
///
/// let config = ClusterConfig::new(["node-a", "node-b", "node-c"])
///     .quorum_deadline_ms(500)
///     .max_failover_attempts(3);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterConfig {
    /// Node identifiers of every cluster member.
    pub nodes: Vec<String>,

    #[serde(default)]
    pub quorum: QuorumPolicy,

    #[serde(default)]
    pub failover: FailoverPolicy,

    /// Maximum number of distinct namespaces a router builds clients for.
    /// Each namespace costs memory on every node.
    #[serde(default = "default_max_namespaces")]
    pub max_namespaces: usize,

    /// Routed calls taking at least this long are logged at INFO.
    #[serde(default = "default_slow_call_log_trigger_ms")]
    pub slow_call_log_trigger_ms: u64,
}

impl ClusterConfig {
    /// Creates a configuration with default policies.
    pub fn new<I, S>(nodes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            quorum: QuorumPolicy::default(),
            failover: FailoverPolicy::default(),
            max_namespaces: default_max_namespaces(),
            slow_call_log_trigger_ms: default_slow_call_log_trigger_ms(),
        }
    }

    /// Set the quorum batch deadline
    pub fn quorum_deadline_ms(mut self, deadline_ms: u64) -> Self {
        self.quorum.deadline_ms = deadline_ms;
        self
    }

    /// Set the failover retry budget
    pub fn max_failover_attempts(mut self, attempts: usize) -> Self {
        self.failover.max_attempts = attempts;
        self
    }

    /// Set the leadership poll interval
    pub fn failover_poll_interval_ms(mut self, interval_ms: u64) -> Self {
        self.failover.poll_interval_ms = interval_ms;
        self
    }

    /// Set the bound on waiting for a new leader
    pub fn failover_await_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.failover.await_timeout_ms = timeout_ms;
        self
    }

    /// Set the namespace cap
    pub fn max_namespaces(mut self, max: usize) -> Self {
        self.max_namespaces = max;
        self
    }

    /// Set the slow routed call threshold
    pub fn slow_call_log_trigger_ms(mut self, trigger_ms: u64) -> Self {
        self.slow_call_log_trigger_ms = trigger_ms;
        self
    }

    pub fn slow_call_log_trigger(&self) -> Duration {
        Duration::from_millis(self.slow_call_log_trigger_ms)
    }

    /// Parses a JSON document and validates it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|err| TimelockError::InvalidConfig(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads a JSON configuration file and validates it.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&raw)
    }

    /// Checks for:
    /// - a non-empty node list without blank or duplicate ids,
    /// - non-zero deadline, poll interval, await timeout and retry budget,
    /// - a namespace cap of at least one.
    pub fn validate(&self) -> Result<()> {
        if self.nodes.is_empty() {
            return Err(TimelockError::InvalidConfig(
                "cluster must have at least one node".to_string(),
            ));
        }
        let mut seen = HashSet::new();
        for node in &self.nodes {
            if node.trim().is_empty() {
                return Err(TimelockError::InvalidConfig(
                    "node id must not be empty".to_string(),
                ));
            }
            if !seen.insert(node.as_str()) {
                return Err(TimelockError::InvalidConfig(format!(
                    "node '{}' appears more than once",
                    node
                )));
            }
        }
        if self.quorum.deadline_ms == 0 {
            return Err(TimelockError::InvalidConfig(
                "quorum.deadline_ms must be >= 1".to_string(),
            ));
        }
        if self.failover.max_attempts == 0 {
            return Err(TimelockError::InvalidConfig(
                "failover.max_attempts must be >= 1".to_string(),
            ));
        }
        if self.failover.poll_interval_ms == 0 {
            return Err(TimelockError::InvalidConfig(
                "failover.poll_interval_ms must be >= 1".to_string(),
            ));
        }
        if self.failover.await_timeout_ms == 0 {
            return Err(TimelockError::InvalidConfig(
                "failover.await_timeout_ms must be >= 1".to_string(),
            ));
        }
        if self.max_namespaces == 0 {
            return Err(TimelockError::InvalidConfig(
                "max_namespaces must be >= 1".to_string(),
            ));
        }
        Ok(())
    }
}
