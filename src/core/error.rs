use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelockError {
    #[error("Node '{0}' is unavailable")]
    NodeUnavailable(String),

    #[error("Node '{0}' is not the leader for namespace '{1}'")]
    NotLeader(String, String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("Malformed response from node '{0}': {1}")]
    MalformedResponse(String, String),

    #[error("Quorum not reached: {0}")]
    QuorumNotReached(String),

    #[error("Leadership for namespace '{0}' is unsettled: expected exactly one leader, found {1}")]
    LeadershipUnsettled(String, usize),

    #[error("Unable to force a failover for namespace '{0}' after {1} tries")]
    FailoverExhausted(String, usize),

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Namespace limit of {0} reached")]
    NamespaceLimitExceeded(usize),

    #[error("Execution error: {0}")]
    ExecutionError(String),

    #[error("Lock error: {0}")]
    LockError(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl TimelockError {
    /// Returns true for failures a caller may route around by trying another node.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::NodeUnavailable(_) | Self::NotLeader(_, _) | Self::Timeout(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, TimelockError>;

impl<T> From<std::sync::PoisonError<T>> for TimelockError {
    fn from(err: std::sync::PoisonError<T>) -> Self {
        Self::LockError(err.to_string())
    }
}

impl From<std::io::Error> for TimelockError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}
