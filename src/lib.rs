// ============================================================================
// Timelock Cluster Library
// ============================================================================

pub mod core;
pub mod quorum;
pub mod cluster;
pub mod sweep;

// Re-export main types for convenience
pub use crate::core::{Namespace, NodeId, Result, TimelockError, stable_bucket_for};

// Re-export quorum checking API
pub use crate::quorum::{
    InProgressResponseState, MajorityQuorum, NodeExecutors, QuorumNotReached, QuorumOutcome,
    QuorumResult, ResponseState, TerminationPredicate, collect_majority, collect_until,
    majority_of,
};

// Re-export cluster API
pub use crate::cluster::{
    ClusterConfig, ClusterMembership, ElectionPolicy, FailoverAttempt, FailoverController,
    FailoverPolicy, FailoverReport, InMemoryTimelockNetwork, LeadershipPinger, LeadershipSnapshot,
    NamespaceCoverage, NamespaceLeadershipResolver, NamespacedClient, NamespacedClientRouter,
    NamespacedTransport, NodeLifecycle, QuorumPolicy, TimelockCluster,
};

pub use crate::sweep::{CellTsPairInfo, CellTsPairToken};
