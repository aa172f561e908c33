use crate::core::{Namespace, NodeId, Result, TimelockError, stable_bucket_for};
use crate::quorum::{
    InProgressResponseState, NodeExecutors, QuorumOutcome, TerminationPredicate, collect_until,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::ops::Bound;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex, RwLock};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{Instrument, Level, event, info_span};
use uuid::Uuid;

// Cluster support is split by responsibility for easier navigation.
include!("cluster/config.rs");
include!("cluster/membership.rs");
include!("cluster/traits.rs");
include!("cluster/leadership.rs");
include!("cluster/failover.rs");
include!("cluster/router.rs");
include!("cluster/in_memory_network.rs");
include!("cluster/timelock_cluster.rs");
