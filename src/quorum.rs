use crate::core::{Result, TimelockError};
use futures::FutureExt;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{Level, event, info_span, Instrument};

// Quorum checking is split by concern: per-node state, predicates, and the fan-out driver.
include!("quorum/response_state.rs");
include!("quorum/in_progress.rs");
include!("quorum/predicate.rs");
include!("quorum/executors.rs");
include!("quorum/checker.rs");
