pub mod error;
pub mod types;

pub use error::{Result, TimelockError};
pub use types::{Namespace, NodeId, stable_bucket_for};
