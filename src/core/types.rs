/// Identifier of a cluster member. Stable for the lifetime of the cluster.
pub type NodeId = String;

/// Identifier of a logical tenant with its own independently elected leader.
pub type Namespace = String;

/// Computes a stable bucket for a namespace using FNV-1a.
///
/// Every process maps the same namespace to the same bucket for a fixed
/// bucket count, which keeps initial routing and simulated elections deterministic.
pub fn stable_bucket_for(namespace: &str, bucket_count: usize) -> usize {
    if bucket_count == 0 {
        return 0;
    }
    let mut hash = 14695981039346656037u64;
    for byte in namespace.as_bytes() {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(1099511628211);
    }
    (hash % bucket_count as u64) as usize
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stable_bucket_is_deterministic_and_in_range() {
        for count in 1..8 {
            let first = stable_bucket_for("tenant-7", count);
            assert_eq!(first, stable_bucket_for("tenant-7", count));
            assert!(first < count);
        }
        assert_eq!(stable_bucket_for("anything", 0), 0);
    }
}
