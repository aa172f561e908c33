use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use timelock_cluster::{
    ClusterConfig, ElectionPolicy, InMemoryTimelockNetwork, NodeLifecycle, TimelockCluster,
    TimelockError,
};
use tokio_test::{assert_err, assert_ok};
use uuid::Uuid;

fn cluster_with(config: ClusterConfig) -> (Arc<TimelockCluster>, InMemoryTimelockNetwork) {
    let (cluster, network) = TimelockCluster::in_memory(config, ElectionPolicy::Rotate).unwrap();
    (Arc::new(cluster), network)
}

fn default_config() -> ClusterConfig {
    ClusterConfig::new(["node-a", "node-b", "node-c"])
        .quorum_deadline_ms(500)
        .failover_poll_interval_ms(10)
        .failover_await_timeout_ms(200)
}

#[tokio::test]
async fn client_is_built_once_per_namespace() {
    let (cluster, _network) = cluster_with(default_config());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let cluster = cluster.clone();
        handles.push(tokio::spawn(async move { cluster.client("shared").unwrap() }));
    }
    let mut clients = Vec::new();
    for handle in handles {
        clients.push(handle.await.unwrap());
    }

    for client in &clients {
        assert!(Arc::ptr_eq(client, &clients[0]));
    }
    assert_eq!(
        cluster.router().cached_namespaces().unwrap(),
        vec!["shared".to_string()]
    );

    let other = cluster.client("other").unwrap();
    assert!(!Arc::ptr_eq(&other, &clients[0]));
    assert_eq!(other.namespace(), "other");
}

#[tokio::test]
async fn separate_clusters_do_not_share_clients() {
    let (first, _) = cluster_with(default_config());
    let (second, _) = cluster_with(default_config());

    let a = first.client("tenant").unwrap();
    let b = second.client("tenant").unwrap();

    assert!(!Arc::ptr_eq(&a, &b));
}

#[tokio::test]
async fn calls_follow_the_namespace_leader() {
    let (cluster, network) = cluster_with(default_config());
    network.elect("tenant", "node-b").await.unwrap();
    let client = cluster.client("tenant").unwrap();

    assert_eq!(client.fresh_timestamp().await.unwrap(), 1);
    assert_eq!(client.preferred_node(), "node-b");

    network.remove("node-b").await.unwrap();
    assert_eq!(client.fresh_timestamp().await.unwrap(), 2);
    assert_eq!(client.preferred_node(), "node-c");

    network.restore("node-b").await.unwrap();
    assert_eq!(client.fresh_timestamp().await.unwrap(), 3);
    assert_eq!(client.preferred_node(), "node-c");
}

#[tokio::test]
async fn timestamps_increase_across_calls() {
    let (cluster, _network) = cluster_with(default_config());
    let client = cluster.client("ticker").unwrap();

    let mut previous = 0;
    for _ in 0..10 {
        let next = client.fresh_timestamp().await.unwrap();
        assert!(next > previous);
        previous = next;
    }
}

#[tokio::test]
async fn unreachable_cluster_surfaces_retryable_error() {
    let (cluster, network) = cluster_with(default_config());
    let client = cluster.client("tenant").unwrap();
    for node in ["node-a", "node-b", "node-c"] {
        network.remove(node).await.unwrap();
    }

    let err = client.fresh_timestamp().await.unwrap_err();

    assert!(err.is_retryable(), "{:?}", err);
    assert!(matches!(err, TimelockError::NodeUnavailable(_)));
}

#[tokio::test]
async fn non_retryable_error_is_not_rerouted() {
    let (cluster, _network) = cluster_with(default_config());
    let client = cluster.client("tenant").unwrap();
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = calls.clone();
    let err = client
        .call_with_failover("garbled", move |_transport, node, _namespace| {
            counter.fetch_add(1, Ordering::SeqCst);
            async move {
                Err::<u64, _>(TimelockError::MalformedResponse(
                    node,
                    "unexpected payload".to_string(),
                ))
            }
        })
        .await
        .unwrap_err();

    assert!(matches!(err, TimelockError::MalformedResponse(_, _)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn namespace_cap_rejects_new_namespaces_only() {
    let (cluster, _network) = cluster_with(default_config().max_namespaces(2));

    assert_ok!(cluster.client("one"));
    assert_ok!(cluster.client("two"));

    let err = assert_err!(cluster.client("three"));
    assert_eq!(err, TimelockError::NamespaceLimitExceeded(2));
    assert_ok!(cluster.client("one"));
}

#[tokio::test]
async fn empty_namespace_is_rejected() {
    let (cluster, _network) = cluster_with(default_config());

    assert!(matches!(
        cluster.client(""),
        Err(TimelockError::IllegalState(_))
    ));
}

#[tokio::test]
async fn random_namespaces_are_distinct_uuids() {
    let (cluster, _network) = cluster_with(default_config());

    let first = cluster.client_for_random_namespace().unwrap();
    let second = cluster.client_for_random_namespace().unwrap();

    assert_ne!(first.namespace(), second.namespace());
    assert!(Uuid::parse_str(first.namespace()).is_ok());
    assert!(first.fresh_timestamp().await.is_ok());
}

#[tokio::test]
async fn ready_to_serve_waits_for_every_namespace() {
    let (cluster, _network) = cluster_with(default_config());

    cluster
        .wait_until_ready_to_serve(["orders", "payments"])
        .await
        .unwrap();
}

#[tokio::test]
async fn ready_to_serve_times_out_while_cluster_is_down() {
    let (cluster, network) = cluster_with(default_config());
    for node in ["node-a", "node-b", "node-c"] {
        network.remove(node).await.unwrap();
    }

    let err = cluster
        .wait_until_ready_to_serve(["orders"])
        .await
        .unwrap_err();
    assert!(matches!(err, TimelockError::Timeout(_)));

    cluster
        .wait_until_all_servers_online_and_ready(["orders"])
        .await
        .unwrap();
    for node in ["node-a", "node-b", "node-c"] {
        assert!(network.is_online(node).await.unwrap());
    }
}
